pub mod renderer;

pub use renderer::SceneRenderer;

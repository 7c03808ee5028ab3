pub mod types;
pub mod wgpu_renderer;

pub use types::{CameraUniform, DrawUniform, FrameUniform, Vertex};
pub use wgpu_renderer::WgpuRenderer;

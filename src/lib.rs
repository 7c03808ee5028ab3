pub mod animation;
pub mod camera;
pub mod cli;
pub mod config;
pub mod core;
pub mod frame;
pub mod loaders;
pub mod render;
pub mod scene;
pub mod traits;
pub mod viewer;

pub use animation::{AnimationAction, AnimationClip, AnimationMixer, LoopMode};
pub use camera::{OrbitControls, PerspectiveCamera};
pub use config::SceneConfig;
pub use scene::{Model, ModelId, Scene};
pub use viewer::Viewer;

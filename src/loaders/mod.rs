pub mod gltf;
pub mod model_loader;
pub mod texture;

pub use gltf::{parse_model, LoadedAsset};
pub use model_loader::{LoadEvent, LoadProgress, ModelLoader, ModelRequest, RequestId};
pub use texture::load_image;

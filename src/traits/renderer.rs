use anyhow::Result;

use crate::camera::PerspectiveCamera;
use crate::core::Viewport;
use crate::scene::Scene;

/// Draws a scene through a camera onto a surface
pub trait SceneRenderer {
    /// Match the drawing surface to the container size
    fn resize(&mut self, viewport: Viewport);

    /// Draw one frame
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<()>;
}

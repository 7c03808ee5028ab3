// config.rs - Scene description loaded from JSON, defaulting to the parrot demo
use anyhow::{Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything needed to bootstrap the viewer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub window: WindowConfig,
    pub background: BackgroundConfig,
    pub camera: CameraConfig,
    pub lights: LightsConfig,
    pub renderer: RendererConfig,
    pub models: Vec<ModelConfig>,
}

impl SceneConfig {
    /// Read a JSON scene description; missing fields keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scene config: {:?}", path))?;
        Self::from_json(&text).with_context(|| format!("Invalid scene config: {:?}", path))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            background: BackgroundConfig::default(),
            camera: CameraConfig::default(),
            lights: LightsConfig::default(),
            renderer: RendererConfig::default(),
            models: vec![ModelConfig {
                path: PathBuf::from("models/Parrot.glb"),
                position: [0.0, 0.0, 0.0],
            }],
        }
    }
}

/// Container the rendering output is attached to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Aviary".to_string(),
            width: 800,
            height: 600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    /// Solid colour used when no image is set or the image fails to load
    pub color: u32,
    pub image: Option<PathBuf>,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            color: 0x222222,
            image: Some(PathBuf::from("textures/Rainforest.jpg")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: 30.0,
            near: 0.1,
            far: 100.0,
            position: [-1.5, 1.5, 6.5],
            target: [0.0, 0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightsConfig {
    pub hemisphere: HemisphereConfig,
    pub directional: DirectionalConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HemisphereConfig {
    pub sky_color: u32,
    pub ground_color: u32,
    pub intensity: f32,
}

impl Default for HemisphereConfig {
    fn default() -> Self {
        Self {
            sky_color: 0xddeeff,
            ground_color: 0x0f0e0d,
            intensity: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionalConfig {
    pub color: u32,
    pub intensity: f32,
    pub position: [f32; 3],
}

impl Default for DirectionalConfig {
    fn default() -> Self {
        Self {
            color: 0xffffff,
            intensity: 5.0,
            position: [10.0, 10.0, 10.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub antialias: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self { antialias: true }
    }
}

/// One model to request at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub position: [f32; 3],
}

impl ModelConfig {
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_parrot_demo() {
        let config = SceneConfig::default();

        assert_eq!(config.camera.fov, 30.0);
        assert_eq!(config.camera.position, [-1.5, 1.5, 6.5]);
        assert_eq!(config.lights.hemisphere.sky_color, 0xddeeff);
        assert_eq!(config.lights.directional.position, [10.0, 10.0, 10.0]);
        assert_eq!(config.models.len(), 1);
        assert_eq!(config.models[0].path, PathBuf::from("models/Parrot.glb"));
        assert_eq!(config.models[0].position(), Vec3::ZERO);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = SceneConfig::from_json(
            r#"{
                "camera": { "fov": 45.0 },
                "models": [
                    { "path": "models/Flamingo.glb", "position": [7.5, 0.0, -10.0] },
                    { "path": "models/Stork.glb" }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.camera.fov, 45.0);
        assert_eq!(config.camera.near, 0.1);
        assert_eq!(config.window, WindowConfig::default());
        assert_eq!(config.models.len(), 2);
        assert_eq!(config.models[0].position(), Vec3::new(7.5, 0.0, -10.0));
        assert_eq!(config.models[1].position(), Vec3::ZERO);
    }

    #[test]
    fn null_background_image_disables_backdrop() {
        let config = SceneConfig::from_json(r#"{ "background": { "image": null } }"#).unwrap();
        assert_eq!(config.background.image, None);
        assert_eq!(config.background.color, 0x222222);
    }

    #[test]
    fn example_config_lists_three_birds() {
        let config = SceneConfig::from_json(include_str!("../scene.example.json")).unwrap();

        assert_eq!(config.models.len(), 3);
        assert_eq!(config.models[2].position(), Vec3::new(0.0, -2.5, -10.0));
        assert_eq!(config.background.color, 0x222222);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(SceneConfig::from_json("{ models: ").is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = SceneConfig::from_file("does/not/exist.json").unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read scene config"));
    }
}

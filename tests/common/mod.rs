#![allow(dead_code)]

use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use aviary::camera::PerspectiveCamera;
use aviary::config::{BackgroundConfig, ModelConfig, SceneConfig};
use aviary::core::{Button, Controller, Viewport};
use aviary::scene::Scene;
use aviary::traits::SceneRenderer;

const GLB_MAGIC: u32 = 0x4654_6C67;
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;

/// Keyframe times of the "fly" clip
pub const FLY_TIMES: [f32; 3] = [0.0, 1.0, 2.0];

/// Binary chunk: triangle positions, indices, keyframe times, translations
fn binary_chunk() -> Vec<u8> {
    let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    let indices: [u32; 3] = [0, 1, 2];
    let translations: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0];

    let mut bin = Vec::new();
    bin.extend(positions.iter().flat_map(|v| v.to_le_bytes()));
    bin.extend(indices.iter().flat_map(|v| v.to_le_bytes()));
    bin.extend(FLY_TIMES.iter().flat_map(|v| v.to_le_bytes()));
    bin.extend(translations.iter().flat_map(|v| v.to_le_bytes()));
    bin
}

/// glTF document: root node `name` with a child "body" holding one triangle
fn document(name: &str, bin_len: usize, animated: bool) -> serde_json::Value {
    let mut doc = json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [
            { "name": name, "children": [1] },
            { "name": "body", "mesh": 0 }
        ],
        "meshes": [{
            "name": "triangle",
            "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1 }]
        }],
        "buffers": [{ "byteLength": bin_len }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 12, "target": 34963 },
            { "buffer": 0, "byteOffset": 48, "byteLength": 12 },
            { "buffer": 0, "byteOffset": 60, "byteLength": 36 }
        ],
        "accessors": [
            {
                "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
            },
            { "bufferView": 1, "componentType": 5125, "count": 3, "type": "SCALAR" },
            {
                "bufferView": 2, "componentType": 5126, "count": 3, "type": "SCALAR",
                "min": [0.0], "max": [2.0]
            },
            { "bufferView": 3, "componentType": 5126, "count": 3, "type": "VEC3" }
        ]
    });

    if animated {
        doc["animations"] = json!([{
            "name": "fly",
            "channels": [{ "sampler": 0, "target": { "node": 1, "path": "translation" } }],
            "samplers": [{ "input": 2, "output": 3, "interpolation": "LINEAR" }]
        }]);
    }

    doc
}

fn pack_glb(json: &[u8], bin: &[u8]) -> Vec<u8> {
    let mut json = json.to_vec();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    let mut bin = bin.to_vec();
    while bin.len() % 4 != 0 {
        bin.push(0);
    }

    let total = 12 + 8 + json.len() + 8 + bin.len();
    let mut glb = Vec::with_capacity(total);
    glb.extend(GLB_MAGIC.to_le_bytes());
    glb.extend(2u32.to_le_bytes());
    glb.extend((total as u32).to_le_bytes());

    glb.extend((json.len() as u32).to_le_bytes());
    glb.extend(CHUNK_JSON.to_le_bytes());
    glb.extend(json);

    glb.extend((bin.len() as u32).to_le_bytes());
    glb.extend(CHUNK_BIN.to_le_bytes());
    glb.extend(bin);
    glb
}

fn build(name: &str, animated: bool) -> Vec<u8> {
    let bin = binary_chunk();
    let json = serde_json::to_vec(&document(name, bin.len(), animated)).unwrap();
    pack_glb(&json, &bin)
}

/// Triangle model whose "body" node flies along +X over two seconds
pub fn animated_glb(name: &str) -> Vec<u8> {
    build(name, true)
}

/// Same triangle without animations
pub fn static_glb(name: &str) -> Vec<u8> {
    build(name, false)
}

/// Scratch directory removed on drop
pub struct Fixtures {
    dir: PathBuf,
}

impl Fixtures {
    pub fn new(tag: &str) -> Self {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let dir = std::env::temp_dir().join(format!(
            "aviary-{}-{}-{}",
            tag,
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::SeqCst)
        ));
        std::fs::create_dir_all(&dir).unwrap();
        Self { dir }
    }

    pub fn write(&self, file: &str, bytes: &[u8]) -> PathBuf {
        let path = self.dir.join(file);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Drop for Fixtures {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.dir).ok();
    }
}

/// Scene config without a backdrop image, loading `models`
pub fn config_with(models: Vec<ModelConfig>) -> SceneConfig {
    SceneConfig {
        background: BackgroundConfig {
            image: None,
            ..BackgroundConfig::default()
        },
        models,
        ..SceneConfig::default()
    }
}

pub fn model_at(path: impl Into<PathBuf>, position: [f32; 3]) -> ModelConfig {
    ModelConfig {
        path: path.into(),
        position,
    }
}

/// Renderer that records what it was asked to do
#[derive(Debug, Default)]
pub struct MockRenderer {
    /// Model count seen by each rendered frame
    pub frames: Vec<usize>,
    pub resizes: Vec<Viewport>,
    pub aspect: Option<f32>,
}

impl SceneRenderer for MockRenderer {
    fn resize(&mut self, viewport: Viewport) {
        self.resizes.push(viewport);
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> anyhow::Result<()> {
        self.frames.push(scene.model_count());
        self.aspect = Some(camera.aspect);
        Ok(())
    }
}

/// Controller with nothing pressed and no motion
pub struct NoInput;

impl Controller for NoInput {
    fn is_down(&self, _button: Button) -> bool {
        false
    }

    fn get_down_keys(&self) -> &[Button] {
        &[]
    }

    fn pointer_delta(&self) -> (f32, f32) {
        (0.0, 0.0)
    }

    fn scroll_delta(&self) -> f32 {
        0.0
    }
}

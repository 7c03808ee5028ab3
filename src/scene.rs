use glam::{Mat4, Quat, Vec3};

use crate::config::{BackgroundConfig, LightsConfig};

/// Linear RGB colour
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Colour from a 0xRRGGBB value
    pub fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as f32 / 255.0,
            g: ((hex >> 8) & 0xff) as f32 / 255.0,
            b: (hex & 0xff) as f32 / 255.0,
        }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

/// Decoded RGBA8 image
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// What is drawn behind the models
#[derive(Debug, Clone)]
pub enum Background {
    Color(Color),
    Texture(TextureData),
}

impl Background {
    /// Backdrop from config, falling back to the solid colour if the image can't be read
    pub fn from_config(config: &BackgroundConfig) -> Self {
        let color = Color::from_hex(config.color);

        match &config.image {
            Some(path) => match crate::loaders::texture::load_image(path) {
                Ok(texture) => Background::Texture(texture),
                Err(e) => {
                    log::warn!("Backdrop unavailable, using solid colour: {:#}", e);
                    Background::Color(color)
                }
            },
            None => Background::Color(color),
        }
    }

    /// Solid colour used to clear the frame
    pub fn clear_color(&self) -> Color {
        match self {
            Background::Color(color) => *color,
            Background::Texture(_) => Color::new(0.0, 0.0, 0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Light {
    /// Sky/ground gradient lighting from above and below
    Hemisphere {
        sky_color: Color,
        ground_color: Color,
        intensity: f32,
    },
    /// Parallel light shining from `position` towards `target`
    Directional {
        color: Color,
        intensity: f32,
        position: Vec3,
        target: Vec3,
    },
}

impl Light {
    pub fn from_config(config: &LightsConfig) -> [Light; 2] {
        let hemisphere = &config.hemisphere;
        let directional = &config.directional;

        [
            Light::Hemisphere {
                sky_color: Color::from_hex(hemisphere.sky_color),
                ground_color: Color::from_hex(hemisphere.ground_color),
                intensity: hemisphere.intensity,
            },
            Light::Directional {
                color: Color::from_hex(directional.color),
                intensity: directional.intensity,
                position: Vec3::from_array(directional.position),
                target: Vec3::ZERO,
            },
        ]
    }
}

/// Index of a model in its scene; models are never removed so ids stay valid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(pub usize);

/// Node of a model's hierarchy with its local transform
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: Option<String>,
    pub parent: Option<usize>,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub mesh: Option<usize>,
    /// Morph target weights applied to this node's mesh
    pub weights: Vec<f32>,
}

impl Node {
    pub fn new(name: Option<String>, parent: Option<usize>) -> Self {
        Self {
            name,
            parent,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            mesh: None,
            weights: Vec::new(),
        }
    }

    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MorphTarget {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
}

/// Triangle list with per-vertex attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub colors: Vec<[f32; 4]>,
    pub indices: Vec<u32>,
    pub morph_targets: Vec<MorphTarget>,
    pub material: usize,
}

impl Primitive {
    pub fn has_morph_targets(&self) -> bool {
        !self.morph_targets.is_empty()
    }

    /// Positions and normals with morph target displacements applied
    pub fn morphed(&self, weights: &[f32]) -> (Vec<[f32; 3]>, Vec<[f32; 3]>) {
        let mut positions = self.positions.clone();
        let mut normals = self.normals.clone();

        for (target, &weight) in self.morph_targets.iter().zip(weights) {
            if weight == 0.0 {
                continue;
            }
            for (p, d) in positions.iter_mut().zip(&target.positions) {
                p[0] += d[0] * weight;
                p[1] += d[1] * weight;
                p[2] += d[2] * weight;
            }
            for (n, d) in normals.iter_mut().zip(&target.normals) {
                n[0] += d[0] * weight;
                n[1] += d[1] * weight;
                n[2] += d[2] * weight;
            }
        }

        for n in normals.iter_mut() {
            let v = Vec3::from_array(*n).normalize_or_zero();
            *n = v.to_array();
        }

        (positions, normals)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub name: Option<String>,
    pub primitives: Vec<Primitive>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub base_color: [f32; 4],
    pub texture: Option<usize>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base_color: [1.0, 1.0, 1.0, 1.0],
            texture: None,
        }
    }
}

/// A loaded model: one root object and everything below it
///
/// Nodes are stored parents-first, so node 0 is the root and a single
/// forward pass resolves world transforms.
#[derive(Debug, Clone)]
pub struct Model {
    pub name: Option<String>,
    pub nodes: Vec<Node>,
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
    pub textures: Vec<TextureData>,
}

impl Model {
    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    pub fn position(&self) -> Vec3 {
        self.nodes[0].translation
    }

    /// Place the model in the world by moving its root
    pub fn set_position(&mut self, position: Vec3) {
        self.nodes[0].translation = position;
    }

    pub fn world_matrices(&self) -> Vec<Mat4> {
        let mut world: Vec<Mat4> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let local = node.local_matrix();
            let matrix = match node.parent {
                Some(parent) => world[parent] * local,
                None => local,
            };
            world.push(matrix);
        }
        world
    }

    pub fn find_node(&self, name: &str) -> Option<usize> {
        self.nodes
            .iter()
            .position(|node| node.name.as_deref() == Some(name))
    }
}

/// Scene graph root: backdrop, lights and models
#[derive(Debug, Clone)]
pub struct Scene {
    pub background: Background,
    lights: Vec<Light>,
    models: Vec<Model>,
}

impl Scene {
    pub fn new(background: Background) -> Self {
        Self {
            background,
            lights: Vec::new(),
            models: Vec::new(),
        }
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn add_model(&mut self, model: Model) -> ModelId {
        self.models.push(model);
        ModelId(self.models.len() - 1)
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn models(&self) -> impl Iterator<Item = (ModelId, &Model)> {
        self.models
            .iter()
            .enumerate()
            .map(|(index, model)| (ModelId(index), model))
    }

    pub fn model(&self, id: ModelId) -> Option<&Model> {
        self.models.get(id.0)
    }

    pub fn model_mut(&mut self, id: ModelId) -> Option<&mut Model> {
        self.models.get_mut(id.0)
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    /// Direct children of the scene: lights and models
    pub fn child_count(&self) -> usize {
        self.lights.len() + self.models.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_level_model() -> Model {
        let mut root = Node::new(Some("root".to_string()), None);
        root.translation = Vec3::new(1.0, 0.0, 0.0);

        let mut child = Node::new(Some("wing".to_string()), Some(0));
        child.translation = Vec3::new(0.0, 2.0, 0.0);

        Model {
            name: None,
            nodes: vec![root, child],
            meshes: Vec::new(),
            materials: vec![Material::default()],
            textures: Vec::new(),
        }
    }

    #[test]
    fn color_from_hex() {
        let color = Color::from_hex(0xff8000);
        assert_eq!(color.r, 1.0);
        assert!((color.g - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(color.b, 0.0);
    }

    #[test]
    fn world_matrices_compose_parents() {
        let model = two_level_model();
        let world = model.world_matrices();

        let wing = world[1].transform_point3(Vec3::ZERO);
        assert_eq!(wing, Vec3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn set_position_moves_root() {
        let mut model = two_level_model();
        model.set_position(Vec3::new(0.0, 0.0, -10.0));

        assert_eq!(model.position(), Vec3::new(0.0, 0.0, -10.0));
        let wing = model.world_matrices()[1].transform_point3(Vec3::ZERO);
        assert_eq!(wing, Vec3::new(0.0, 2.0, -10.0));
    }

    #[test]
    fn find_node_by_name() {
        let model = two_level_model();
        assert_eq!(model.find_node("wing"), Some(1));
        assert_eq!(model.find_node("tail"), None);
    }

    #[test]
    fn scene_counts_lights_and_models() {
        let mut scene = Scene::new(Background::Color(Color::WHITE));
        for light in Light::from_config(&LightsConfig::default()) {
            scene.add_light(light);
        }
        assert_eq!(scene.child_count(), 2);

        let id = scene.add_model(two_level_model());
        assert_eq!(id, ModelId(0));
        assert_eq!(scene.child_count(), 3);
        assert_eq!(scene.model_count(), 1);
        assert!(scene.model(ModelId(1)).is_none());
    }

    #[test]
    fn morph_weights_displace_positions() {
        let primitive = Primitive {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
            normals: vec![[0.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            uvs: vec![[0.0, 0.0]; 2],
            colors: vec![[1.0; 4]; 2],
            indices: Vec::new(),
            morph_targets: vec![MorphTarget {
                positions: vec![[0.0, 2.0, 0.0], [0.0, 4.0, 0.0]],
                normals: Vec::new(),
            }],
            material: 0,
        };

        let (positions, normals) = primitive.morphed(&[0.5]);
        assert_eq!(positions, vec![[0.0, 1.0, 0.0], [1.0, 2.0, 0.0]]);
        assert_eq!(normals, primitive.normals);

        let (rest, _) = primitive.morphed(&[]);
        assert_eq!(rest, primitive.positions);
    }

    #[test]
    fn lights_from_config_shine_at_origin() {
        let [hemisphere, directional] = Light::from_config(&LightsConfig::default());

        assert!(matches!(hemisphere, Light::Hemisphere { intensity, .. } if intensity == 5.0));
        match directional {
            Light::Directional { position, target, color, .. } => {
                assert_eq!(position, Vec3::new(10.0, 10.0, 10.0));
                assert_eq!(target, Vec3::ZERO);
                assert_eq!(color, Color::WHITE);
            }
            other => panic!("expected directional light, got {:?}", other),
        }
    }
}

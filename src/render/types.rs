use glam::{Mat4, Vec3};

use crate::scene::{Light, Primitive};

/// Most directional lights the mesh shader accumulates
pub const MAX_DIRECTIONAL_LIGHTS: usize = 4;

/// Camera uniform buffer data for GPU
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub position: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DirectionalLightUniform {
    /// Unit vector pointing from the surface towards the light
    pub direction: [f32; 4],
    /// RGB colour premultiplied by intensity
    pub color: [f32; 4],
}

/// Per-frame uniform: camera plus lights
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniform {
    pub camera: CameraUniform,
    /// Hemisphere sky colour premultiplied by intensity
    pub sky_color: [f32; 4],
    pub ground_color: [f32; 4],
    pub directional: [DirectionalLightUniform; MAX_DIRECTIONAL_LIGHTS],
    /// x = number of directional lights in use
    pub light_count: [u32; 4],
}

impl FrameUniform {
    pub fn new(camera: CameraUniform, lights: &[Light]) -> Self {
        let mut uniform = Self {
            camera,
            sky_color: [0.0; 4],
            ground_color: [0.0; 4],
            directional: [DirectionalLightUniform::default(); MAX_DIRECTIONAL_LIGHTS],
            light_count: [0; 4],
        };

        let mut count = 0;
        for light in lights {
            match *light {
                Light::Hemisphere {
                    sky_color,
                    ground_color,
                    intensity,
                } => {
                    let sky = Vec3::from_array(sky_color.to_array()) * intensity;
                    let ground = Vec3::from_array(ground_color.to_array()) * intensity;
                    uniform.sky_color = (Vec3::from_slice(&uniform.sky_color[..3]) + sky).extend(0.0).to_array();
                    uniform.ground_color =
                        (Vec3::from_slice(&uniform.ground_color[..3]) + ground).extend(0.0).to_array();
                }
                Light::Directional {
                    color,
                    intensity,
                    position,
                    target,
                } => {
                    if count == MAX_DIRECTIONAL_LIGHTS {
                        log::warn!("More than {} directional lights; extra ignored", MAX_DIRECTIONAL_LIGHTS);
                        continue;
                    }
                    let direction = (position - target).normalize_or(Vec3::Y);
                    uniform.directional[count] = DirectionalLightUniform {
                        direction: direction.extend(0.0).to_array(),
                        color: (Vec3::from_array(color.to_array()) * intensity).extend(0.0).to_array(),
                    };
                    count += 1;
                }
            }
        }
        uniform.light_count[0] = count as u32;

        uniform
    }
}

/// Per-draw uniform: node transform and material factor
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniform {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
    pub base_color: [f32; 4],
}

impl DrawUniform {
    pub fn new(world: Mat4, base_color: [f32; 4]) -> Self {
        Self {
            model: world.to_cols_array_2d(),
            normal: world.inverse().transpose().to_cols_array_2d(),
            base_color,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 4] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2, 3 => Float32x4];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }

    /// Interleave a primitive's attributes, blending morph targets with `weights`
    pub fn build(primitive: &Primitive, weights: &[f32]) -> Vec<Vertex> {
        let (positions, normals) = if primitive.has_morph_targets() && !weights.is_empty() {
            primitive.morphed(weights)
        } else {
            (primitive.positions.clone(), primitive.normals.clone())
        };

        positions
            .iter()
            .enumerate()
            .map(|(i, &position)| Vertex {
                position,
                normal: normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                uv: primitive.uvs.get(i).copied().unwrap_or([0.0, 0.0]),
                color: primitive.colors.get(i).copied().unwrap_or([1.0; 4]),
            })
            .collect()
    }
}

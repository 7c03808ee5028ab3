use anyhow::{anyhow, Context, Result};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use wgpu::util::DeviceExt;
use wgpu::{
    BindGroup, BindGroupLayout, Buffer, Device, RenderPipeline, Sampler, Surface, SurfaceConfiguration,
    TextureFormat, TextureView,
};
use winit::window::Window;

use super::types::{DrawUniform, FrameUniform, Vertex};
use crate::camera::PerspectiveCamera;
use crate::core::{GpuContext, Viewport};
use crate::loaders::texture::fit_to_limit;
use crate::scene::{Background, Model, ModelId, Scene, TextureData};
use crate::traits::SceneRenderer;

const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;
const MSAA_SAMPLES: u32 = 4;

/// Buffers for one primitive of a model's mesh
struct GpuPrimitive {
    vertex_buffer: Buffer,
    index_buffer: Buffer,
    index_count: u32,
}

/// One node drawing one primitive
struct GpuDraw {
    node: usize,
    mesh: usize,
    primitive: usize,
    uniform: Buffer,
    bind_group: BindGroup,
    /// Per-node vertices when the primitive is morphed
    morph_buffer: Option<Buffer>,
}

struct GpuModel {
    primitives: Vec<Vec<GpuPrimitive>>,
    draws: Vec<GpuDraw>,
}

/// Upload state of the backdrop image
enum Backdrop {
    Pending,
    Ready(BindGroup),
    /// Upload failed; the clear colour shows instead
    Unavailable,
}

/// Rasterizes a [`Scene`] into a window surface
///
/// Models are uploaded the first time they are drawn and cached by id. A model
/// that fails to upload is cached as `None` and skipped from then on.
pub struct WgpuRenderer {
    gpu: GpuContext,
    surface: Surface<'static>,
    config: SurfaceConfiguration,
    sample_count: u32,
    depth_view: TextureView,
    msaa_view: Option<TextureView>,
    frame_buffer: Buffer,
    frame_bind_group: BindGroup,
    draw_layout: BindGroupLayout,
    mesh_pipeline: RenderPipeline,
    background_layout: BindGroupLayout,
    background_pipeline: RenderPipeline,
    backdrop: Backdrop,
    sampler: Sampler,
    white_texture: TextureView,
    models: HashMap<ModelId, Option<GpuModel>>,
}

impl WgpuRenderer {
    pub async fn new(window: Arc<Window>, viewport: Viewport, antialias: bool) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .context("Failed to create window surface")?;

        let gpu = GpuContext::new_with_surface(&instance, &surface).await?;
        let config = gpu.surface_config(&surface, viewport.width, viewport.height)?;
        surface.configure(gpu.device(), &config);

        let sample_count = if antialias {
            gpu.sample_count(config.format, MSAA_SAMPLES)
        } else {
            1
        };
        log::info!(
            "Surface {}x{} {:?}, {}x MSAA",
            config.width,
            config.height,
            config.format,
            sample_count
        );

        let device = gpu.device();

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Bind Group Layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT)],
        });
        let draw_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Draw Bind Group Layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT),
                texture_entry(1),
                sampler_entry(2),
            ],
        });
        let background_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Background Bind Group Layout"),
            entries: &[texture_entry(0), sampler_entry(1)],
        });

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniform Buffer"),
            size: std::mem::size_of::<FrameUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let mesh_pipeline = create_mesh_pipeline(device, &frame_layout, &draw_layout, config.format, sample_count);
        let background_pipeline = create_background_pipeline(device, &background_layout, config.format, sample_count);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Texture Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let white = TextureData {
            width: 1,
            height: 1,
            data: vec![255; 4],
        };
        let white_texture = upload_texture(&gpu, "White Texture", &white)?;

        let (depth_view, msaa_view) = create_attachments(device, &config, sample_count);

        Ok(Self {
            gpu,
            surface,
            config,
            sample_count,
            depth_view,
            msaa_view,
            frame_buffer,
            frame_bind_group,
            draw_layout,
            mesh_pipeline,
            background_layout,
            background_pipeline,
            backdrop: Backdrop::Pending,
            sampler,
            white_texture,
            models: HashMap::new(),
        })
    }

    /// MSAA sample count in use; 1 when antialiasing is off or unsupported
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    fn upload_background(&self, texture: &TextureData) -> Result<BindGroup> {
        let view = upload_texture(&self.gpu, "Backdrop Texture", texture)?;
        Ok(self.gpu.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Backdrop Bind Group"),
            layout: &self.background_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        }))
    }

    fn upload_model(&self, id: ModelId, model: &Model) -> Result<GpuModel> {
        let device = self.gpu.device();

        let max_buffer_size = device.limits().max_buffer_size;
        for mesh in &model.meshes {
            for primitive in &mesh.primitives {
                let vertex_bytes = (primitive.positions.len() * std::mem::size_of::<Vertex>()) as u64;
                let index_bytes = (primitive.indices.len() * std::mem::size_of::<u32>()) as u64;
                if vertex_bytes.max(index_bytes) > max_buffer_size {
                    return Err(anyhow!(
                        "Mesh {:?} needs {} bytes, device allows {}",
                        mesh.name,
                        vertex_bytes.max(index_bytes),
                        max_buffer_size
                    ));
                }
            }
        }

        // A bad texture only costs its own material, which falls back to white
        let textures: Vec<Option<TextureView>> = model
            .textures
            .iter()
            .enumerate()
            .map(|(i, texture)| {
                let label = format!("Model {} Texture {}", id.0, i);
                upload_texture(&self.gpu, &label, texture)
                    .map_err(|e| log::warn!("{:#}, using white", e))
                    .ok()
            })
            .collect();

        let primitives = model
            .meshes
            .iter()
            .map(|mesh| {
                mesh.primitives
                    .iter()
                    .map(|primitive| {
                        let vertices = Vertex::build(primitive, &[]);
                        GpuPrimitive {
                            vertex_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                                label: Some("Vertex Buffer"),
                                contents: bytemuck::cast_slice(&vertices),
                                usage: wgpu::BufferUsages::VERTEX,
                            }),
                            index_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                                label: Some("Index Buffer"),
                                contents: bytemuck::cast_slice(&primitive.indices),
                                usage: wgpu::BufferUsages::INDEX,
                            }),
                            index_count: primitive.indices.len() as u32,
                        }
                    })
                    .collect()
            })
            .collect();

        let mut draws = Vec::new();
        for (node_index, node) in model.nodes.iter().enumerate() {
            let Some(mesh_index) = node.mesh else { continue };
            let Some(mesh) = model.meshes.get(mesh_index) else {
                log::warn!("Node {:?} references missing mesh {}", node.name, mesh_index);
                continue;
            };

            for (primitive_index, primitive) in mesh.primitives.iter().enumerate() {
                let texture = model
                    .materials
                    .get(primitive.material)
                    .and_then(|material| material.texture)
                    .and_then(|texture| textures.get(texture))
                    .and_then(Option::as_ref)
                    .unwrap_or(&self.white_texture);

                let uniform = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("Draw Uniform Buffer"),
                    size: std::mem::size_of::<DrawUniform>() as wgpu::BufferAddress,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Draw Bind Group"),
                    layout: &self.draw_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: uniform.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(texture),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::Sampler(&self.sampler),
                        },
                    ],
                });

                let morph_buffer = primitive.has_morph_targets().then(|| {
                    device.create_buffer(&wgpu::BufferDescriptor {
                        label: Some("Morph Vertex Buffer"),
                        size: (primitive.positions.len() * std::mem::size_of::<Vertex>()) as wgpu::BufferAddress,
                        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                        mapped_at_creation: false,
                    })
                });

                draws.push(GpuDraw {
                    node: node_index,
                    mesh: mesh_index,
                    primitive: primitive_index,
                    uniform,
                    bind_group,
                    morph_buffer,
                });
            }
        }

        log::debug!(
            "Uploaded model {:?}: {} draws, {} textures",
            model.name,
            draws.len(),
            textures.len()
        );

        Ok(GpuModel { primitives, draws })
    }

    /// Write this frame's transforms and morphed vertices
    fn update_model(&self, gpu_model: &GpuModel, model: &Model) {
        let queue = self.gpu.queue();
        let world = model.world_matrices();

        for draw in &gpu_model.draws {
            let node = &model.nodes[draw.node];
            let primitive = &model.meshes[draw.mesh].primitives[draw.primitive];
            let base_color = model
                .materials
                .get(primitive.material)
                .map(|material| material.base_color)
                .unwrap_or([1.0; 4]);

            let uniform = DrawUniform::new(world[draw.node], base_color);
            queue.write_buffer(&draw.uniform, 0, bytemuck::bytes_of(&uniform));

            if let Some(buffer) = &draw.morph_buffer {
                let vertices = Vertex::build(primitive, &node.weights);
                queue.write_buffer(buffer, 0, bytemuck::cast_slice(&vertices));
            }
        }
    }

    fn acquire_frame(&mut self) -> Result<Option<wgpu::SurfaceTexture>> {
        match self.surface.get_current_texture() {
            Ok(frame) => Ok(Some(frame)),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost, reconfiguring");
                self.surface.configure(self.gpu.device(), &self.config);
                Ok(None)
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Timed out acquiring surface texture, frame skipped");
                Ok(None)
            }
            Err(e) => Err(anyhow!("Failed to acquire surface texture: {:?}", e)),
        }
    }
}

impl SceneRenderer for WgpuRenderer {
    fn resize(&mut self, viewport: Viewport) {
        if viewport.is_empty() {
            return;
        }

        self.config.width = viewport.width;
        self.config.height = viewport.height;
        self.surface.configure(self.gpu.device(), &self.config);

        let (depth_view, msaa_view) = create_attachments(self.gpu.device(), &self.config, self.sample_count);
        self.depth_view = depth_view;
        self.msaa_view = msaa_view;
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<()> {
        if let Background::Texture(texture) = &scene.background {
            if matches!(self.backdrop, Backdrop::Pending) {
                self.backdrop = match self.upload_background(texture) {
                    Ok(bind_group) => Backdrop::Ready(bind_group),
                    Err(e) => {
                        log::error!("Backdrop upload failed, using background colour: {:#}", e);
                        Backdrop::Unavailable
                    }
                };
            }
        }

        let mut models = std::mem::take(&mut self.models);
        for (id, model) in scene.models() {
            cache_upload(&mut models, id, || self.upload_model(id, model));
        }
        self.models = models;

        let Some(frame) = self.acquire_frame()? else {
            return Ok(());
        };
        let surface_view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let uniform = FrameUniform::new(camera.to_uniform(), scene.lights());
        self.gpu
            .queue()
            .write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&uniform));

        for (id, model) in scene.models() {
            if let Some(Some(gpu_model)) = self.models.get(&id) {
                self.update_model(gpu_model, model);
            }
        }

        let clear = scene.background.clear_color();
        let (view, resolve_target) = match &self.msaa_view {
            Some(msaa) => (msaa, Some(&surface_view)),
            None => (&surface_view, None),
        };

        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Scene Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: clear.r as f64,
                            g: clear.g as f64,
                            b: clear.b as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let (Background::Texture(_), Backdrop::Ready(bind_group)) = (&scene.background, &self.backdrop) {
                render_pass.set_pipeline(&self.background_pipeline);
                render_pass.set_bind_group(0, bind_group, &[]);
                render_pass.draw(0..3, 0..1); // Fullscreen triangle
            }

            render_pass.set_pipeline(&self.mesh_pipeline);
            render_pass.set_bind_group(0, &self.frame_bind_group, &[]);

            for (id, _) in scene.models() {
                let Some(Some(gpu_model)) = self.models.get(&id) else { continue };
                for draw in &gpu_model.draws {
                    let primitive = &gpu_model.primitives[draw.mesh][draw.primitive];
                    if primitive.index_count == 0 {
                        continue;
                    }
                    let vertices = draw.morph_buffer.as_ref().unwrap_or(&primitive.vertex_buffer);

                    render_pass.set_bind_group(1, &draw.bind_group, &[]);
                    render_pass.set_vertex_buffer(0, vertices.slice(..));
                    render_pass.set_index_buffer(primitive.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    render_pass.draw_indexed(0..primitive.index_count, 0, 0..1);
                }
            }
        }

        self.gpu.queue().submit(Some(encoder.finish()));
        frame.present();

        Ok(())
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

/// Upload the GPU copy of `id` unless an earlier attempt, successful or not,
/// is already cached
fn cache_upload<T>(cache: &mut HashMap<ModelId, Option<T>>, id: ModelId, upload: impl FnOnce() -> Result<T>) {
    if cache.contains_key(&id) {
        return;
    }

    let uploaded = match upload() {
        Ok(gpu_model) => Some(gpu_model),
        Err(e) => {
            log::error!("Skipping model {:?}, upload failed: {:#}", id, e);
            None
        }
    };
    cache.insert(id, uploaded);
}

/// Upload RGBA8 sRGB pixels, downscaled to the device's texture size limit
fn upload_texture(gpu: &GpuContext, label: &str, texture: &TextureData) -> Result<TextureView> {
    let max_dimension = gpu.device().limits().max_texture_dimension_2d;
    let texture = fit_to_limit(texture, max_dimension).with_context(|| format!("Texture {}", label))?;
    if let Cow::Owned(_) = texture {
        log::warn!(
            "{} exceeds the {}px texture limit, downscaled to {}x{}",
            label,
            max_dimension,
            texture.width,
            texture.height
        );
    }

    let size = wgpu::Extent3d {
        width: texture.width,
        height: texture.height,
        depth_or_array_layers: 1,
    };
    let gpu_texture = gpu.device().create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    gpu.queue().write_texture(
        gpu_texture.as_image_copy(),
        &texture.data,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * texture.width),
            rows_per_image: Some(texture.height),
        },
        size,
    );

    Ok(gpu_texture.create_view(&wgpu::TextureViewDescriptor::default()))
}

/// Depth buffer plus the multisampled colour target when MSAA is on
fn create_attachments(
    device: &Device,
    config: &SurfaceConfiguration,
    sample_count: u32,
) -> (TextureView, Option<TextureView>) {
    let size = wgpu::Extent3d {
        width: config.width,
        height: config.height,
        depth_or_array_layers: 1,
    };

    let depth = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size,
        mip_level_count: 1,
        sample_count,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });

    let msaa = (sample_count > 1).then(|| {
        device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("MSAA Color Texture"),
                size,
                mip_level_count: 1,
                sample_count,
                dimension: wgpu::TextureDimension::D2,
                format: config.format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default())
    });

    (depth.create_view(&wgpu::TextureViewDescriptor::default()), msaa)
}

fn create_mesh_pipeline(
    device: &Device,
    frame_layout: &BindGroupLayout,
    draw_layout: &BindGroupLayout,
    format: TextureFormat,
    sample_count: u32,
) -> RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Mesh Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/mesh.wgsl").into()),
    });

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Mesh Pipeline Layout"),
        bind_group_layouts: &[frame_layout, draw_layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Mesh Pipeline"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[Vertex::layout()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: sample_count,
            ..Default::default()
        },
        multiview: None,
        cache: None,
    })
}

fn create_background_pipeline(
    device: &Device,
    layout: &BindGroupLayout,
    format: TextureFormat,
    sample_count: u32,
) -> RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Background Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/background.wgsl").into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Background Pipeline Layout"),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Background Pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        // Drawn first and never occludes
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::Always,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: sample_count,
            ..Default::default()
        },
        multiview: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_upload_is_not_retried() {
        let mut cache: HashMap<ModelId, Option<&str>> = HashMap::new();
        let mut attempts = 0;

        for _ in 0..3 {
            cache_upload(&mut cache, ModelId(0), || {
                attempts += 1;
                Err(anyhow!("texture too large"))
            });
        }

        assert_eq!(attempts, 1);
        assert_eq!(cache.get(&ModelId(0)), Some(&None));
    }

    #[test]
    fn one_failure_leaves_other_models_drawable() {
        let mut cache = HashMap::new();

        cache_upload(&mut cache, ModelId(0), || Err(anyhow!("buffer too large")));
        cache_upload(&mut cache, ModelId(1), || Ok("parrot"));
        cache_upload(&mut cache, ModelId(1), || Ok("replaced"));

        assert_eq!(cache.get(&ModelId(0)), Some(&None));
        assert_eq!(cache.get(&ModelId(1)), Some(&Some("parrot")));
    }
}

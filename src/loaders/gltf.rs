use anyhow::{anyhow, bail, Context, Result};
use glam::{Quat, Vec3};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use super::texture::from_gltf_image;
use crate::animation::{AnimationClip, Channel, Interpolation, Property};
use crate::scene::{Material, Mesh, Model, MorphTarget, Node, Primitive};

/// Result of parsing an asset: its first root object and the clips bundled with it
#[derive(Debug, Clone)]
pub struct LoadedAsset {
    pub model: Model,
    pub clips: Vec<Arc<AnimationClip>>,
}

impl LoadedAsset {
    /// First animation clip, if the asset has any
    pub fn first_clip(&self) -> Option<Arc<AnimationClip>> {
        self.clips.first().cloned()
    }
}

/// Parses `.glb` or `.gltf` bytes
///
/// `base` is the directory external buffers and images are resolved against.
pub fn parse_model(bytes: &[u8], base: Option<&Path>) -> Result<LoadedAsset> {
    let gltf::Gltf { document, blob } =
        gltf::Gltf::from_slice(bytes).context("Failed to parse glTF")?;
    let buffers =
        gltf::import_buffers(&document, base, blob).context("Failed to load glTF buffers")?;
    let images =
        gltf::import_images(&document, base, &buffers).context("Failed to load glTF images")?;

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| anyhow!("glTF has no scenes"))?;
    let root = scene
        .nodes()
        .next()
        .ok_or_else(|| anyhow!("glTF scene {:?} is empty", scene.name()))?;

    log::debug!(
        "glTF: {} nodes, {} meshes, {} animations, {} images",
        document.nodes().count(),
        document.meshes().count(),
        document.animations().count(),
        images.len()
    );

    let mut builder = ModelBuilder::default();
    builder.visit_node(&root, None, &buffers)?;

    let clips = document
        .animations()
        .enumerate()
        .filter_map(|(index, animation)| {
            let clip = read_clip(&animation, index, &builder.node_map, &buffers);
            if clip.channels.is_empty() {
                log::warn!("Animation {:?} does not target the model, skipped", clip.name);
                None
            } else {
                Some(Arc::new(clip))
            }
        })
        .collect();

    let mut materials: Vec<Material> = document.materials().map(read_material).collect();
    if materials.is_empty() {
        materials.push(Material::default());
    }

    let textures = document
        .textures()
        .map(|texture| from_gltf_image(&images[texture.source().index()]))
        .collect();

    let model = Model {
        name: root.name().map(str::to_string),
        nodes: builder.nodes,
        meshes: builder.meshes,
        materials,
        textures,
    };

    Ok(LoadedAsset { model, clips })
}

/// Flattens a node subtree into parent-first order
#[derive(Default)]
struct ModelBuilder {
    nodes: Vec<Node>,
    meshes: Vec<Mesh>,
    /// glTF node index -> model node index
    node_map: HashMap<usize, usize>,
    /// glTF mesh index -> model mesh index
    mesh_map: HashMap<usize, usize>,
}

impl ModelBuilder {
    fn visit_node(
        &mut self,
        node: &gltf::Node,
        parent: Option<usize>,
        buffers: &[gltf::buffer::Data],
    ) -> Result<()> {
        let (translation, rotation, scale) = node.transform().decomposed();

        let mut model_node = Node::new(node.name().map(str::to_string), parent);
        model_node.translation = Vec3::from_array(translation);
        model_node.rotation = Quat::from_array(rotation);
        model_node.scale = Vec3::from_array(scale);

        if let Some(mesh) = node.mesh() {
            model_node.mesh = Some(self.mesh_index(&mesh, buffers)?);
            model_node.weights = node
                .weights()
                .or_else(|| mesh.weights())
                .map(<[f32]>::to_vec)
                .unwrap_or_default();
        }
        if node.skin().is_some() {
            log::warn!("Node {:?} is skinned; skinning is not supported", node.name());
        }

        let index = self.nodes.len();
        self.nodes.push(model_node);
        self.node_map.insert(node.index(), index);

        for child in node.children() {
            self.visit_node(&child, Some(index), buffers)?;
        }

        Ok(())
    }

    fn mesh_index(&mut self, mesh: &gltf::Mesh, buffers: &[gltf::buffer::Data]) -> Result<usize> {
        if let Some(&index) = self.mesh_map.get(&mesh.index()) {
            return Ok(index);
        }

        let mut primitives = Vec::new();
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!(
                    "Skipping {:?} primitive in mesh {:?}",
                    primitive.mode(),
                    mesh.name()
                );
                continue;
            }
            primitives.push(read_primitive(&primitive, buffers)?);
        }

        let index = self.meshes.len();
        self.meshes.push(Mesh {
            name: mesh.name().map(str::to_string),
            primitives,
        });
        self.mesh_map.insert(mesh.index(), index);
        Ok(index)
    }
}

fn read_primitive(primitive: &gltf::Primitive, buffers: &[gltf::buffer::Data]) -> Result<Primitive> {
    let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .context("Mesh primitive has no positions")?
        .collect();
    let count = positions.len();

    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..count as u32).collect(),
    };
    if let Some(&bad) = indices.iter().find(|&&i| i as usize >= count) {
        bail!("Index {} out of range for {} vertices", bad, count);
    }

    let normals = match reader.read_normals() {
        Some(normals) => normals.collect(),
        None => compute_normals(&positions, &indices),
    };

    let uvs = match reader.read_tex_coords(0) {
        Some(uvs) => uvs.into_f32().collect(),
        None => vec![[0.0, 0.0]; count],
    };

    let colors = match reader.read_colors(0) {
        Some(colors) => colors.into_rgba_f32().collect(),
        None => vec![[1.0, 1.0, 1.0, 1.0]; count],
    };

    let morph_targets = reader
        .read_morph_targets()
        .map(|(positions, normals, _tangents)| MorphTarget {
            positions: positions.map(Iterator::collect).unwrap_or_default(),
            normals: normals.map(Iterator::collect).unwrap_or_default(),
        })
        .collect();

    Ok(Primitive {
        positions,
        normals,
        uvs,
        colors,
        indices,
        morph_targets,
        material: primitive.material().index().unwrap_or(0),
    })
}

/// Area-weighted smooth normals for meshes that ship without them
pub fn compute_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut normals = vec![Vec3::ZERO; positions.len()];

    for triangle in indices.chunks_exact(3) {
        let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
        let v0 = Vec3::from_array(positions[a]);
        let v1 = Vec3::from_array(positions[b]);
        let v2 = Vec3::from_array(positions[c]);
        let face = (v1 - v0).cross(v2 - v0);

        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }

    normals
        .into_iter()
        .map(|n| n.try_normalize().unwrap_or(Vec3::Y).to_array())
        .collect()
}

fn read_material(material: gltf::Material) -> Material {
    let pbr = material.pbr_metallic_roughness();
    Material {
        base_color: pbr.base_color_factor(),
        texture: pbr.base_color_texture().map(|info| info.texture().index()),
    }
}

fn read_clip(
    animation: &gltf::Animation,
    index: usize,
    node_map: &HashMap<usize, usize>,
    buffers: &[gltf::buffer::Data],
) -> AnimationClip {
    let name = animation
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("animation_{}", index));

    let channels = animation
        .channels()
        .filter_map(|channel| {
            let node = *node_map.get(&channel.target().node().index())?;
            match read_channel(&channel, node, buffers) {
                Ok(channel) => Some(channel),
                Err(e) => {
                    log::warn!("Skipping channel of {:?}: {:#}", name, e);
                    None
                }
            }
        })
        .collect();

    AnimationClip::new(name, channels)
}

fn read_channel(
    channel: &gltf::animation::Channel,
    node: usize,
    buffers: &[gltf::buffer::Data],
) -> Result<Channel> {
    use gltf::animation::util::ReadOutputs;

    let reader = channel.reader(|buffer| Some(&buffers[buffer.index()]));
    let times: Vec<f32> = reader
        .read_inputs()
        .context("Channel has no keyframe times")?
        .collect();
    let outputs = reader
        .read_outputs()
        .context("Channel has no keyframe values")?;

    let interpolation = match channel.sampler().interpolation() {
        gltf::animation::Interpolation::Step => Interpolation::Step,
        gltf::animation::Interpolation::Linear => Interpolation::Linear,
        gltf::animation::Interpolation::CubicSpline => Interpolation::CubicSpline,
    };
    let groups = match interpolation {
        Interpolation::CubicSpline => 3,
        _ => 1,
    };

    let (property, values): (Property, Vec<f32>) = match outputs {
        ReadOutputs::Translations(values) => (Property::Translation, values.flatten().collect()),
        ReadOutputs::Scales(values) => (Property::Scale, values.flatten().collect()),
        ReadOutputs::Rotations(values) => (Property::Rotation, values.into_f32().flatten().collect()),
        ReadOutputs::MorphTargetWeights(values) => {
            let values: Vec<f32> = values.into_f32().collect();
            let keyframes = times.len() * groups;
            if keyframes == 0 {
                bail!("Weight channel has no keyframes");
            }
            (Property::Weights(values.len() / keyframes), values)
        }
    };

    let expected = times.len() * groups * property.stride();
    if times.is_empty() || values.len() != expected {
        bail!(
            "Expected {} values for {} keyframes, found {}",
            expected,
            times.len(),
            values.len()
        );
    }

    Ok(Channel {
        node,
        property,
        interpolation,
        times,
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_face_normals() {
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let normals = compute_normals(&positions, &[0, 1, 2]);

        for normal in normals {
            assert_eq!(normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn unreferenced_vertices_point_up() {
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [5.0, 5.0, 5.0]];
        let normals = compute_normals(&positions, &[0, 1, 2]);
        assert_eq!(normals[3], [0.0, 1.0, 0.0]);
    }

    #[test]
    fn garbage_bytes_fail_to_parse() {
        let err = parse_model(b"definitely not a model", None).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse glTF"));
    }
}

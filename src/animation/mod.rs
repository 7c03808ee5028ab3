// Keyframe clips and their sampling
pub mod mixer;

pub use mixer::{AnimationAction, AnimationMixer, LoopMode};

use glam::{Quat, Vec3};

use crate::scene::Model;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Step,
    Linear,
    /// Hermite spline; every keyframe stores in-tangent, value, out-tangent
    CubicSpline,
}

/// Node property a channel animates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    Translation,
    Rotation,
    Scale,
    /// Morph target weights, one value per target
    Weights(usize),
}

impl Property {
    /// Number of floats per keyframe value
    pub fn stride(&self) -> usize {
        match self {
            Property::Translation | Property::Scale => 3,
            Property::Rotation => 4,
            Property::Weights(count) => *count,
        }
    }
}

/// Keyframes driving one property of one node
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub node: usize,
    pub property: Property,
    pub interpolation: Interpolation,
    pub times: Vec<f32>,
    /// Flattened keyframe values (`stride` floats each, three groups per
    /// keyframe for cubic splines)
    pub values: Vec<f32>,
}

impl Channel {
    fn keyframe_len(&self) -> usize {
        match self.interpolation {
            Interpolation::CubicSpline => self.property.stride() * 3,
            _ => self.property.stride(),
        }
    }

    /// Value of keyframe `index`, skipping spline tangents
    fn value(&self, index: usize) -> &[f32] {
        let stride = self.property.stride();
        let start = index * self.keyframe_len();
        let start = match self.interpolation {
            Interpolation::CubicSpline => start + stride,
            _ => start,
        };
        &self.values[start..start + stride]
    }

    fn in_tangent(&self, index: usize) -> &[f32] {
        let start = index * self.keyframe_len();
        &self.values[start..start + self.property.stride()]
    }

    fn out_tangent(&self, index: usize) -> &[f32] {
        let stride = self.property.stride();
        let start = index * self.keyframe_len() + 2 * stride;
        &self.values[start..start + stride]
    }

    pub fn duration(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    /// Sample the channel at `time`, writing `stride` floats into `out`
    ///
    /// Times before the first keyframe hold the first value, times after the
    /// last keyframe hold the last value.
    pub fn sample(&self, time: f32, out: &mut [f32]) {
        let stride = self.property.stride();
        let count = self.times.len();
        if count == 0 || out.len() < stride {
            return;
        }

        let next = self.times.partition_point(|&t| t <= time);
        if next == 0 {
            out[..stride].copy_from_slice(self.value(0));
            return;
        }
        if next >= count {
            out[..stride].copy_from_slice(self.value(count - 1));
            return;
        }

        let prev = next - 1;
        let t0 = self.times[prev];
        let t1 = self.times[next];
        let dt = t1 - t0;
        let s = if dt > 0.0 { (time - t0) / dt } else { 0.0 };

        match self.interpolation {
            Interpolation::Step => out[..stride].copy_from_slice(self.value(prev)),
            Interpolation::Linear => {
                let a = self.value(prev);
                let b = self.value(next);
                if self.property == Property::Rotation {
                    let q = quat(a).slerp(quat(b), s);
                    out[..4].copy_from_slice(&q.to_array());
                } else {
                    for i in 0..stride {
                        out[i] = a[i] + (b[i] - a[i]) * s;
                    }
                }
            }
            Interpolation::CubicSpline => {
                let p0 = self.value(prev);
                let m0 = self.out_tangent(prev);
                let p1 = self.value(next);
                let m1 = self.in_tangent(next);

                let s2 = s * s;
                let s3 = s2 * s;
                let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
                let h10 = s3 - 2.0 * s2 + s;
                let h01 = -2.0 * s3 + 3.0 * s2;
                let h11 = s3 - s2;

                for i in 0..stride {
                    out[i] = h00 * p0[i] + h10 * dt * m0[i] + h01 * p1[i] + h11 * dt * m1[i];
                }
                if self.property == Property::Rotation {
                    let q = quat(&out[..4]).normalize();
                    out[..4].copy_from_slice(&q.to_array());
                }
            }
        }
    }

    /// Sample at `time` and write the result into the target node
    pub fn apply(&self, time: f32, model: &mut Model) {
        let Some(node) = model.nodes.get_mut(self.node) else {
            return;
        };

        match self.property {
            Property::Translation => {
                let mut v = [0.0; 3];
                self.sample(time, &mut v);
                node.translation = Vec3::from_array(v);
            }
            Property::Scale => {
                let mut v = [0.0; 3];
                self.sample(time, &mut v);
                node.scale = Vec3::from_array(v);
            }
            Property::Rotation => {
                let mut v = [0.0, 0.0, 0.0, 1.0];
                self.sample(time, &mut v);
                node.rotation = quat(&v).normalize();
            }
            Property::Weights(count) => {
                node.weights.resize(count, 0.0);
                self.sample(time, &mut node.weights);
            }
        }
    }
}

fn quat(v: &[f32]) -> Quat {
    Quat::from_xyzw(v[0], v[1], v[2], v[3])
}

/// Named, time-parameterised pose sequence bundled with a model
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub channels: Vec<Channel>,
}

impl AnimationClip {
    /// Build a clip whose duration is its longest channel
    pub fn new(name: impl Into<String>, channels: Vec<Channel>) -> Self {
        let duration = channels
            .iter()
            .map(Channel::duration)
            .fold(0.0f32, f32::max);

        Self {
            name: name.into(),
            duration,
            channels,
        }
    }

    /// Pose `model` at clip time `time`
    pub fn apply(&self, time: f32, model: &mut Model) {
        for channel in &self.channels {
            channel.apply(time, model);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Material, Node};

    fn linear(property: Property, times: Vec<f32>, values: Vec<f32>) -> Channel {
        Channel {
            node: 0,
            property,
            interpolation: Interpolation::Linear,
            times,
            values,
        }
    }

    fn single_node_model() -> Model {
        Model {
            name: None,
            nodes: vec![Node::new(None, None)],
            meshes: Vec::new(),
            materials: vec![Material::default()],
            textures: Vec::new(),
        }
    }

    #[test]
    fn linear_translation_interpolates() {
        let channel = linear(
            Property::Translation,
            vec![0.0, 2.0],
            vec![0.0, 0.0, 0.0, 4.0, 2.0, 0.0],
        );

        let mut out = [0.0; 3];
        channel.sample(1.0, &mut out);
        assert_eq!(out, [2.0, 1.0, 0.0]);
    }

    #[test]
    fn sample_clamps_outside_keyframes() {
        let channel = linear(Property::Translation, vec![1.0, 2.0], vec![1.0, 1.0, 1.0, 3.0, 3.0, 3.0]);

        let mut out = [0.0; 3];
        channel.sample(0.0, &mut out);
        assert_eq!(out, [1.0, 1.0, 1.0]);

        channel.sample(5.0, &mut out);
        assert_eq!(out, [3.0, 3.0, 3.0]);
    }

    #[test]
    fn step_holds_previous_value() {
        let mut channel = linear(Property::Scale, vec![0.0, 1.0], vec![1.0, 1.0, 1.0, 2.0, 2.0, 2.0]);
        channel.interpolation = Interpolation::Step;

        let mut out = [0.0; 3];
        channel.sample(0.99, &mut out);
        assert_eq!(out, [1.0, 1.0, 1.0]);

        channel.sample(1.0, &mut out);
        assert_eq!(out, [2.0, 2.0, 2.0]);
    }

    #[test]
    fn rotation_uses_slerp() {
        let quarter_turn = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let mut values = Quat::IDENTITY.to_array().to_vec();
        values.extend_from_slice(&quarter_turn.to_array());
        let channel = linear(Property::Rotation, vec![0.0, 1.0], values);

        let mut model = single_node_model();
        channel.apply(0.5, &mut model);

        let expected = Quat::from_rotation_y(std::f32::consts::FRAC_PI_4);
        assert!(model.nodes[0].rotation.angle_between(expected) < 1e-4);
    }

    #[test]
    fn cubic_spline_hits_keyframe_values() {
        // in-tangent, value, out-tangent per keyframe, scalar weights
        let channel = Channel {
            node: 0,
            property: Property::Weights(1),
            interpolation: Interpolation::CubicSpline,
            times: vec![0.0, 1.0],
            values: vec![0.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        };

        let mut out = [0.0; 1];
        channel.sample(0.0, &mut out);
        assert_eq!(out[0], 0.0);

        channel.sample(0.5, &mut out);
        assert!((out[0] - 0.5).abs() < 1e-6);

        channel.sample(1.0, &mut out);
        assert_eq!(out[0], 1.0);
    }

    #[test]
    fn morph_weights_apply_to_node() {
        let channel = linear(Property::Weights(2), vec![0.0, 1.0], vec![1.0, 0.0, 0.0, 1.0]);

        let mut model = single_node_model();
        channel.apply(0.25, &mut model);
        assert_eq!(model.nodes[0].weights, vec![0.75, 0.25]);
    }

    #[test]
    fn clip_duration_is_longest_channel() {
        let clip = AnimationClip::new(
            "fly",
            vec![
                linear(Property::Translation, vec![0.0, 1.5], vec![0.0; 6]),
                linear(Property::Scale, vec![0.0, 0.5, 3.0], vec![1.0; 9]),
            ],
        );
        assert_eq!(clip.duration, 3.0);
        assert_eq!(clip.name, "fly");
    }

    #[test]
    fn channel_for_missing_node_is_ignored() {
        let mut channel = linear(Property::Translation, vec![0.0], vec![1.0, 1.0, 1.0]);
        channel.node = 7;

        let mut model = single_node_model();
        channel.apply(0.0, &mut model);
        assert_eq!(model.nodes[0].translation, Vec3::ZERO);
    }
}

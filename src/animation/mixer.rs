use std::sync::Arc;

use super::AnimationClip;
use crate::scene::{Model, ModelId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    /// Wrap back to the start when the clip ends
    Repeat,
    /// Stop on the last frame
    Once,
}

/// Playback state of one clip on one mixer
#[derive(Debug, Clone)]
pub struct AnimationAction {
    clip: Arc<AnimationClip>,
    time: f32,
    time_scale: f32,
    loop_mode: LoopMode,
    running: bool,
    paused: bool,
}

impl AnimationAction {
    fn new(clip: Arc<AnimationClip>) -> Self {
        Self {
            clip,
            time: 0.0,
            time_scale: 1.0,
            loop_mode: LoopMode::Repeat,
            running: false,
            paused: false,
        }
    }

    pub fn play(&mut self) -> &mut Self {
        self.running = true;
        self.paused = false;
        self
    }

    /// Stop playback and rewind
    pub fn stop(&mut self) -> &mut Self {
        self.running = false;
        self.paused = false;
        self.time = 0.0;
        self
    }

    pub fn set_paused(&mut self, paused: bool) -> &mut Self {
        self.paused = paused;
        self
    }

    pub fn set_loop(&mut self, loop_mode: LoopMode) -> &mut Self {
        self.loop_mode = loop_mode;
        self
    }

    pub fn set_time_scale(&mut self, time_scale: f32) -> &mut Self {
        self.time_scale = time_scale;
        self
    }

    pub fn clip(&self) -> &Arc<AnimationClip> {
        &self.clip
    }

    /// Local clip time in seconds
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn is_running(&self) -> bool {
        self.running && !self.paused
    }

    fn advance(&mut self, delta: f32) {
        if !self.is_running() {
            return;
        }

        let duration = self.clip.duration;
        let time = self.time + delta * self.time_scale;

        self.time = match self.loop_mode {
            LoopMode::Repeat if duration > 0.0 => time.rem_euclid(duration),
            LoopMode::Repeat => 0.0,
            LoopMode::Once => {
                let clamped = time.clamp(0.0, duration);
                if clamped != time {
                    self.running = false;
                }
                clamped
            }
        };
    }
}

/// Animation driver for one model
///
/// Advanced every frame by the shared clock's delta; each running action
/// samples its clip and writes the pose into the bound model.
#[derive(Debug, Clone)]
pub struct AnimationMixer {
    target: ModelId,
    time: f32,
    actions: Vec<AnimationAction>,
}

impl AnimationMixer {
    pub fn new(target: ModelId) -> Self {
        Self {
            target,
            time: 0.0,
            actions: Vec::new(),
        }
    }

    /// Model this mixer animates
    pub fn target(&self) -> ModelId {
        self.target
    }

    /// Total time this mixer has been advanced by
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Action for `clip`, created on first request
    pub fn clip_action(&mut self, clip: Arc<AnimationClip>) -> &mut AnimationAction {
        let index = match self
            .actions
            .iter()
            .position(|action| Arc::ptr_eq(&action.clip, &clip))
        {
            Some(index) => index,
            None => {
                self.actions.push(AnimationAction::new(clip));
                self.actions.len() - 1
            }
        };
        &mut self.actions[index]
    }

    pub fn actions(&self) -> &[AnimationAction] {
        &self.actions
    }

    /// Advance all actions by `delta` seconds and pose the model
    pub fn update(&mut self, delta: f32, model: &mut Model) {
        self.time += delta;

        for action in &mut self.actions {
            let was_running = action.is_running();
            action.advance(delta);
            if was_running {
                action.clip.apply(action.time, model);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{Channel, Interpolation, Property};
    use crate::scene::{Material, Node};
    use glam::Vec3;

    fn sliding_clip(duration: f32) -> Arc<AnimationClip> {
        Arc::new(AnimationClip::new(
            "slide",
            vec![Channel {
                node: 0,
                property: Property::Translation,
                interpolation: Interpolation::Linear,
                times: vec![0.0, duration],
                values: vec![0.0, 0.0, 0.0, duration, 0.0, 0.0],
            }],
        ))
    }

    fn model() -> Model {
        Model {
            name: None,
            nodes: vec![Node::new(None, None)],
            meshes: Vec::new(),
            materials: vec![Material::default()],
            textures: Vec::new(),
        }
    }

    #[test]
    fn repeat_wraps_clip_time() {
        let mut mixer = AnimationMixer::new(ModelId(0));
        let mut model = model();
        mixer.clip_action(sliding_clip(2.0)).play();

        mixer.update(1.5, &mut model);
        mixer.update(1.0, &mut model);

        assert_eq!(mixer.time(), 2.5);
        assert!((mixer.actions()[0].time() - 0.5).abs() < 1e-6);
        assert!((model.nodes[0].translation.x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn once_clamps_and_stops() {
        let mut mixer = AnimationMixer::new(ModelId(0));
        let mut model = model();
        mixer
            .clip_action(sliding_clip(1.0))
            .set_loop(LoopMode::Once)
            .play();

        mixer.update(3.0, &mut model);

        let action = &mixer.actions()[0];
        assert_eq!(action.time(), 1.0);
        assert!(!action.is_running());
        assert_eq!(model.nodes[0].translation, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn stopped_action_leaves_pose() {
        let mut mixer = AnimationMixer::new(ModelId(0));
        let mut model = model();
        model.nodes[0].translation = Vec3::new(5.0, 5.0, 5.0);
        mixer.clip_action(sliding_clip(2.0));

        mixer.update(1.0, &mut model);

        assert_eq!(mixer.actions()[0].time(), 0.0);
        assert_eq!(model.nodes[0].translation, Vec3::new(5.0, 5.0, 5.0));
    }

    #[test]
    fn paused_action_holds_time() {
        let mut mixer = AnimationMixer::new(ModelId(0));
        let mut model = model();
        mixer.clip_action(sliding_clip(4.0)).play();

        mixer.update(1.0, &mut model);
        mixer.actions[0].set_paused(true);
        mixer.update(1.0, &mut model);

        assert_eq!(mixer.actions()[0].time(), 1.0);
        assert_eq!(mixer.time(), 2.0);
    }

    #[test]
    fn clip_action_is_cached_per_clip() {
        let mut mixer = AnimationMixer::new(ModelId(3));
        let clip = sliding_clip(1.0);

        mixer.clip_action(clip.clone()).play();
        mixer.clip_action(clip.clone()).set_time_scale(2.0);
        mixer.clip_action(sliding_clip(1.0));

        assert_eq!(mixer.actions().len(), 2);
        assert_eq!(mixer.target(), ModelId(3));
        assert!(mixer.actions()[0].is_running());
    }

    #[test]
    fn time_scale_speeds_up_playback() {
        let mut mixer = AnimationMixer::new(ModelId(0));
        let mut model = model();
        mixer.clip_action(sliding_clip(10.0)).set_time_scale(2.0).play();

        mixer.update(1.5, &mut model);
        assert_eq!(mixer.actions()[0].time(), 3.0);
    }

    #[test]
    fn stop_rewinds() {
        let mut mixer = AnimationMixer::new(ModelId(0));
        let mut model = model();
        let clip = sliding_clip(4.0);
        mixer.clip_action(clip.clone()).play();
        mixer.update(1.0, &mut model);

        mixer.clip_action(clip).stop();
        assert_eq!(mixer.actions()[0].time(), 0.0);
        assert!(!mixer.actions()[0].is_running());
    }
}

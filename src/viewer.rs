use anyhow::Result;
use std::collections::HashSet;

use crate::animation::AnimationMixer;
use crate::camera::{OrbitControls, PerspectiveCamera};
use crate::config::SceneConfig;
use crate::core::{Clock, Controller, Throttled, Viewport};
use crate::frame::FrameInfo;
use crate::loaders::{LoadEvent, LoadProgress, ModelLoader, ModelRequest, RequestId};
use crate::scene::{Background, Light, Scene};
use crate::traits::SceneRenderer;

const FPS_LOG_INTERVAL: f32 = 1.0;

/// Application context: scene, camera, controls, renderer, loader and the
/// animation mixers of every loaded model
///
/// All mutation happens on the thread that owns the viewer. Load tasks only
/// produce events, which [`Viewer::step`] applies between frames.
pub struct Viewer<R: SceneRenderer> {
    scene: Scene,
    camera: PerspectiveCamera,
    controls: OrbitControls,
    renderer: R,
    loader: ModelLoader,
    mixers: Vec<AnimationMixer>,
    settled: HashSet<RequestId>,
    clock: Clock,
    viewport: Viewport,
    frame: FrameInfo,
    fps_timer: Throttled,
    frames_since_log: u32,
}

impl<R: SceneRenderer> Viewer<R> {
    /// Build the scene, camera, controls and lights, request every configured
    /// model, then create the renderer
    pub fn bootstrap(
        config: &SceneConfig,
        viewport: Viewport,
        loader_threads: usize,
        make_renderer: impl FnOnce(Viewport) -> Result<R>,
    ) -> Result<Self> {
        let mut scene = Scene::new(Background::from_config(&config.background));

        let camera = PerspectiveCamera::from_config(&config.camera, viewport);
        let controls = OrbitControls::new(&camera);

        for light in Light::from_config(&config.lights) {
            scene.add_light(light);
        }

        let mut loader = ModelLoader::new(loader_threads)?;
        for model in &config.models {
            loader.load(ModelRequest {
                path: model.path.clone(),
                position: model.position(),
            });
        }

        let renderer = make_renderer(viewport)?;

        Ok(Self {
            scene,
            camera,
            controls,
            renderer,
            loader,
            mixers: Vec::new(),
            settled: HashSet::new(),
            clock: Clock::new(),
            viewport,
            frame: FrameInfo::default(),
            fps_timer: Throttled::new(FPS_LOG_INTERVAL),
            frames_since_log: 0,
        })
    }

    /// Apply one event from a load task
    pub fn apply_load_event(&mut self, event: LoadEvent) {
        let request = event.request();
        if self.settled.contains(&request) {
            log::warn!("Ignoring event for already settled load {:?}", request);
            return;
        }

        match event {
            LoadEvent::Progress { progress, .. } => {
                if let Some(line) = progress_line(self.loader.request(request), progress) {
                    log::info!("{}", line);
                }
            }
            LoadEvent::Failed { error, .. } => {
                self.settled.insert(request);
                log::error!("{:#}", error);
            }
            LoadEvent::Loaded { asset, .. } => {
                self.settled.insert(request);

                let mut asset = *asset;
                if let Some(placement) = self.loader.request(request) {
                    asset.model.set_position(placement.position);
                }
                let clip = asset.first_clip();
                let name = asset.model.name.clone();

                let id = self.scene.add_model(asset.model);
                let mut mixer = AnimationMixer::new(id);
                if let Some(clip) = clip {
                    mixer.clip_action(clip).play();
                }
                self.mixers.push(mixer);

                log::info!("Model {:?} added to scene as {:?}", name.unwrap_or_default(), id);
            }
        }
    }

    /// Read the shared clock and run one frame
    pub fn frame(&mut self, input: &dyn Controller) -> FrameInfo {
        let delta = self.clock.delta();
        self.step(delta, input)
    }

    /// Run one frame with an explicit delta in seconds: apply finished loads,
    /// advance every mixer, move the camera and render
    pub fn step(&mut self, delta: f32, input: &dyn Controller) -> FrameInfo {
        for event in self.loader.poll() {
            self.apply_load_event(event);
        }

        for mixer in &mut self.mixers {
            if let Some(model) = self.scene.model_mut(mixer.target()) {
                mixer.update(delta, model);
            }
        }

        self.controls.handle_input(input, &self.camera, self.viewport);
        self.controls.update(&mut self.camera);

        if let Err(e) = self.renderer.render(&self.scene, &self.camera) {
            log::error!("Render failed: {:#}", e);
        }

        self.frame = self.frame.next(delta);
        self.frames_since_log += 1;
        if let Some(elapsed) = self.fps_timer.try_tick(delta) {
            log::debug!(
                "{:.1} fps, {} models",
                self.frames_since_log as f32 / elapsed,
                self.scene.model_count()
            );
            self.frames_since_log = 0;
        }

        self.frame
    }

    /// Match the camera and renderer to a new container size
    pub fn resize(&mut self, viewport: Viewport) {
        if viewport.is_empty() {
            return;
        }

        self.viewport = viewport;
        self.camera.aspect = viewport.aspect();
        self.camera.update_projection_matrix();
        self.renderer.resize(viewport);
    }

    /// Block until every requested model has loaded or failed
    pub fn settle_loads(&mut self) {
        while let Some(event) = self.loader.wait_next() {
            self.apply_load_event(event);
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn mixers(&self) -> &[AnimationMixer] {
        &self.mixers
    }

    /// Mutable access so callers can pause, stop or rescale actions
    pub fn mixers_mut(&mut self) -> &mut [AnimationMixer] {
        &mut self.mixers
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Frames run so far
    pub fn frame_count(&self) -> u64 {
        self.frame.number
    }

    /// Loads still in flight
    pub fn pending_loads(&self) -> usize {
        self.loader.pending()
    }
}

/// Progress log line naming the model; `None` when the total size is unknown
fn progress_line(request: Option<&ModelRequest>, progress: LoadProgress) -> Option<String> {
    let percent = progress.percent()?;
    Some(match request {
        Some(request) => format!("{:?}: {:.0}% loaded", request.path, percent),
        None => format!("{:.0}% loaded", percent),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use std::path::PathBuf;

    #[test]
    fn progress_line_names_the_model() {
        let request = ModelRequest {
            path: PathBuf::from("models/Flamingo.glb"),
            position: Vec3::ZERO,
        };
        let progress = LoadProgress {
            loaded: 50,
            total: Some(200),
        };

        let line = progress_line(Some(&request), progress).unwrap();
        assert!(line.contains("Flamingo.glb"));
        assert!(line.ends_with("25% loaded"));
    }

    #[test]
    fn progress_line_skips_unknown_totals() {
        let progress = LoadProgress {
            loaded: 50,
            total: None,
        };
        assert_eq!(progress_line(None, progress), None);
    }
}

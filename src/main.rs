use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use aviary::cli::Cli;
use aviary::config::SceneConfig;
use aviary::core::{ShutdownToken, Viewport, WinitController};
use aviary::render::WgpuRenderer;
use aviary::viewer::Viewer;

// === Application ===

struct App {
    config: SceneConfig,
    loader_threads: usize,
    max_frames: Option<u64>,
    window: Option<Arc<Window>>,
    viewer: Option<Viewer<WgpuRenderer>>,
    input: WinitController,
    shutdown: ShutdownToken,
    init_error: Option<anyhow::Error>,
}

impl App {
    fn new(config: SceneConfig, cli: &Cli) -> Self {
        Self {
            config,
            loader_threads: cli.loader_threads,
            max_frames: cli.frames,
            window: None,
            viewer: None,
            input: WinitController::new(),
            shutdown: ShutdownToken::new(),
            init_error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window = event_loop
            .create_window(
                Window::default_attributes()
                    .with_title(self.config.window.title.clone())
                    .with_inner_size(winit::dpi::LogicalSize::new(
                        self.config.window.width,
                        self.config.window.height,
                    )),
            )
            .context("Failed to create window")?;
        let window = Arc::new(window);

        let antialias = self.config.renderer.antialias;
        let surface_window = window.clone();
        let viewer = Viewer::bootstrap(
            &self.config,
            Viewport::from(window.inner_size()),
            self.loader_threads,
            |viewport| pollster::block_on(WgpuRenderer::new(surface_window, viewport, antialias)),
        )
        .context("Failed to initialize viewer")?;

        self.window = Some(window);
        self.viewer = Some(viewer);
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.init(event_loop) {
                self.init_error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        self.input.process_event(&event);

        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => {
                self.shutdown.cancel();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(viewer) = &mut self.viewer {
                    viewer.resize(Viewport::from(size));
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(viewer) = &mut self.viewer {
                    let frame = viewer.frame(&self.input);
                    self.input.reset_deltas();

                    if self.max_frames.is_some_and(|max| frame.number >= max) {
                        log::info!("Rendered {} frames, exiting", frame.number);
                        self.shutdown.cancel();
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.shutdown.is_cancelled() {
            event_loop.exit();
        } else if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => SceneConfig::from_file(path)?,
        None => SceneConfig::default(),
    };

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config, &cli);

    log::info!("Aviary - drag to orbit, right-drag to pan, scroll to zoom, Escape to quit");
    event_loop.run_app(&mut app)?;

    match app.init_error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

use anyhow::{anyhow, Context, Result};
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::executor::{block_on, ThreadPool};
use futures::{FutureExt, StreamExt};
use glam::Vec3;
use std::any::Any;
use std::fs::File;
use std::io::Read;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};

use super::gltf::{parse_model, LoadedAsset};

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Handle identifying one load request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub usize);

/// A model to load and where to put it
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub path: PathBuf,
    pub position: Vec3,
}

/// Bytes received so far for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    pub loaded: u64,
    /// `None` when the asset size can't be determined up front
    pub total: Option<u64>,
}

impl LoadProgress {
    /// Completion in percent, only when the total size is known
    pub fn percent(&self) -> Option<f64> {
        match self.total {
            Some(total) if total > 0 => Some(self.loaded as f64 / total as f64 * 100.0),
            _ => None,
        }
    }
}

/// Notifications sent from load tasks to the render thread
#[derive(Debug)]
pub enum LoadEvent {
    Progress {
        request: RequestId,
        progress: LoadProgress,
    },
    Loaded {
        request: RequestId,
        asset: Box<LoadedAsset>,
    },
    Failed {
        request: RequestId,
        error: anyhow::Error,
    },
}

impl LoadEvent {
    pub fn request(&self) -> RequestId {
        match self {
            LoadEvent::Progress { request, .. }
            | LoadEvent::Loaded { request, .. }
            | LoadEvent::Failed { request, .. } => *request,
        }
    }

    /// Whether this event settles its request
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LoadEvent::Progress { .. })
    }
}

/// Runs model loads on a worker pool and hands completions back as events
///
/// Tasks never touch the scene; the owner drains events with
/// [`ModelLoader::poll`] and applies them on its own thread.
pub struct ModelLoader {
    pool: ThreadPool,
    sender: UnboundedSender<LoadEvent>,
    receiver: UnboundedReceiver<LoadEvent>,
    requests: Vec<ModelRequest>,
    pending: usize,
}

impl ModelLoader {
    pub fn new(threads: usize) -> Result<Self> {
        let pool = ThreadPool::builder()
            .pool_size(threads.max(1))
            .name_prefix("model-loader-")
            .create()
            .context("Failed to start model loader threads")?;
        let (sender, receiver) = unbounded();

        Ok(Self {
            pool,
            sender,
            receiver,
            requests: Vec::new(),
            pending: 0,
        })
    }

    /// Start loading a model; returns immediately
    pub fn load(&mut self, request: ModelRequest) -> RequestId {
        let path = request.path.clone();
        log::info!("Requesting model {:?}", path);

        self.spawn_job(request, move |on_progress| {
            let bytes = read_asset(&path, on_progress)?;
            parse_model(&bytes, path.parent())
        })
    }

    /// Run `job` on the pool for `request`. Every job ends in exactly one
    /// terminal event, a panic included.
    fn spawn_job<F>(&mut self, request: ModelRequest, job: F) -> RequestId
    where
        F: FnOnce(&mut dyn FnMut(LoadProgress)) -> Result<LoadedAsset> + Send + 'static,
    {
        let id = RequestId(self.requests.len());
        let path = request.path.clone();
        let sender = self.sender.clone();

        self.requests.push(request);
        self.pending += 1;

        self.pool.spawn_ok(async move {
            let progress_sender = sender.clone();
            let mut on_progress = move |progress: LoadProgress| {
                // Receiver gone means the viewer shut down; nothing to report to
                let _ = progress_sender.unbounded_send(LoadEvent::Progress {
                    request: id,
                    progress,
                });
            };

            let result = AssertUnwindSafe(async move { job(&mut on_progress) })
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(anyhow!("Load task panicked: {}", panic_message(panic.as_ref())))
                })
                .with_context(|| format!("Failed to load model {:?}", path));

            let event = match result {
                Ok(asset) => LoadEvent::Loaded {
                    request: id,
                    asset: Box::new(asset),
                },
                Err(error) => LoadEvent::Failed { request: id, error },
            };
            let _ = sender.unbounded_send(event);
        });

        id
    }

    pub fn request(&self, id: RequestId) -> Option<&ModelRequest> {
        self.requests.get(id.0)
    }

    /// Requests that have not completed or failed yet
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Drain every event that has arrived, without blocking
    pub fn poll(&mut self) -> Vec<LoadEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            self.track(&event);
            events.push(event);
        }
        events
    }

    /// Block until the next event arrives; `None` when nothing is pending
    pub fn wait_next(&mut self) -> Option<LoadEvent> {
        if self.pending == 0 {
            return None;
        }
        let event = block_on(self.receiver.next())?;
        self.track(&event);
        Some(event)
    }

    fn track(&mut self, event: &LoadEvent) {
        if event.is_terminal() {
            self.pending = self.pending.saturating_sub(1);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

/// Reads a file in chunks, reporting progress after each one
fn read_asset(path: &Path, mut on_progress: impl FnMut(LoadProgress)) -> Result<Vec<u8>> {
    let mut file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let total = file.metadata().ok().map(|meta| meta.len());

    let mut bytes = Vec::with_capacity(total.unwrap_or(0) as usize);
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];
    loop {
        let read = file
            .read(&mut chunk)
            .with_context(|| format!("Failed to read {:?}", path))?;
        if read == 0 {
            break;
        }
        bytes.extend_from_slice(&chunk[..read]);
        on_progress(LoadProgress {
            loaded: bytes.len() as u64,
            total,
        });
    }

    Ok(bytes)
}

//! Async front end for [`FovEngine`].
//!
//! Each input stream gets its own bounded channel so a chatty sensor can't
//! reorder another stream's samples. A single task owns the engine, drains
//! whichever channel is ready and publishes whole snapshots through `watch`
//! channels; readers never see a half-applied update.

use fov_geo::GeoPoint;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::camera::{CameraState, CameraUpdate};
use crate::config::EngineConfig;
use crate::engine::{EngineOutput, FovEngine};
use crate::error::EngineStopped;
use crate::fusion::LocationState;
use crate::places::{HighlightSet, Place};

const CHANNEL_DEPTH: usize = 64;

#[derive(Debug, Clone)]
pub enum Control {
    Places(Vec<Place>),
    MapLoaded,
    /// Explicit camera move; `None` keeps the current target.
    MoveCamera { target: Option<GeoPoint>, bearing: f64, zoom: f64 },
    UserInteracting(bool),
    ToggleOverlay,
}

/// Cloneable write side. Every method fails with [`EngineStopped`] once the
/// engine task has exited.
#[derive(Debug, Clone)]
pub struct EngineInputs {
    position: mpsc::Sender<Option<GeoPoint>>,
    heading: mpsc::Sender<Option<f64>>,
    secondary: mpsc::Sender<Option<GeoPoint>>,
    control: mpsc::Sender<Control>,
}

impl EngineInputs {
    pub async fn position(&self, sample: Option<GeoPoint>) -> Result<(), EngineStopped> {
        self.position.send(sample).await.map_err(|_| EngineStopped)
    }

    pub async fn heading(&self, sample: Option<f64>) -> Result<(), EngineStopped> {
        self.heading.send(sample).await.map_err(|_| EngineStopped)
    }

    pub async fn secondary(&self, sample: Option<GeoPoint>) -> Result<(), EngineStopped> {
        self.secondary.send(sample).await.map_err(|_| EngineStopped)
    }

    pub async fn control(&self, cmd: Control) -> Result<(), EngineStopped> {
        self.control.send(cmd).await.map_err(|_| EngineStopped)
    }
}

struct Publishers {
    location: watch::Sender<LocationState>,
    highlights: watch::Sender<HighlightSet>,
    camera: watch::Sender<CameraState>,
    camera_update: watch::Sender<Option<CameraUpdate>>,
}

impl Publishers {
    fn publish(&self, out: EngineOutput) {
        if let Some(location) = out.location {
            self.location.send_replace(location);
        }
        if let Some(highlights) = out.highlights {
            self.highlights.send_replace(highlights);
        }
        if let Some(camera) = out.camera {
            self.camera.send_if_modified(|current| {
                if *current == camera {
                    return false;
                }
                *current = camera;
                true
            });
        }
        if let Some(update) = out.camera_update {
            self.camera_update.send_replace(Some(update));
        }
    }
}

pub struct EngineHandle {
    inputs: EngineInputs,
    location: watch::Receiver<LocationState>,
    highlights: watch::Receiver<HighlightSet>,
    camera: watch::Receiver<CameraState>,
    camera_update: watch::Receiver<Option<CameraUpdate>>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

/// Starts the engine task on the current tokio runtime.
pub fn spawn(cfg: &EngineConfig) -> EngineHandle {
    let engine = FovEngine::new(cfg);

    let (position_tx, position_rx) = mpsc::channel(CHANNEL_DEPTH);
    let (heading_tx, heading_rx) = mpsc::channel(CHANNEL_DEPTH);
    let (secondary_tx, secondary_rx) = mpsc::channel(CHANNEL_DEPTH);
    let (control_tx, control_rx) = mpsc::channel(CHANNEL_DEPTH);

    let (location_tx, location_rx) = watch::channel(engine.location().clone());
    let (highlights_tx, highlights_rx) = watch::channel(HighlightSet::new());
    let (camera_tx, camera_rx) = watch::channel(engine.camera().clone());
    let (camera_update_tx, camera_update_rx) = watch::channel(None);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let publishers = Publishers {
        location: location_tx,
        highlights: highlights_tx,
        camera: camera_tx,
        camera_update: camera_update_tx,
    };
    let rx = Receivers {
        position: position_rx,
        heading: heading_rx,
        secondary: secondary_rx,
        control: control_rx,
    };
    let task = tokio::spawn(run(engine, rx, publishers, shutdown_rx));
    info!("fov engine task started");

    EngineHandle {
        inputs: EngineInputs {
            position: position_tx,
            heading: heading_tx,
            secondary: secondary_tx,
            control: control_tx,
        },
        location: location_rx,
        highlights: highlights_rx,
        camera: camera_rx,
        camera_update: camera_update_rx,
        shutdown: shutdown_tx,
        task: Some(task),
    }
}

impl EngineHandle {
    pub fn inputs(&self) -> EngineInputs {
        self.inputs.clone()
    }

    pub fn location(&self) -> watch::Receiver<LocationState> {
        self.location.clone()
    }

    pub fn highlights(&self) -> watch::Receiver<HighlightSet> {
        self.highlights.clone()
    }

    pub fn camera(&self) -> watch::Receiver<CameraState> {
        self.camera.clone()
    }

    pub fn camera_updates(&self) -> watch::Receiver<Option<CameraUpdate>> {
        self.camera_update.clone()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stops the engine and waits for its task. Nothing is published once
    /// this returns. Calling it again is a no-op.
    pub async fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            debug!("fov engine already stopped");
            return;
        };
        let _ = self.shutdown.send(true);
        if let Err(e) = task.await {
            warn!("fov engine task ended abnormally: {}", e);
        }
    }

    /// Closes this handle's inputs and waits until every queued sample has
    /// been applied and published. Completes once all other [`EngineInputs`]
    /// clones are dropped too.
    pub async fn drain(self) {
        let EngineHandle { inputs, shutdown, task, .. } = self;
        drop(inputs);
        // a closed shutdown channel leaves the task running on its inputs alone
        drop(shutdown);
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("fov engine task ended abnormally: {}", e);
            }
        }
    }
}

struct Receivers {
    position: mpsc::Receiver<Option<GeoPoint>>,
    heading: mpsc::Receiver<Option<f64>>,
    secondary: mpsc::Receiver<Option<GeoPoint>>,
    control: mpsc::Receiver<Control>,
}

async fn run(
    mut engine: FovEngine,
    mut rx: Receivers,
    publishers: Publishers,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            break;
        }
        let out = tokio::select! {
            // disabled once the handle is gone; the inputs then decide
            Ok(()) = shutdown.changed() => break,
            Some(sample) = rx.position.recv() => engine.on_position(sample),
            Some(sample) = rx.heading.recv() => engine.on_heading(sample),
            Some(sample) = rx.secondary.recv() => engine.on_secondary(sample),
            Some(cmd) = rx.control.recv() => apply(&mut engine, cmd),
            else => {
                debug!("all fov engine inputs closed");
                break;
            }
        };
        if !out.is_empty() {
            publishers.publish(out);
        }
    }
    engine.stop();
}

fn apply(engine: &mut FovEngine, cmd: Control) -> EngineOutput {
    match cmd {
        Control::Places(places) => engine.set_places(places),
        Control::MapLoaded => engine.on_map_loaded(),
        Control::MoveCamera { target, bearing, zoom } => {
            engine.update_camera(target, bearing, zoom)
        }
        Control::UserInteracting(b) => engine.set_user_interacting(b),
        Control::ToggleOverlay => engine.toggle_overlay(),
    }
}

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use fov_engine::source::SensorEvent;
use fov_engine::{
    doctor, CameraUpdate, Control, EngineInputs, FovEngine, HighlightSet, LocationState,
};
use fov_geo::{compute_fov_sector_points, normalize_heading, GeoPoint};
use fov_proto::event::{EventKind, FovEvent};

use crate::config::{load_config, load_places, Config, SourceCfg};

#[derive(Debug, Parser)]
#[command(name = "fovscout", version, about = "FOVscout - location and field-of-view fusion")]
struct Cli {
    #[arg(long)]
    config: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Doctor,
    /// Fuse the configured sources and print events as JSON lines.
    Run,
    /// Print the FOV wedge polygon for one observer pose.
    Sector {
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lon: f64,
        heading: f64,
    },
    /// Print the configured places that fall inside the wedge.
    Classify {
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lon: f64,
        heading: f64,
    },
}

#[derive(Debug, Clone, Copy)]
enum Feed {
    Primary,
    Heading,
    Secondary,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.cmd {
        Command::Doctor => doctor_cmd(&cfg)?,
        Command::Run => run(&cfg).await?,
        Command::Sector { lat, lon, heading } => {
            sector(&cfg, GeoPoint::new(lat, lon), heading)?
        }
        Command::Classify { lat, lon, heading } => {
            classify(&cfg, GeoPoint::new(lat, lon), heading)?
        }
    }
    Ok(())
}

fn doctor_cmd(cfg: &Config) -> Result<()> {
    info!("doctor: starting");
    doctor::check_engine(&cfg.engine)?;
    cfg.source.check("source")?;
    if let Some(h) = &cfg.heading {
        h.check("heading")?;
    }
    if let Some(s) = &cfg.secondary {
        s.check("secondary")?;
    }
    let places = load_places(cfg)?;
    doctor::check_places(&places)?;
    info!("doctor: OK ({} places)", places.len());
    Ok(())
}

fn sector(cfg: &Config, center: GeoPoint, heading: f64) -> Result<()> {
    anyhow::ensure!(center.is_valid(), "invalid coordinates {}, {}", center.lat, center.lon);
    let points = compute_fov_sector_points(
        center,
        heading,
        cfg.engine.fov_angle(),
        cfg.engine.fov_radius(),
        cfg.engine.arc_segments,
    );
    println!("{}", serde_json::to_string(&points)?);
    Ok(())
}

fn classify(cfg: &Config, center: GeoPoint, heading: f64) -> Result<()> {
    let mut engine = FovEngine::new(&cfg.engine);
    engine.set_places(load_places(cfg)?);
    engine.on_position(Some(center));
    engine.on_heading(Some(normalize_heading(heading)));
    anyhow::ensure!(
        engine.location().primary_location.is_some(),
        "invalid coordinates {}, {}",
        center.lat,
        center.lon
    );

    let nearby = engine.places().near(center, engine.location().fov_radius);
    let mut in_view = 0;
    for place in nearby.iter().filter(|p| p.is_in_fov) {
        println!("{}", serde_json::to_string(place)?);
        in_view += 1;
    }
    info!("classify: {} of {} nearby places in view", in_view, nearby.len());
    Ok(())
}

async fn run(cfg: &Config) -> Result<()> {
    doctor::check_engine(&cfg.engine)?;
    let places = load_places(cfg)?;
    if let Err(e) = doctor::check_places(&places) {
        warn!("places: {:#}", e);
    }

    let mut handle = fov_engine::spawn(&cfg.engine);
    let inputs = handle.inputs();
    inputs.control(Control::Places(places)).await?;
    // no map to wait for; frame the camera as soon as a fix arrives
    inputs.control(Control::MapLoaded).await?;

    let printer = tokio::spawn(forward_events(
        handle.location(),
        handle.highlights(),
        handle.camera_updates(),
        print_event,
    ));

    let mut primary = tokio::spawn(pump(&cfg.source, inputs.clone(), Feed::Primary)?);
    let mut others = Vec::new();
    if let Some(h) = &cfg.heading {
        others.push(tokio::spawn(pump(h, inputs.clone(), Feed::Heading)?));
    }
    if let Some(s) = &cfg.secondary {
        others.push(tokio::spawn(pump(s, inputs.clone(), Feed::Secondary)?));
    }
    drop(inputs);

    tokio::select! {
        res = &mut primary => {
            match res {
                Ok(Ok(())) => info!("primary source finished"),
                Ok(Err(e)) => warn!("primary source failed: {:#}", e),
                Err(e) => warn!("primary source task: {}", e),
            }
            abort_all(others).await;
            handle.drain().await;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
            primary.abort();
            abort_all(others).await;
            handle.stop().await;
        }
    }

    printer.await.context("event printer")?;
    Ok(())
}

async fn abort_all(tasks: Vec<JoinHandle<Result<()>>>) {
    for t in tasks {
        t.abort();
        let _ = t.await;
    }
}

/// Opens `cfg` and returns the task body feeding its events into the engine.
fn pump(
    cfg: &SourceCfg,
    inputs: EngineInputs,
    feed: Feed,
) -> Result<impl std::future::Future<Output = Result<()>>> {
    let mut source = cfg.open()?;
    let pace = cfg.pace();
    Ok(async move {
        while let Some(ev) = source.next_event().await? {
            match (feed, ev) {
                (Feed::Primary, SensorEvent::Position(p)) => inputs.position(p).await?,
                (Feed::Primary | Feed::Heading, SensorEvent::Heading(h)) => {
                    inputs.heading(h).await?
                }
                (Feed::Secondary, SensorEvent::Position(p)) => inputs.secondary(p).await?,
                // heading devices don't move the observer, reference tracks don't turn it
                (Feed::Heading, SensorEvent::Position(_))
                | (Feed::Secondary, SensorEvent::Heading(_)) => continue,
            }
            if let Some(pace) = pace {
                tokio::time::sleep(pace).await;
            }
        }
        Ok(())
    })
}

fn print_event(ev: FovEvent) {
    match serde_json::to_string(&ev) {
        Ok(line) => println!("{}", line),
        Err(e) => warn!("encode event: {}", e),
    }
}

/// Turns snapshot changes into events until every publisher is gone. A
/// closed channel still yields its last unseen snapshot.
async fn forward_events(
    mut location: watch::Receiver<LocationState>,
    mut highlights: watch::Receiver<HighlightSet>,
    mut camera: watch::Receiver<Option<CameraUpdate>>,
    mut emit: impl FnMut(FovEvent),
) {
    let (mut location_open, mut highlights_open, mut camera_open) = (true, true, true);
    while location_open || highlights_open || camera_open {
        let ev = tokio::select! {
            res = location.changed(), if location_open => {
                if res.is_err() {
                    location_open = false;
                    continue;
                }
                let state = location.borrow_and_update().clone();
                location_event(&state)
            }
            res = highlights.changed(), if highlights_open => {
                if res.is_err() {
                    highlights_open = false;
                    continue;
                }
                let ids: Vec<String> = highlights.borrow_and_update().iter().cloned().collect();
                let mut ev = FovEvent::new(EventKind::Highlight, location.borrow().revision);
                ev.highlighted = Some(ids);
                ev
            }
            res = camera.changed(), if camera_open => {
                if res.is_err() {
                    camera_open = false;
                    continue;
                }
                let latest = *camera.borrow_and_update();
                let Some(update) = latest else { continue; };
                camera_event(&update, location.borrow().revision)
            }
        };
        emit(ev);
    }
}

fn location_event(state: &LocationState) -> FovEvent {
    let kind = match state.primary_location {
        Some(_) => EventKind::Location,
        None => EventKind::SignalLost,
    };
    let mut ev = FovEvent::new(kind, state.revision);
    ev.location = state.primary_location;
    ev.secondary = state.secondary_location;
    ev.heading = Some(state.heading);
    ev.boundary = state.fov_boundary.clone();
    ev
}

fn camera_event(update: &CameraUpdate, revision: u64) -> FovEvent {
    let mut ev = FovEvent::new(EventKind::Camera, revision);
    ev.location = update.target;
    ev.bearing = Some(update.bearing);
    ev.zoom = Some(update.zoom);
    ev
}

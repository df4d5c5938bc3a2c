//! # Voxel Streamer
//!
//! Streams a procedurally generated voxel world around a moving observer.
//!
//! Chunks (16x16x16 cubes of block ids) are admitted when they come within a
//! generation radius of the observer, filled from layered noise terrain on
//! worker threads, reduced to the blocks that can actually be seen, and
//! handed to a render sink. When the observer moves far enough away the
//! chunk's render handles are released and the chunk is dropped.
//!
//! ## Key Modules
//!
//! * `config` - world and streaming settings, loaded from JSON
//! * `core` - shared-state primitives
//! * `engine_state` - the pipeline itself: chunk store, streamer, stages, workers
//! * `error` - error types surfaced by configuration and the render sink
//!
//! ## Usage
//!
//! ```no_run
//! fn main() {
//!     voxel_streamer::run();
//! }
//! ```
//!
//! Embedding the pipeline directly:
//!
//! ```
//! use cgmath::Point3;
//! use voxel_streamer::{EngineState, InstanceSink, TrackedObserver, WorldConfig};
//!
//! let config = WorldConfig::from_json_str(
//!     r#"{ "worker_count": 0, "streaming": { "generation_radius": 16.0, "degeneration_radius": 40.0 } }"#,
//! )?;
//!
//! let observer = TrackedObserver::at(Point3::new(0.0, 0.0, 0.0));
//! let mut engine = EngineState::new(config, Box::new(observer.clone()), InstanceSink::new())?;
//! engine.tick();
//!
//! observer.set(Point3::new(200.0, 0.0, 0.0));
//! engine.tick();
//! assert!(engine.store().iter().all(|r| r.coordinate().origin().x > 100));
//! # Ok::<(), voxel_streamer::ConfigError>(())
//! ```

use cgmath::Point3;
use log::info;

pub mod config;
pub mod core;
pub mod engine_state;
pub mod error;

pub use config::{StreamingConfig, WorldConfig};
pub use engine_state::{
    observer::{ObserverSource, TrackedObserver},
    rendering::{InstanceSink, RenderHandle, RenderSink, VisibleBlock},
    voxels::chunk::{ChunkCoordinate, ChunkLifecycle, CHUNK_SIZE},
    EngineState, TickReport,
};
pub use error::{ConfigError, LifecycleError, SinkError, SpawnError};

/// Ticks the headless driver runs when no count is given.
const DEFAULT_TICKS: usize = 600;
/// Largest step the demo observer takes per tick, in blocks.
const WALK_STEP: f32 = 3.0;

/// Headless driver.
///
/// Usage: `voxel-streamer [config.json] [ticks]`. An observer random-walks
/// across the terrain while the engine streams chunks around it into an
/// in-memory [`InstanceSink`].
pub fn run() {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized");

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => match WorldConfig::load(&path) {
            Ok(config) => config,
            Err(err) => {
                log::error!("{}", err);
                return;
            }
        },
        None => WorldConfig::default(),
    };
    let ticks = match args.next().map(|t| t.parse::<usize>()) {
        Some(Ok(ticks)) => ticks,
        Some(Err(err)) => {
            log::error!("Invalid tick count: {}", err);
            return;
        }
        None => DEFAULT_TICKS,
    };

    let mut rng = fastrand::Rng::with_seed(u64::from(config.seed));
    let mut position = Point3::new(0.0f32, 24.0, 0.0);
    let observer = TrackedObserver::at(position);
    let mut engine = match EngineState::new(config, Box::new(observer.clone()), InstanceSink::new()) {
        Ok(engine) => engine,
        Err(err) => {
            log::error!("{}", err);
            return;
        }
    };

    let started = web_time::Instant::now();
    for tick in 0..ticks {
        let report = engine.tick();
        if let Some(reconcile) = &report.reconcile {
            if !reconcile.created.is_empty() || !reconcile.evicted.is_empty() {
                info!(
                    "Tick {}: observer at ({:.1}, {:.1}, {:.1}), {} admitted, {} evicted, {} live chunks, {} instances",
                    tick,
                    position.x,
                    position.y,
                    position.z,
                    reconcile.created.len(),
                    reconcile.evicted.len(),
                    engine.store().len(),
                    engine.sink().instance_count()
                );
            }
        }

        position.x += (rng.f32() * 2.0 - 1.0) * WALK_STEP;
        position.z += (rng.f32() * 2.0 - 1.0) * WALK_STEP;
        observer.set(position);

        std::thread::sleep(std::time::Duration::from_millis(16));
    }

    info!(
        "Finished {} ticks in {:?}: {} live chunks ({} spawned), {} instances",
        ticks,
        started.elapsed(),
        engine.store().len(),
        engine.store().count_in(ChunkLifecycle::Spawned),
        engine.sink().instance_count()
    );
}

//! # Engine State Module
//!
//! The driver that ties the streaming pipeline together.
//!
//! ## Key Components
//!
//! * `EngineState` - owns every piece of pipeline state and runs it one tick at a time
//! * `observer` - the position source streaming follows
//! * `voxels` - chunk data, the chunk store, terrain, generation and streaming
//! * `rendering` - the render sink boundary and the meshing stage
//! * `task_management` - worker threads for generation and meshing
//! * `command_buffer` - deferred chunk changes, applied once per flush
//!
//! ## Architecture
//!
//! `EngineState` is the only writer of the chunk store. Workers receive a
//! stamped chunk handle plus shared read-only inputs, and their results come
//! back as commands that the engine applies at a single sync point. A tick:
//!
//! ```text
//! streamer.drive ──▶ publish generation tasks for admitted chunks
//!        │
//!        ▼
//! ┌─▶ pump tasks ──▶ flush commands ──▶ publish meshing tasks for generated chunks
//! └──────────────── while results keep arriving ◀──────────┘
//! ```
//!
//! With an inline task manager (zero workers) one tick carries every admitted
//! chunk all the way to `Spawned`.

use std::sync::Arc;

use web_time::{Duration, Instant};

use command_buffer::CommandBuffer;
use observer::ObserverSource;
use rendering::{tasks::chunk_mesh_generation_task::ChunkMeshGenerationTask, RenderSink};
use task_management::TaskManager;
use voxels::{
    chunk::{ChunkCoordinate, ChunkHandle},
    store::ChunkStore,
    streamer::{ChunkStreamer, ReconcileReport},
    tasks::chunk_generation_task::ChunkGenerationTask,
    terrain::TerrainGenerator,
};

use crate::{config::WorldConfig, error::ConfigError};

pub mod command_buffer;
pub mod observer;
pub mod rendering;
pub mod task_management;
pub mod voxels;

/// What one call to [`EngineState::tick`] did.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Present when the observer moved and a reconciliation pass ran.
    pub reconcile: Option<ReconcileReport>,
    /// Task results turned into commands.
    pub tasks_handled: usize,
    /// Chunks that reached `Generated`.
    pub generated: usize,
    /// Chunks that reached `Spawned`.
    pub spawned: usize,
    /// Commands dropped because their chunk was evicted meanwhile.
    pub stale: usize,
    /// Spawns refused by the sink; retried on the next reconciliation pass.
    pub failed: usize,
    pub elapsed: Duration,
}

/// The main state container for the streaming pipeline.
///
/// # Examples
///
/// ```
/// use cgmath::Point3;
/// use voxel_streamer::{
///     config::WorldConfig,
///     engine_state::{observer::TrackedObserver, rendering::InstanceSink, EngineState},
/// };
///
/// let mut config = WorldConfig::default();
/// config.worker_count = 0;
/// config.streaming.generation_radius = 16.0;
/// config.streaming.degeneration_radius = 32.0;
///
/// let observer = TrackedObserver::at(Point3::new(0.0, 0.0, 0.0));
/// let mut engine = EngineState::new(config, Box::new(observer), InstanceSink::new())?;
///
/// let report = engine.tick();
/// assert_eq!(report.spawned, 7);
/// assert!(engine.is_idle());
/// # Ok::<(), voxel_streamer::ConfigError>(())
/// ```
pub struct EngineState<S: RenderSink> {
    config: WorldConfig,
    store: ChunkStore,
    streamer: ChunkStreamer,
    task_manager: TaskManager,
    commands: CommandBuffer,
    terrain: Arc<TerrainGenerator>,
    sink: S,
}

impl<S: RenderSink> EngineState<S> {
    /// Fails if `config` does not pass [`WorldConfig::validate`].
    pub fn new(config: WorldConfig, observer: Box<dyn ObserverSource>, sink: S) -> Result<Self, ConfigError> {
        config.validate()?;
        log::info!(
            "Creating engine: seed {}, {} workers, generation radius {}, degeneration radius {}",
            config.seed,
            config.worker_count,
            config.streaming.generation_radius,
            config.streaming.degeneration_radius
        );

        Ok(EngineState {
            store: ChunkStore::new(),
            streamer: ChunkStreamer::new(observer, config.streaming)?,
            task_manager: TaskManager::new(config.worker_count),
            commands: CommandBuffer::new(),
            terrain: Arc::new(TerrainGenerator::new(config.seed)),
            sink,
            config,
        })
    }

    /// Advances the pipeline by one tick.
    ///
    /// Reconciles against the observer if it moved, then keeps pumping task
    /// results and flushing commands until no more results are ready.
    pub fn tick(&mut self) -> TickReport {
        let started = Instant::now();
        let mut report = TickReport::default();

        if let Some(reconcile) = self.streamer.drive(&mut self.store, &mut self.sink) {
            for handle in &reconcile.created {
                self.publish_generation(*handle);
            }
            report.reconcile = Some(reconcile);
        }

        loop {
            self.task_manager.process_queued_tasks();
            let handled = self.task_manager.process_completed_tasks(&mut self.commands);
            if handled == 0 && self.commands.is_empty() {
                break;
            }
            report.tasks_handled += handled;

            let flush = self.commands.flush(&mut self.store, &mut self.sink);
            self.streamer.defer_release(flush.unreleased);
            for handle in &flush.generated {
                self.publish_meshing(*handle);
            }
            report.generated += flush.generated.len();
            report.spawned += flush.spawned.len();
            report.stale += flush.stale;
            report.failed += flush.failed;
        }

        report.elapsed = started.elapsed();
        if report.reconcile.is_some() || report.tasks_handled > 0 {
            log::debug!(
                "Tick: {} results, {} generated, {} spawned, {} live chunks, {} queued tasks ({:?})",
                report.tasks_handled,
                report.generated,
                report.spawned,
                self.store.len(),
                self.task_manager.queued_len(),
                report.elapsed
            );
        }
        report
    }

    /// Evicts one chunk right away, releasing its render handles.
    pub fn evict(&mut self, coordinate: ChunkCoordinate) -> bool {
        self.streamer.evict(coordinate, &mut self.store, &mut self.sink)
    }

    /// `true` when no task is queued, running or waiting to be applied.
    pub fn is_idle(&self) -> bool {
        self.task_manager.is_idle() && self.commands.is_empty()
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    pub fn streamer(&self) -> &ChunkStreamer {
        &self.streamer
    }

    pub fn terrain(&self) -> &TerrainGenerator {
        &self.terrain
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    fn publish_generation(&mut self, chunk: ChunkHandle) {
        self.task_manager
            .publish_task(Box::new(ChunkGenerationTask::new(chunk, self.terrain.clone())));
    }

    fn publish_meshing(&mut self, chunk: ChunkHandle) {
        let Some(voxels) = self
            .store
            .get_stamped(chunk)
            .and_then(|record| record.voxels().cloned())
        else {
            return;
        };
        self.task_manager
            .publish_task(Box::new(ChunkMeshGenerationTask::new(chunk, voxels)));
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Point3;

    use super::*;
    use crate::{
        config::StreamingConfig,
        engine_state::{
            observer::TrackedObserver,
            rendering::InstanceSink,
            voxels::chunk::ChunkLifecycle,
        },
    };

    fn inline_config(generation_radius: f32, degeneration_radius: f32) -> WorldConfig {
        WorldConfig {
            seed: 11,
            worker_count: 0,
            streaming: StreamingConfig {
                generation_radius,
                degeneration_radius,
                evict_unspawned: false,
            },
        }
    }

    #[test]
    fn inline_tick_spawns_every_admitted_chunk() {
        let observer = TrackedObserver::at(Point3::new(0.0, 0.0, 0.0));
        let mut engine = EngineState::new(inline_config(32.0, 48.0), Box::new(observer), InstanceSink::new()).unwrap();

        let report = engine.tick();
        assert_eq!(report.reconcile.map(|r| r.created.len()), Some(33));
        assert_eq!(report.generated, 33);
        assert_eq!(report.spawned, 33);
        assert_eq!(engine.store().count_in(ChunkLifecycle::Spawned), 33);
        assert!(engine.is_idle());

        let instances: usize = engine.store().iter().map(|r| r.child_handles().len()).sum();
        assert_eq!(engine.sink().instance_count(), instances);
    }

    #[test]
    fn idle_tick_does_nothing() {
        let observer = TrackedObserver::new();
        let mut engine = EngineState::new(inline_config(32.0, 48.0), Box::new(observer), InstanceSink::new()).unwrap();
        let report = engine.tick();
        assert!(report.reconcile.is_none());
        assert_eq!(report.tasks_handled, 0);
        assert!(engine.store().is_empty());
    }

    #[test]
    fn evict_releases_handles() {
        let observer = TrackedObserver::at(Point3::new(0.0, 0.0, 0.0));
        let mut engine = EngineState::new(inline_config(16.0, 32.0), Box::new(observer), InstanceSink::new()).unwrap();
        engine.tick();

        let coordinate = ChunkCoordinate::from_grid(0, 0, 0);
        let handles = engine.store().try_get(coordinate).unwrap().child_handles().len();
        let before = engine.sink().instance_count();

        assert!(engine.evict(coordinate));
        assert!(!engine.evict(coordinate));
        assert_eq!(engine.sink().instance_count(), before - handles);
    }

    #[test]
    fn inverted_radii_are_refused() {
        let observer = TrackedObserver::at(Point3::new(0.0, 0.0, 0.0));
        let result = EngineState::new(inline_config(32.0, 8.0), Box::new(observer), InstanceSink::new());
        assert!(matches!(result, Err(ConfigError::RadiusOrdering { .. })));
    }
}

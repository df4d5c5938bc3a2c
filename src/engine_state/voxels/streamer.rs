//! # Chunk Streamer
//!
//! Keeps the chunk store in line with the observer's position.
//!
//! Whenever the observer has moved (compared exactly, so any change at all
//! counts) the streamer runs one reconciliation pass:
//!
//! 1. Render handles whose release failed earlier are released again.
//! 2. Chunks farther than the degeneration radius are evicted. Their child
//!    handles go to the sink's despawn call, then the record is dropped.
//! 3. Every grid coordinate within the generation radius that has no record
//!    yet is admitted as `Pending`.
//! 4. Chunks whose spawn the sink refused earlier are resubmitted.
//!
//! The degeneration radius is never smaller than the generation radius
//! ([`ChunkStreamer::new`] refuses such a config), so no chunk is admitted
//! and evicted in the same pass.
//!
//! Distances are squared Euclidean distances from the observer to a chunk's
//! origin corner.

use cgmath::Point3;

use crate::{
    config::StreamingConfig,
    engine_state::{
        observer::ObserverSource,
        rendering::{RenderHandle, RenderSink},
    },
    error::ConfigError,
};

use super::{
    chunk::{round_to_grid, ChunkCoordinate, ChunkHandle, ChunkLifecycle, CHUNK_SIZE},
    store::{Admission, ChunkStore},
};

/// What one reconciliation pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub position: Option<Point3<f32>>,
    /// Newly admitted chunks, all `Pending`.
    pub created: Vec<ChunkHandle>,
    /// Chunks removed from the store.
    pub evicted: Vec<ChunkCoordinate>,
    /// Previously refused chunks the sink accepted this time.
    pub respawned: usize,
    /// Handles from earlier failed releases that were released now.
    pub released: usize,
    /// Sink calls that failed during this pass.
    pub sink_failures: usize,
}

/// Grid coordinates whose origin lies within `radius` of `position`.
///
/// Scans the grid-aligned bounding box of the sphere and keeps every origin
/// with `distance² <= radius²`.
pub fn desired_coordinates(position: Point3<f32>, radius: f32) -> Vec<ChunkCoordinate> {
    let radius2 = radius * radius;
    let axis = |v: f32| (round_to_grid(v - radius)..=round_to_grid(v + radius)).step_by(CHUNK_SIZE as usize);

    let mut coordinates = Vec::new();
    for x in axis(position.x) {
        for y in axis(position.y) {
            for z in axis(position.z) {
                let coordinate = ChunkCoordinate::from_grid(x / CHUNK_SIZE, y / CHUNK_SIZE, z / CHUNK_SIZE);
                if coordinate.distance2(position) <= radius2 {
                    coordinates.push(coordinate);
                }
            }
        }
    }
    coordinates
}

pub struct ChunkStreamer {
    observer: Box<dyn ObserverSource>,
    config: StreamingConfig,
    last_position: Option<Point3<f32>>,
    /// Child handles whose despawn failed; retried every pass.
    pending_releases: Vec<RenderHandle>,
}

impl ChunkStreamer {
    /// Fails if `config` does not pass [`StreamingConfig::validate`].
    pub fn new(observer: Box<dyn ObserverSource>, config: StreamingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(ChunkStreamer {
            observer,
            config,
            last_position: None,
            pending_releases: Vec::new(),
        })
    }

    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    /// Position used by the last reconciliation pass.
    pub fn last_position(&self) -> Option<Point3<f32>> {
        self.last_position
    }

    pub fn pending_releases(&self) -> &[RenderHandle] {
        &self.pending_releases
    }

    /// Queues handles that still have to be released; the next pass retries them.
    pub fn defer_release(&mut self, handles: impl IntoIterator<Item = RenderHandle>) {
        self.pending_releases.extend(handles);
    }

    /// Runs a reconciliation pass if the observer exists and has moved.
    ///
    /// Returns `None` when nothing was done.
    pub fn drive<S: RenderSink + ?Sized>(
        &mut self,
        store: &mut ChunkStore,
        sink: &mut S,
    ) -> Option<ReconcileReport> {
        let Some(position) = self.observer.position() else {
            log::trace!("No observer in the world, skipping reconciliation");
            return None;
        };
        if self.last_position == Some(position) {
            return None;
        }

        self.last_position = Some(position);
        Some(self.reconcile_at(position, store, sink))
    }

    /// One full reconciliation pass around `position`.
    pub fn reconcile_at<S: RenderSink + ?Sized>(
        &mut self,
        position: Point3<f32>,
        store: &mut ChunkStore,
        sink: &mut S,
    ) -> ReconcileReport {
        let mut report = ReconcileReport {
            position: Some(position),
            ..ReconcileReport::default()
        };

        if !self.pending_releases.is_empty() {
            let handles = std::mem::take(&mut self.pending_releases);
            match sink.despawn(&handles) {
                Ok(()) => report.released = handles.len(),
                Err(err) => {
                    log::warn!("Releasing {} leftover render handles failed again: {}", handles.len(), err);
                    report.sink_failures += 1;
                    self.pending_releases = handles;
                }
            }
        }

        let degeneration2 = self.config.degeneration_radius * self.config.degeneration_radius;
        let evict_unspawned = self.config.evict_unspawned;
        let far: Vec<ChunkCoordinate> = store
            .iter()
            .filter(|record| evict_unspawned || record.lifecycle() == ChunkLifecycle::Spawned)
            .map(|record| record.coordinate())
            .filter(|coordinate| coordinate.distance2(position) > degeneration2)
            .collect();
        for coordinate in far {
            let failures = self.pending_releases.len();
            if self.evict(coordinate, store, sink) {
                report.evicted.push(coordinate);
            }
            if self.pending_releases.len() > failures {
                report.sink_failures += 1;
            }
        }

        for coordinate in desired_coordinates(position, self.config.generation_radius) {
            if let Admission::Created(handle) = store.create(coordinate) {
                report.created.push(handle);
            }
        }

        let refused: Vec<ChunkCoordinate> = store
            .iter()
            .filter(|record| record.is_awaiting_spawn())
            .map(|record| record.coordinate())
            .collect();
        for coordinate in refused {
            let Some(record) = store.try_get_mut(coordinate) else {
                continue;
            };
            match record.retry_spawn(sink) {
                Ok(_) => report.respawned += 1,
                Err(err) => {
                    log::warn!("Chunk {:?} still not spawned: {}", coordinate.origin(), err);
                    report.sink_failures += 1;
                    self.pending_releases.extend(err.into_unreleased());
                }
            }
        }

        log::debug!(
            "Reconciled at ({:.1}, {:.1}, {:.1}): {} created, {} evicted, {} respawned, {} live",
            position.x,
            position.y,
            position.z,
            report.created.len(),
            report.evicted.len(),
            report.respawned,
            store.len()
        );
        report
    }

    /// Tears down the chunk at `coordinate`, releasing its child handles.
    ///
    /// Returns `false` if there was no such chunk. Evicting twice is harmless:
    /// the second call finds nothing and releases nothing.
    pub fn evict<S: RenderSink + ?Sized>(
        &mut self,
        coordinate: ChunkCoordinate,
        store: &mut ChunkStore,
        sink: &mut S,
    ) -> bool {
        let Some(mut record) = store.remove(coordinate) else {
            return false;
        };

        let handles = record.take_child_handles();
        if !handles.is_empty() {
            if let Err(err) = sink.despawn(&handles) {
                log::warn!(
                    "Releasing {} render handles of chunk {:?} failed, will retry: {}",
                    handles.len(),
                    coordinate.origin(),
                    err
                );
                self.pending_releases.extend(handles);
            }
        }
        log::trace!("Chunk {:?} evicted", coordinate.origin());
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        engine_state::{
            observer::TrackedObserver,
            rendering::{meshing::mesh_chunk, InstanceSink, VisibleBlock},
            voxels::{
                block::{BlockType, AIR},
                chunk::ChunkVoxels,
            },
        },
        error::SinkError,
    };

    /// Drops the last handle of every batch while `short` is set.
    struct ShortSink {
        inner: InstanceSink,
        short: bool,
    }

    impl RenderSink for ShortSink {
        fn spawn(&mut self, chunk: ChunkCoordinate, blocks: &[VisibleBlock]) -> Result<Vec<RenderHandle>, SinkError> {
            let mut handles = self.inner.spawn(chunk, blocks)?;
            if self.short {
                handles.pop();
            }
            Ok(handles)
        }

        fn despawn(&mut self, handles: &[RenderHandle]) -> Result<(), SinkError> {
            self.inner.despawn(handles)
        }
    }

    fn config(generation_radius: f32, degeneration_radius: f32) -> StreamingConfig {
        StreamingConfig {
            generation_radius,
            degeneration_radius,
            evict_unspawned: false,
        }
    }

    fn spawn_slab(store: &mut ChunkStore, coordinate: ChunkCoordinate, sink: &mut InstanceSink) {
        let handle = store.create(coordinate).handle();
        let record = store.get_stamped_mut(handle).unwrap();
        record
            .install_voxels(Arc::new(ChunkVoxels::from_fn(|_, y, _| {
                if y == 0 {
                    BlockType::STONE.id()
                } else {
                    AIR
                }
            })))
            .unwrap();
        mesh_chunk(record, sink).unwrap();
    }

    #[test]
    fn desired_set_at_origin() {
        let coordinates = desired_coordinates(Point3::new(0.0, 0.0, 0.0), 32.0);
        assert_eq!(coordinates.len(), 33);
        for c in &coordinates {
            let g = c.grid();
            assert!(g.x * g.x + g.y * g.y + g.z * g.z <= 4);
        }
    }

    #[test]
    fn desired_set_is_exact_for_offset_positions() {
        let position = Point3::new(7.5, -3.0, 100.25);
        let radius = 40.0;
        let coordinates = desired_coordinates(position, radius);

        // Compare with a brute-force scan over a generous box.
        let mut expected = 0;
        for gx in -10..10 {
            for gy in -10..10 {
                for gz in -4..16 {
                    if ChunkCoordinate::from_grid(gx, gy, gz).distance2(position) <= radius * radius {
                        expected += 1;
                    }
                }
            }
        }
        assert_eq!(coordinates.len(), expected);
        assert!(coordinates.iter().all(|c| c.distance2(position) <= radius * radius));
    }

    #[test]
    fn missing_observer_defers() {
        let observer = TrackedObserver::new();
        let mut streamer = ChunkStreamer::new(Box::new(observer.clone()), config(32.0, 48.0)).unwrap();
        let mut store = ChunkStore::new();
        let mut sink = InstanceSink::new();

        assert!(streamer.drive(&mut store, &mut sink).is_none());
        assert!(store.is_empty());

        observer.set(Point3::new(0.0, 0.0, 0.0));
        let report = streamer.drive(&mut store, &mut sink).unwrap();
        assert_eq!(report.created.len(), 33);
    }

    #[test]
    fn unchanged_position_is_not_reconciled_again() {
        let observer = TrackedObserver::at(Point3::new(0.0, 0.0, 0.0));
        let mut streamer = ChunkStreamer::new(Box::new(observer.clone()), config(32.0, 48.0)).unwrap();
        let mut store = ChunkStore::new();
        let mut sink = InstanceSink::new();

        assert!(streamer.drive(&mut store, &mut sink).is_some());
        assert!(streamer.drive(&mut store, &mut sink).is_none());

        // Any movement at all triggers a pass, even one that changes nothing.
        observer.set(Point3::new(0.0, 0.0, 0.001));
        let report = streamer.drive(&mut store, &mut sink).unwrap();
        assert!(report.created.is_empty());
        assert!(report.evicted.is_empty());
    }

    #[test]
    fn only_spawned_chunks_are_evicted_by_default() {
        let mut streamer = ChunkStreamer::new(Box::new(TrackedObserver::new()), config(16.0, 20.0)).unwrap();
        let mut store = ChunkStore::new();
        let mut sink = InstanceSink::new();

        let pending = ChunkCoordinate::from_grid(10, 0, 0);
        let spawned = ChunkCoordinate::from_grid(-10, 0, 0);
        store.create(pending);
        spawn_slab(&mut store, spawned, &mut sink);

        let report = streamer.reconcile_at(Point3::new(0.0, 0.0, 0.0), &mut store, &mut sink);
        assert_eq!(report.evicted, vec![spawned]);
        assert!(store.contains(pending));
        assert_eq!(sink.instance_count(), 0);
    }

    #[test]
    fn evict_unspawned_removes_any_far_chunk() {
        let mut streaming = config(16.0, 20.0);
        streaming.evict_unspawned = true;
        let mut streamer = ChunkStreamer::new(Box::new(TrackedObserver::new()), streaming).unwrap();
        let mut store = ChunkStore::new();
        let mut sink = InstanceSink::new();

        let pending = ChunkCoordinate::from_grid(10, 0, 0);
        store.create(pending);
        let report = streamer.reconcile_at(Point3::new(0.0, 0.0, 0.0), &mut store, &mut sink);
        assert_eq!(report.evicted, vec![pending]);
        assert!(!store.contains(pending));
    }

    #[test]
    fn eviction_is_idempotent() {
        let mut streamer = ChunkStreamer::new(Box::new(TrackedObserver::new()), config(16.0, 20.0)).unwrap();
        let mut store = ChunkStore::new();
        let mut sink = InstanceSink::new();
        let coordinate = ChunkCoordinate::from_grid(0, 0, 0);
        spawn_slab(&mut store, coordinate, &mut sink);

        assert!(streamer.evict(coordinate, &mut store, &mut sink));
        assert!(!streamer.evict(coordinate, &mut store, &mut sink));
        assert_eq!(sink.despawn_batches().len(), 1);
        assert_eq!(sink.stale_releases(), 0);
    }

    #[test]
    fn failed_release_is_retried_next_pass() {
        let mut streamer = ChunkStreamer::new(Box::new(TrackedObserver::new()), config(16.0, 20.0)).unwrap();
        let mut store = ChunkStore::new();
        let mut sink = InstanceSink::new();
        let coordinate = ChunkCoordinate::from_grid(0, 0, 0);
        spawn_slab(&mut store, coordinate, &mut sink);

        sink.set_despawn_failure(true);
        let far = Point3::new(1000.0, 0.0, 0.0);
        let report = streamer.reconcile_at(far, &mut store, &mut sink);
        assert_eq!(report.evicted, vec![coordinate]);
        assert_eq!(report.sink_failures, 1);
        assert_eq!(streamer.pending_releases().len(), 256);
        assert_eq!(sink.instance_count(), 256);

        sink.set_despawn_failure(false);
        let report = streamer.reconcile_at(far, &mut store, &mut sink);
        assert_eq!(report.released, 256);
        assert!(streamer.pending_releases().is_empty());
        assert_eq!(sink.instance_count(), 0);
    }

    #[test]
    fn refused_spawns_are_retried() {
        let mut streamer = ChunkStreamer::new(Box::new(TrackedObserver::new()), config(1.0, 20.0)).unwrap();
        let mut store = ChunkStore::new();
        let mut sink = InstanceSink::with_capacity(0);
        let coordinate = ChunkCoordinate::from_grid(0, 0, 0);

        let handle = store.create(coordinate).handle();
        let record = store.get_stamped_mut(handle).unwrap();
        record
            .install_voxels(Arc::new(ChunkVoxels::from_fn(|_, _, _| BlockType::DIRT.id())))
            .unwrap();
        assert!(mesh_chunk(record, &mut sink).is_err());

        let origin = Point3::new(0.0, 0.0, 0.0);
        let report = streamer.reconcile_at(origin, &mut store, &mut sink);
        assert_eq!(report.respawned, 0);
        assert_eq!(report.sink_failures, 1);

        sink.set_capacity(None);
        let report = streamer.reconcile_at(origin, &mut store, &mut sink);
        assert_eq!(report.respawned, 1);
        assert_eq!(
            store.try_get(coordinate).map(|r| r.lifecycle()),
            Some(ChunkLifecycle::Spawned)
        );
    }

    #[test]
    fn rejects_degeneration_inside_generation() {
        let err = ChunkStreamer::new(Box::new(TrackedObserver::new()), config(32.0, 8.0)).err();
        assert!(matches!(
            err,
            Some(ConfigError::RadiusOrdering {
                generation,
                degeneration,
            }) if generation == 32.0 && degeneration == 8.0
        ));
        assert!(ChunkStreamer::new(Box::new(TrackedObserver::new()), config(-1.0, 8.0)).is_err());
    }

    #[test]
    fn far_observer_does_not_overflow_the_grid() {
        let far = desired_coordinates(Point3::new(3e9, 0.0, -3e9), 32.0);
        assert!(far.is_empty());

        let mut streamer = ChunkStreamer::new(Box::new(TrackedObserver::new()), config(32.0, 48.0)).unwrap();
        let mut store = ChunkStore::new();
        let mut sink = InstanceSink::new();
        let report = streamer.reconcile_at(Point3::new(3e9, 0.0, 0.0), &mut store, &mut sink);
        assert!(report.created.is_empty());
    }

    #[test]
    fn short_batch_handles_are_released_on_a_later_pass() {
        let mut streamer = ChunkStreamer::new(Box::new(TrackedObserver::new()), config(1.0, 20.0)).unwrap();
        let mut store = ChunkStore::new();
        let mut sink = ShortSink {
            inner: InstanceSink::with_capacity(0),
            short: true,
        };
        let coordinate = ChunkCoordinate::from_grid(0, 0, 0);

        let handle = store.create(coordinate).handle();
        let record = store.get_stamped_mut(handle).unwrap();
        record
            .install_voxels(Arc::new(ChunkVoxels::from_fn(|_, y, _| {
                if y == 0 {
                    BlockType::STONE.id()
                } else {
                    AIR
                }
            })))
            .unwrap();
        assert!(mesh_chunk(record, &mut sink).is_err());

        sink.inner.set_capacity(None);
        sink.inner.set_despawn_failure(true);
        let origin = Point3::new(0.0, 0.0, 0.0);
        let report = streamer.reconcile_at(origin, &mut store, &mut sink);
        assert_eq!(report.respawned, 0);
        assert_eq!(streamer.pending_releases().len(), 255);
        assert!(streamer.pending_releases().iter().all(|h| sink.inner.contains(*h)));

        sink.short = false;
        sink.inner.set_despawn_failure(false);
        let report = streamer.reconcile_at(origin, &mut store, &mut sink);
        assert_eq!(report.released, 255);
        assert_eq!(report.respawned, 1);
        assert!(streamer.pending_releases().is_empty());
        // The one handle the sink never returned is all that is left over.
        let record = store.try_get(coordinate).unwrap();
        assert_eq!(sink.inner.instance_count(), record.child_handles().len() + 1);
    }
}

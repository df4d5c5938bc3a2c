//! # Chunk Store
//!
//! The set of chunks that currently exist, keyed by coordinate.
//!
//! The store is sparse: only coordinates the streamer admitted have a
//! record. It is owned by a single thread (the engine driver); workers never
//! see it and refer to records through [`ChunkHandle`]s instead.
//!
//! ## Stamps
//!
//! Every admission gets a fresh stamp. A handle only resolves while the
//! record it was taken from is still the one stored at its coordinate, so
//! work finishing for an evicted chunk cannot land on a re-admitted one.

use std::collections::HashMap;

use super::chunk::{ChunkCoordinate, ChunkHandle, ChunkLifecycle, ChunkRecord};

/// Outcome of [`ChunkStore::create`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Admission {
    /// A new `Pending` record was inserted.
    Created(ChunkHandle),
    /// A record already existed; nothing changed.
    Existing(ChunkHandle),
}

impl Admission {
    pub fn handle(&self) -> ChunkHandle {
        match self {
            Admission::Created(handle) | Admission::Existing(handle) => *handle,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Admission::Created(_))
    }
}

#[derive(Debug, Default)]
pub struct ChunkStore {
    records: HashMap<ChunkCoordinate, ChunkRecord>,
    next_stamp: u64,
}

impl ChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits `coordinate` as `Pending` unless it is already present.
    ///
    /// Creating an existing coordinate is not an error: the existing record
    /// is left untouched and its handle returned.
    pub fn create(&mut self, coordinate: ChunkCoordinate) -> Admission {
        if let Some(record) = self.records.get(&coordinate) {
            return Admission::Existing(record.handle());
        }

        self.next_stamp += 1;
        let record = ChunkRecord::new(coordinate, self.next_stamp);
        let handle = record.handle();
        self.records.insert(coordinate, record);
        log::trace!("Chunk {:?} admitted (stamp {})", coordinate.origin(), handle.stamp);
        Admission::Created(handle)
    }

    pub fn try_get(&self, coordinate: ChunkCoordinate) -> Option<&ChunkRecord> {
        self.records.get(&coordinate)
    }

    pub fn try_get_mut(&mut self, coordinate: ChunkCoordinate) -> Option<&mut ChunkRecord> {
        self.records.get_mut(&coordinate)
    }

    /// The record `handle` was taken from, if it has not been replaced or removed.
    pub fn get_stamped(&self, handle: ChunkHandle) -> Option<&ChunkRecord> {
        self.records
            .get(&handle.coordinate)
            .filter(|record| record.handle().stamp == handle.stamp)
    }

    /// Mutable counterpart of [`get_stamped`](Self::get_stamped).
    pub fn get_stamped_mut(&mut self, handle: ChunkHandle) -> Option<&mut ChunkRecord> {
        self.records
            .get_mut(&handle.coordinate)
            .filter(|record| record.handle().stamp == handle.stamp)
    }

    /// Removes and returns the record for teardown. `None` if absent.
    pub fn remove(&mut self, coordinate: ChunkCoordinate) -> Option<ChunkRecord> {
        self.records.remove(&coordinate)
    }

    pub fn contains(&self, coordinate: ChunkCoordinate) -> bool {
        self.records.contains_key(&coordinate)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChunkRecord> {
        self.records.values()
    }

    pub fn coordinates(&self) -> impl Iterator<Item = ChunkCoordinate> + '_ {
        self.records.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records in `lifecycle`.
    pub fn count_in(&self, lifecycle: ChunkLifecycle) -> usize {
        self.records
            .values()
            .filter(|record| record.lifecycle() == lifecycle)
            .count()
    }
}

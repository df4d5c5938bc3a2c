//! # Command Buffer
//!
//! Structural changes produced by worker tasks are not applied when the task
//! finishes. They are queued here as [`ChunkCommand`]s and applied together
//! at one sync point per tick by [`CommandBuffer::flush`], so every stage
//! observes a consistent store and then commits.
//!
//! Commands address chunks by [`ChunkHandle`]. A command whose chunk was
//! evicted (or evicted and re-admitted under a new stamp) since the task was
//! published is dropped at flush time.

use std::sync::Arc;

use super::{
    rendering::{RenderHandle, RenderSink, VisibleBlock},
    voxels::{
        chunk::{ChunkCoordinate, ChunkHandle, ChunkVoxels},
        store::ChunkStore,
    },
};
use crate::error::SpawnError;

/// A deferred change to one chunk.
#[derive(Debug, Clone)]
pub enum ChunkCommand {
    /// Store generated voxels; `Pending -> Generated`.
    Install {
        chunk: ChunkHandle,
        voxels: Arc<ChunkVoxels>,
    },
    /// Commit meshed blocks to the sink; `Generated -> Spawned`.
    Spawn {
        chunk: ChunkHandle,
        blocks: Vec<VisibleBlock>,
    },
}

impl ChunkCommand {
    pub fn chunk(&self) -> ChunkHandle {
        match self {
            ChunkCommand::Install { chunk, .. } | ChunkCommand::Spawn { chunk, .. } => *chunk,
        }
    }
}

/// What a flush changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FlushReport {
    /// Chunks that became `Generated` and are ready for meshing.
    pub generated: Vec<ChunkHandle>,
    /// Chunks whose blocks the sink accepted.
    pub spawned: Vec<ChunkCoordinate>,
    /// Commands dropped because their chunk is gone or already past that stage.
    pub stale: usize,
    /// Spawns the sink refused; the chunk keeps its blocks for a retry.
    pub failed: usize,
    /// Handles from partial batches the sink would not take back. Whoever
    /// runs the flush owns them and has to release them.
    pub unreleased: Vec<RenderHandle>,
}

#[derive(Debug, Default)]
pub struct CommandBuffer {
    commands: Vec<ChunkCommand>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, command: ChunkCommand) {
        self.commands.push(command);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChunkCommand> {
        self.commands.iter()
    }

    /// Applies every queued command in order and empties the buffer.
    pub fn flush<S: RenderSink + ?Sized>(
        &mut self,
        store: &mut ChunkStore,
        sink: &mut S,
    ) -> FlushReport {
        let mut report = FlushReport::default();

        for command in self.commands.drain(..) {
            let handle = command.chunk();
            let Some(record) = store.get_stamped_mut(handle) else {
                log::debug!(
                    "Dropping command for evicted chunk {:?} (stamp {})",
                    handle.coordinate.origin(),
                    handle.stamp
                );
                report.stale += 1;
                continue;
            };

            match command {
                ChunkCommand::Install { voxels, .. } => match record.install_voxels(voxels) {
                    Ok(()) => report.generated.push(handle),
                    Err(err) => {
                        log::debug!("Dropping voxels for {:?}: {}", handle.coordinate.origin(), err);
                        report.stale += 1;
                    }
                },
                ChunkCommand::Spawn { blocks, .. } => match record.commit_spawn(blocks, sink) {
                    Ok(_) => report.spawned.push(handle.coordinate),
                    Err(SpawnError::Sink(err)) => {
                        log::warn!(
                            "Sink refused chunk {:?}, will retry: {}",
                            handle.coordinate.origin(),
                            err
                        );
                        report.failed += 1;
                    }
                    Err(err @ SpawnError::PartialBatch { .. }) => {
                        log::warn!(
                            "Sink short-changed chunk {:?}, will retry: {}",
                            handle.coordinate.origin(),
                            err
                        );
                        report.failed += 1;
                        report.unreleased.extend(err.into_unreleased());
                    }
                    Err(SpawnError::Lifecycle(err)) => {
                        log::debug!("Dropping mesh for {:?}: {}", handle.coordinate.origin(), err);
                        report.stale += 1;
                    }
                },
            }
        }

        if !report.generated.is_empty() || !report.spawned.is_empty() {
            log::debug!(
                "Flushed commands: {} generated, {} spawned, {} stale, {} failed",
                report.generated.len(),
                report.spawned.len(),
                report.stale,
                report.failed
            );
        }
        report
    }
}

impl Extend<ChunkCommand> for CommandBuffer {
    fn extend<I: IntoIterator<Item = ChunkCommand>>(&mut self, iter: I) {
        self.commands.extend(iter);
    }
}

//! # Chunk Module
//!
//! A chunk is a 16x16x16 cube of voxels, the unit of generation, streaming
//! and meshing. This module holds the chunk's coordinate, its dense voxel
//! grid, and the [`ChunkRecord`] the store keeps per live chunk.
//!
//! ## Lifecycle
//!
//! ```text
//! Pending ──install_voxels──▶ Generated ──commit_spawn──▶ Spawned
//!    │                            │                          │
//!    └────────────────────────────┴──── evicted (removed) ───┘
//! ```
//!
//! No transition skips a state. Removal is legal from any state; whatever
//! child handles were recorded by then are released by the streamer.
//!
//! ## Voxel storage
//!
//! [`ChunkVoxels`] keeps one [`BlockId`] per cell plus a bit per cell marking
//! solidity, so neighbor tests during meshing only touch the bit vector.
//! The grid is written exactly once, by the generation stage, and shared
//! read-only (behind an `Arc`) afterwards.

use std::sync::Arc;

use bitvec::vec::BitVec;
use cgmath::{MetricSpace, Point3};

use crate::{
    engine_state::rendering::{RenderHandle, RenderSink, VisibleBlock},
    error::{LifecycleError, SpawnError},
};

use super::{
    addressing::{flatten, volume},
    block::BlockId,
};

pub use chunk_creation::ChunkVoxelsBuilder;
pub use chunk_iteration::SolidCells;

mod chunk_creation;
pub mod chunk_iteration;

/// The dimension (width, height, depth) of a chunk in blocks.
pub const CHUNK_SIZE: i32 = 16;
/// The number of cells in a chunk.
pub const CHUNK_VOLUME: usize = volume(CHUNK_SIZE);

/// Lowest chunk grid index on each axis.
pub const MIN_GRID: i32 = i32::MIN / CHUNK_SIZE;
/// Highest chunk grid index on each axis.
///
/// The world spans `MIN_GRID * CHUNK_SIZE ..= MAX_GRID * CHUNK_SIZE + CHUNK_SIZE - 1`
/// blocks per axis, which is the whole `i32` range. Grid indices and
/// positions outside it are clamped onto the outermost chunk.
pub const MAX_GRID: i32 = i32::MAX / CHUNK_SIZE;

/// Floors a world-space value onto the chunk grid.
#[inline]
pub fn round_to_grid(v: f32) -> i32 {
    // Float to int casts saturate and map NaN to zero.
    ((v / CHUNK_SIZE as f32).floor() as i32).clamp(MIN_GRID, MAX_GRID) * CHUNK_SIZE
}

/// World-space origin of a chunk. Always a multiple of [`CHUNK_SIZE`] on every axis.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChunkCoordinate {
    origin: Point3<i32>,
}

impl ChunkCoordinate {
    /// Coordinate of the chunk at grid cell `(gx, gy, gz)`, clamped to
    /// [`MIN_GRID`]`..=`[`MAX_GRID`].
    pub fn from_grid(gx: i32, gy: i32, gz: i32) -> Self {
        let axis = |g: i32| g.clamp(MIN_GRID, MAX_GRID) * CHUNK_SIZE;
        ChunkCoordinate {
            origin: Point3::new(axis(gx), axis(gy), axis(gz)),
        }
    }

    /// Coordinate with the given world origin, if it is grid aligned.
    pub fn from_origin(x: i32, y: i32, z: i32) -> Option<Self> {
        let aligned = |v: i32| v.rem_euclid(CHUNK_SIZE) == 0;
        (aligned(x) && aligned(y) && aligned(z)).then(|| ChunkCoordinate {
            origin: Point3::new(x, y, z),
        })
    }

    /// The chunk containing a world-space point.
    pub fn containing(point: Point3<f32>) -> Self {
        ChunkCoordinate {
            origin: Point3::new(
                round_to_grid(point.x),
                round_to_grid(point.y),
                round_to_grid(point.z),
            ),
        }
    }

    pub fn origin(&self) -> Point3<i32> {
        self.origin
    }

    /// Grid index (origin divided by the chunk size).
    pub fn grid(&self) -> Point3<i32> {
        Point3::new(
            self.origin.x.div_euclid(CHUNK_SIZE),
            self.origin.y.div_euclid(CHUNK_SIZE),
            self.origin.z.div_euclid(CHUNK_SIZE),
        )
    }

    /// Squared distance from the chunk origin to `point`.
    pub fn distance2(&self, point: Point3<f32>) -> f32 {
        let origin = Point3::new(
            self.origin.x as f32,
            self.origin.y as f32,
            self.origin.z as f32,
        );
        origin.distance2(point)
    }

    /// World position of a local cell.
    pub fn world_position(&self, local: Point3<i32>) -> Point3<i32> {
        Point3::new(
            self.origin.x + local.x,
            self.origin.y + local.y,
            self.origin.z + local.z,
        )
    }
}

/// Stamped reference to a chunk record.
///
/// In-flight tasks carry a handle instead of the record. The stamp changes
/// whenever a coordinate is re-admitted, so output computed for an evicted
/// chunk never lands on its successor.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChunkHandle {
    pub coordinate: ChunkCoordinate,
    pub stamp: u64,
}

/// Where a chunk is in its pipeline.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChunkLifecycle {
    /// Admitted, voxels not yet generated.
    Pending,
    /// Voxels generated and frozen; visible blocks may or may not be computed.
    Generated,
    /// Visible blocks committed to the render sink.
    Spawned,
}

/// Dense voxel grid of one chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkVoxels {
    blocks: Vec<BlockId>,
    solid_array: BitVec,
}

impl ChunkVoxels {
    /// Builds a grid by evaluating `block_at(x, y, z)` for every local cell.
    pub fn from_fn(mut block_at: impl FnMut(i32, i32, i32) -> BlockId) -> Self {
        let mut builder = ChunkVoxelsBuilder::new();
        for x in 0..CHUNK_SIZE {
            for y in 0..CHUNK_SIZE {
                for z in 0..CHUNK_SIZE {
                    builder.push_block(block_at(x, y, z));
                }
            }
        }
        builder.build()
    }

    /// A grid of air.
    pub fn empty() -> Self {
        ChunkVoxelsBuilder::new().build()
    }

    /// Id at a local coordinate, `None` outside the chunk.
    pub fn get(&self, x: i32, y: i32, z: i32) -> Option<BlockId> {
        flatten(x, y, z, CHUNK_SIZE).map(|index| self.blocks[index])
    }

    /// Solidity at a local coordinate, `None` outside the chunk.
    #[inline]
    pub fn is_solid(&self, x: i32, y: i32, z: i32) -> Option<bool> {
        flatten(x, y, z, CHUNK_SIZE).map(|index| self.solid_array[index])
    }

    /// All ids in flat-index order.
    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    pub fn solid_count(&self) -> usize {
        self.solid_array.count_ones()
    }

    pub fn iter_solid(&self) -> SolidCells<'_> {
        SolidCells::new(self)
    }
}

/// Everything the store tracks for one live chunk.
#[derive(Debug)]
pub struct ChunkRecord {
    coordinate: ChunkCoordinate,
    stamp: u64,
    lifecycle: ChunkLifecycle,
    voxels: Option<Arc<ChunkVoxels>>,
    visible_blocks: Option<Vec<VisibleBlock>>,
    child_handles: Vec<RenderHandle>,
}

impl ChunkRecord {
    pub(crate) fn new(coordinate: ChunkCoordinate, stamp: u64) -> Self {
        ChunkRecord {
            coordinate,
            stamp,
            lifecycle: ChunkLifecycle::Pending,
            voxels: None,
            visible_blocks: None,
            child_handles: Vec::new(),
        }
    }

    pub fn coordinate(&self) -> ChunkCoordinate {
        self.coordinate
    }

    pub fn handle(&self) -> ChunkHandle {
        ChunkHandle {
            coordinate: self.coordinate,
            stamp: self.stamp,
        }
    }

    pub fn lifecycle(&self) -> ChunkLifecycle {
        self.lifecycle
    }

    /// The generated grid, once the chunk is `Generated` or later.
    pub fn voxels(&self) -> Option<&Arc<ChunkVoxels>> {
        self.voxels.as_ref()
    }

    /// Visible blocks in scan order, once meshing has produced them.
    pub fn visible_blocks(&self) -> Option<&[VisibleBlock]> {
        self.visible_blocks.as_deref()
    }

    pub fn child_handles(&self) -> &[RenderHandle] {
        &self.child_handles
    }

    /// `true` when meshing finished but the sink has not accepted the batch yet.
    pub fn is_awaiting_spawn(&self) -> bool {
        self.lifecycle == ChunkLifecycle::Generated && self.visible_blocks.is_some()
    }

    /// Stores the generated grid and moves `Pending -> Generated`.
    pub fn install_voxels(&mut self, voxels: Arc<ChunkVoxels>) -> Result<(), LifecycleError> {
        self.check_transition(ChunkLifecycle::Pending, ChunkLifecycle::Generated)?;
        self.voxels = Some(voxels);
        self.lifecycle = ChunkLifecycle::Generated;
        log::trace!("Chunk {:?} generated", self.coordinate.origin());
        Ok(())
    }

    /// Records the meshing output and commits it to the sink as one batch.
    ///
    /// On success the chunk is `Spawned` and owns one handle per visible
    /// block. On sink failure it stays `Generated` with the blocks kept, so a
    /// later [`retry_spawn`](Self::retry_spawn) can resubmit them.
    pub fn commit_spawn<S: RenderSink + ?Sized>(
        &mut self,
        blocks: Vec<VisibleBlock>,
        sink: &mut S,
    ) -> Result<usize, SpawnError> {
        self.check_transition(ChunkLifecycle::Generated, ChunkLifecycle::Spawned)?;
        self.visible_blocks = Some(blocks);
        self.retry_spawn(sink)
    }

    /// Resubmits previously meshed blocks to the sink.
    pub fn retry_spawn<S: RenderSink + ?Sized>(&mut self, sink: &mut S) -> Result<usize, SpawnError> {
        self.check_transition(ChunkLifecycle::Generated, ChunkLifecycle::Spawned)?;
        let Some(blocks) = self.visible_blocks.as_deref() else {
            return Err(LifecycleError {
                from: self.lifecycle,
                to: ChunkLifecycle::Spawned,
            }
            .into());
        };

        let handles = if blocks.is_empty() {
            Vec::new()
        } else {
            sink.spawn(self.coordinate, blocks)?
        };

        if handles.len() != blocks.len() {
            // Partial batches are never kept.
            let (requested, returned) = (blocks.len(), handles.len());
            let unreleased = match sink.despawn(&handles) {
                Ok(()) => Vec::new(),
                Err(err) => {
                    log::warn!(
                        "Failed to release partial batch of {} handles for chunk {:?}: {}",
                        returned,
                        self.coordinate.origin(),
                        err
                    );
                    handles
                }
            };
            return Err(SpawnError::PartialBatch {
                requested,
                returned,
                unreleased,
            });
        }

        let count = handles.len();
        self.child_handles = handles;
        self.lifecycle = ChunkLifecycle::Spawned;
        log::trace!(
            "Chunk {:?} spawned with {} blocks",
            self.coordinate.origin(),
            count
        );
        Ok(count)
    }

    /// Hands over the child handles for teardown, leaving none behind.
    pub fn take_child_handles(&mut self) -> Vec<RenderHandle> {
        std::mem::take(&mut self.child_handles)
    }

    fn check_transition(
        &self,
        from: ChunkLifecycle,
        to: ChunkLifecycle,
    ) -> Result<(), LifecycleError> {
        if self.lifecycle == from {
            Ok(())
        } else {
            Err(LifecycleError {
                from: self.lifecycle,
                to,
            })
        }
    }
}

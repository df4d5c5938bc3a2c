//! # Chunk Meshing
//!
//! Decides which blocks of a generated chunk must be rendered.
//!
//! A solid cell is visible when any of its 26 neighbors (faces, edges and
//! corners) is air or lies outside the chunk. Chunks are meshed without
//! looking at neighbor chunks, so a cell on the chunk border always counts as
//! visible: rendering a block that turns out to be hidden is acceptable,
//! dropping one that is actually exposed is not.
//!
//! Output order is the chunk's scan order (`x`, then `y`, then `z` fastest),
//! the same order the flat voxel index runs in.

use crate::{
    engine_state::voxels::chunk::{ChunkCoordinate, ChunkLifecycle, ChunkRecord, ChunkVoxels},
    error::{LifecycleError, SpawnError},
};

use super::{RenderSink, VisibleBlock};

/// The 26 offsets in `{-1, 0, 1}³` minus the origin.
pub const NEIGHBOR_OFFSETS: [(i32, i32, i32); 26] = neighbor_offsets();

const fn neighbor_offsets() -> [(i32, i32, i32); 26] {
    let mut offsets = [(0, 0, 0); 26];
    let mut n = 0;
    let mut dx = -1;
    while dx <= 1 {
        let mut dy = -1;
        while dy <= 1 {
            let mut dz = -1;
            while dz <= 1 {
                if !(dx == 0 && dy == 0 && dz == 0) {
                    offsets[n] = (dx, dy, dz);
                    n += 1;
                }
                dz += 1;
            }
            dy += 1;
        }
        dx += 1;
    }
    offsets
}

/// Whether the cell at a local coordinate has an air or out-of-chunk neighbor.
///
/// Only meaningful for solid cells; the caller skips air.
pub fn is_cell_visible(voxels: &ChunkVoxels, x: i32, y: i32, z: i32) -> bool {
    NEIGHBOR_OFFSETS.iter().any(|&(dx, dy, dz)| {
        match voxels.is_solid(x + dx, y + dy, z + dz) {
            // Border: the neighbor chunk is unknown, assume exposed.
            None => true,
            Some(solid) => !solid,
        }
    })
}

/// Collects every visible block of a chunk in scan order.
pub fn find_visible_blocks(coordinate: ChunkCoordinate, voxels: &ChunkVoxels) -> Vec<VisibleBlock> {
    voxels
        .iter_solid()
        .filter(|(local, _)| is_cell_visible(voxels, local.x, local.y, local.z))
        .map(|(local, block_id)| VisibleBlock {
            block_id,
            position: coordinate.world_position(local),
        })
        .collect()
}

/// Runs the meshing stage on a `Generated` record and commits the result.
///
/// Returns the number of blocks handed to the sink.
pub fn mesh_chunk<S: RenderSink + ?Sized>(
    record: &mut ChunkRecord,
    sink: &mut S,
) -> Result<usize, SpawnError> {
    let voxels = match (record.lifecycle(), record.voxels()) {
        (ChunkLifecycle::Generated, Some(voxels)) => voxels.clone(),
        (from, _) => {
            return Err(LifecycleError {
                from,
                to: ChunkLifecycle::Spawned,
            }
            .into())
        }
    };

    let blocks = find_visible_blocks(record.coordinate(), &voxels);
    record.commit_spawn(blocks, sink)
}

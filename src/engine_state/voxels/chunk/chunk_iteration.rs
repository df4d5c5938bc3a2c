//! # Chunk Iteration Module
//!
//! Iteration over the non-air cells of a chunk. The solidity bit vector lets
//! the iterator jump straight to the next solid cell instead of testing ids.

use cgmath::Point3;

use crate::engine_state::voxels::{addressing::unflatten, block::BlockId};

use super::{ChunkVoxels, CHUNK_SIZE};

/// Yields `(local position, id)` for every solid cell in scan order.
pub struct SolidCells<'a> {
    voxels: &'a ChunkVoxels,
    cursor: usize,
}

impl<'a> SolidCells<'a> {
    pub fn new(voxels: &'a ChunkVoxels) -> Self {
        SolidCells { voxels, cursor: 0 }
    }
}

impl Iterator for SolidCells<'_> {
    type Item = (Point3<i32>, BlockId);

    fn next(&mut self) -> Option<Self::Item> {
        let offset = self.voxels.solid_array[self.cursor..].first_one()?;
        let index = self.cursor + offset;
        self.cursor = index + 1;

        let (x, y, z) = unflatten(index, CHUNK_SIZE);
        Some((Point3::new(x, y, z), self.voxels.blocks[index]))
    }
}

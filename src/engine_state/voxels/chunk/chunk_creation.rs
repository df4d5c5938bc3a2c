//! # Chunk Creation Module
//!
//! Builder that fills a [`ChunkVoxels`] one cell at a time in addressing order
//! while keeping the dense id array and the solidity bit vector in step.

use bitvec::vec::BitVec;

use crate::engine_state::voxels::{
    addressing::volume,
    block::{is_air, BlockId, AIR},
};

use super::{ChunkVoxels, CHUNK_SIZE};

/// Incrementally builds the voxel grid of one chunk.
///
/// Cells must be pushed in flat-index order (`x` slowest, `z` fastest).
pub struct ChunkVoxelsBuilder {
    blocks: Vec<BlockId>,
    solid_array: BitVec,
}

impl ChunkVoxelsBuilder {
    pub fn new() -> Self {
        let cells = volume(CHUNK_SIZE);
        ChunkVoxelsBuilder {
            blocks: Vec::with_capacity(cells),
            solid_array: BitVec::with_capacity(cells),
        }
    }

    /// Number of cells pushed so far.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.blocks.len() == volume(CHUNK_SIZE)
    }

    /// Writes the next cell.
    ///
    /// Pushing past the end of the chunk is ignored.
    pub fn push_block(&mut self, block: BlockId) {
        if self.is_complete() {
            log::warn!("Ignoring block pushed past the end of a chunk");
            return;
        }
        self.blocks.push(block);
        self.solid_array.push(!is_air(block));
    }

    /// Finishes the grid. Any cells never pushed are air.
    pub fn build(mut self) -> ChunkVoxels {
        while !self.is_complete() {
            self.push_block(AIR);
        }
        ChunkVoxels {
            blocks: self.blocks,
            solid_array: self.solid_array,
        }
    }
}

impl Default for ChunkVoxelsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

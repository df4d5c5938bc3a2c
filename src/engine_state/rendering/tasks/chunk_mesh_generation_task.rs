//! Task for finding the visible blocks of a chunk on a worker thread.
//!
//! The task only reads the chunk's frozen voxel grid. Committing the blocks
//! to the sink happens later, on the owning thread, through a `Spawn`
//! command.

use std::sync::Arc;

use crate::engine_state::{
    command_buffer::ChunkCommand,
    rendering::{meshing::find_visible_blocks, VisibleBlock},
    task_management::task::{Task, TaskResult},
    voxels::chunk::{ChunkHandle, ChunkVoxels},
};

/// Meshes one `Generated` chunk.
pub struct ChunkMeshGenerationTask {
    chunk: ChunkHandle,
    voxels: Arc<ChunkVoxels>,
}

impl ChunkMeshGenerationTask {
    pub fn new(chunk: ChunkHandle, voxels: Arc<ChunkVoxels>) -> Self {
        ChunkMeshGenerationTask { chunk, voxels }
    }
}

impl Task for ChunkMeshGenerationTask {
    fn process(&self) -> Box<dyn TaskResult + Send> {
        Box::new(ChunkMeshGenerationTaskResult {
            chunk: self.chunk,
            blocks: find_visible_blocks(self.chunk.coordinate, &self.voxels),
        })
    }
}

/// Visible blocks of one chunk, in scan order.
pub struct ChunkMeshGenerationTaskResult {
    chunk: ChunkHandle,
    blocks: Vec<VisibleBlock>,
}

impl TaskResult for ChunkMeshGenerationTaskResult {
    fn handle_result(self: Box<Self>) -> Vec<ChunkCommand> {
        vec![ChunkCommand::Spawn {
            chunk: self.chunk,
            blocks: self.blocks,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::{
        block::{BlockType, AIR},
        chunk::ChunkCoordinate,
    };

    #[test]
    fn produces_spawn_command_with_visible_blocks() {
        let chunk = ChunkHandle {
            coordinate: ChunkCoordinate::from_grid(0, 0, 0),
            stamp: 1,
        };
        let voxels = Arc::new(ChunkVoxels::from_fn(|_, y, _| {
            if y == 5 {
                BlockType::STONE.id()
            } else {
                AIR
            }
        }));

        let commands = ChunkMeshGenerationTask::new(chunk, voxels).process().handle_result();
        match commands.as_slice() {
            [ChunkCommand::Spawn { chunk: handle, blocks }] => {
                assert_eq!(*handle, chunk);
                assert_eq!(blocks.len(), 256);
            }
            other => panic!("unexpected commands {other:?}"),
        }
    }
}

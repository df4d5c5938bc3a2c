//! # Chunk Generation Task
//!
//! Generates the voxel grid of one `Pending` chunk on a worker thread. The
//! result does not touch the store directly: it becomes an `Install` command
//! applied at the next flush, where the chunk's stamp is checked first.

use std::sync::Arc;

use crate::engine_state::{
    command_buffer::ChunkCommand,
    task_management::task::{Task, TaskResult},
    voxels::{
        chunk::{ChunkHandle, ChunkVoxels},
        generation::generate_voxels,
        terrain::TerrainGenerator,
    },
};

/// A task that generates chunk data asynchronously.
pub struct ChunkGenerationTask {
    /// The chunk to fill, as admitted by the store
    chunk: ChunkHandle,
    /// Shared, immutable terrain
    terrain: Arc<TerrainGenerator>,
}

impl ChunkGenerationTask {
    pub fn new(chunk: ChunkHandle, terrain: Arc<TerrainGenerator>) -> Self {
        ChunkGenerationTask { chunk, terrain }
    }
}

impl Task for ChunkGenerationTask {
    fn process(&self) -> Box<dyn TaskResult + Send> {
        let voxels = generate_voxels(self.chunk.coordinate, &self.terrain);
        Box::new(ChunkGenerationTaskResult {
            chunk: self.chunk,
            voxels: Arc::new(voxels),
        })
    }
}

/// The generated grid, waiting to be installed on the owning thread.
pub struct ChunkGenerationTaskResult {
    chunk: ChunkHandle,
    voxels: Arc<ChunkVoxels>,
}

impl TaskResult for ChunkGenerationTaskResult {
    fn handle_result(self: Box<Self>) -> Vec<ChunkCommand> {
        vec![ChunkCommand::Install {
            chunk: self.chunk,
            voxels: self.voxels,
        }]
    }
}

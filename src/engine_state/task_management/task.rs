//! # Task System Core Traits
//!
//! ## Task Lifecycle
//! 1. A `Task` is created and scheduled via `TaskManager::publish_task()`
//! 2. The task's `process()` method is called on a worker thread
//! 3. The task returns a boxed `TaskResult`
//! 4. The result's `handle_result()` is called on the thread owning the manager
//! 5. The resulting commands are written into the engine's `CommandBuffer` and
//!    applied at the next flush
//!
//! Tasks own everything they read (a chunk handle, an `Arc` of voxels, an
//! `Arc` of the terrain generator). They never touch the chunk store, which
//! is what keeps the store single-writer.

use crate::engine_state::command_buffer::ChunkCommand;

/// A unit of CPU work executed off the owning thread.
pub trait Task: Send {
    /// Performs the work. Runs on a worker thread and must not block.
    fn process(&self) -> Box<dyn TaskResult + Send>;
}

/// Output of a [`Task`], consumed on the owning thread.
pub trait TaskResult: Send {
    /// Turns the result into commands for the next command-buffer flush.
    fn handle_result(self: Box<Self>) -> Vec<ChunkCommand>;
}

//! # Voxel Tasks
//!
//! Worker-side tasks of the voxel pipeline.

pub mod chunk_generation_task;

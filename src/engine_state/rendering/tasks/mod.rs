//! Background tasks for the rendering side of the pipeline.

pub mod chunk_mesh_generation_task;

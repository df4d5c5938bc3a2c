//! # Errors
//!
//! Error types surfaced by the streaming pipeline. Addressing and terrain
//! generation are pure and cannot fail; everything here comes from the edges
//! of the system (configuration files, the render sink) or from stale work
//! trying to move a chunk through its lifecycle out of order.

use std::path::PathBuf;

use thiserror::Error;

use crate::engine_state::{rendering::RenderHandle, voxels::chunk::ChunkLifecycle};

/// Failure to load or validate a [`WorldConfig`](crate::config::WorldConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{name} must be a positive finite distance, got {value}")]
    InvalidRadius { name: &'static str, value: f32 },

    #[error(
        "degeneration radius ({degeneration}) must not be smaller than generation radius ({generation})"
    )]
    RadiusOrdering { generation: f32, degeneration: f32 },
}

/// Failure reported by the render sink.
///
/// Neither variant is fatal: the streamer keeps the affected chunk (or the
/// affected handles) around and retries on the next reconciliation pass.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The sink could not allocate render resources for a batch.
    #[error("sink could not allocate {requested} instances: {reason}")]
    Allocation { requested: usize, reason: String },

    /// The sink refused the request outright.
    #[error("sink rejected request: {0}")]
    Rejected(String),
}

/// A lifecycle transition that would skip or reverse a state.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("invalid chunk transition from {from:?} to {to:?}")]
pub struct LifecycleError {
    pub from: ChunkLifecycle,
    pub to: ChunkLifecycle,
}

/// Failure while committing a meshed chunk to the sink.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpawnError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    /// The sink answered with the wrong number of handles for a batch.
    ///
    /// `unreleased` holds whatever part of that batch the sink also failed to
    /// take back; the caller owns those handles and must release them later.
    #[error("sink returned {returned} handles for {requested} blocks")]
    PartialBatch {
        requested: usize,
        returned: usize,
        unreleased: Vec<RenderHandle>,
    },
}

impl SpawnError {
    /// Handles the caller now has to release, if any.
    pub fn into_unreleased(self) -> Vec<RenderHandle> {
        match self {
            SpawnError::PartialBatch { unreleased, .. } => unreleased,
            _ => Vec::new(),
        }
    }
}

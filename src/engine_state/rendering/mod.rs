//! Rendering boundary of the streaming pipeline.
//!
//! The engine never draws anything itself. Meshing decides which blocks are
//! visible and hands them to a [`RenderSink`], which turns each one into
//! whatever the surrounding renderer uses (an entity, an instance slot, ...)
//! and returns an opaque [`RenderHandle`] per block. The chunk keeps those
//! handles so it can release them again on eviction.

use cgmath::Point3;

use super::voxels::{block::BlockId, chunk::ChunkCoordinate};
use crate::error::SinkError;

pub use instance_sink::{material_name, InstanceSink};

mod instance_sink;
pub mod meshing;
pub mod tasks;

/// Opaque reference to one render-side instance created by a sink.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderHandle(pub u64);

/// A block that must be rendered, in world space.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VisibleBlock {
    pub block_id: BlockId,
    pub position: Point3<i32>,
}

/// Receiver of spawn and despawn requests.
///
/// A spawn call carries all visible blocks of one chunk. Implementations must
/// either accept the whole batch, returning exactly one handle per block in
/// the same order, or fail without keeping anything.
///
/// Despawning a handle the sink no longer knows about is not an error: the
/// sink should log it and carry on.
pub trait RenderSink {
    fn spawn(
        &mut self,
        chunk: ChunkCoordinate,
        blocks: &[VisibleBlock],
    ) -> Result<Vec<RenderHandle>, SinkError>;

    fn despawn(&mut self, handles: &[RenderHandle]) -> Result<(), SinkError>;
}

impl<S: RenderSink + ?Sized> RenderSink for Box<S> {
    fn spawn(
        &mut self,
        chunk: ChunkCoordinate,
        blocks: &[VisibleBlock],
    ) -> Result<Vec<RenderHandle>, SinkError> {
        (**self).spawn(chunk, blocks)
    }

    fn despawn(&mut self, handles: &[RenderHandle]) -> Result<(), SinkError> {
        (**self).despawn(handles)
    }
}

//! In-memory [`RenderSink`] that keeps one instance record per handle.
//!
//! Used by the headless driver and by tests. It resolves each block id to a
//! material the way a real renderer would pick a mesh/material pair, and can
//! be given an instance capacity to exercise allocation failures.

use std::collections::HashMap;

use cgmath::Point3;

use super::{RenderHandle, RenderSink, VisibleBlock};
use crate::{
    engine_state::voxels::{
        block::{BlockId, BlockType},
        chunk::ChunkCoordinate,
    },
    error::SinkError,
};

/// Material used for ids without a dedicated one.
pub const DEFAULT_MATERIAL: &str = "default";

/// Material name for a block id.
pub fn material_name(block_id: BlockId) -> &'static str {
    BlockType::from_id(block_id).map_or(DEFAULT_MATERIAL, BlockType::name)
}

/// One spawned instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub chunk: ChunkCoordinate,
    pub block_id: BlockId,
    pub material: &'static str,
    pub position: Point3<i32>,
}

#[derive(Debug, Default)]
pub struct InstanceSink {
    instances: HashMap<RenderHandle, Instance>,
    next_handle: u64,
    capacity: Option<usize>,
    fail_despawn: bool,
    batches_spawned: usize,
    despawn_batches: Vec<Vec<RenderHandle>>,
    stale_releases: usize,
}

impl InstanceSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that refuses batches which would exceed `capacity` live instances.
    pub fn with_capacity(capacity: usize) -> Self {
        InstanceSink {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    pub fn set_capacity(&mut self, capacity: Option<usize>) {
        self.capacity = capacity;
    }

    /// Makes every despawn call fail until cleared.
    pub fn set_despawn_failure(&mut self, fail: bool) {
        self.fail_despawn = fail;
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn instance(&self, handle: RenderHandle) -> Option<&Instance> {
        self.instances.get(&handle)
    }

    pub fn contains(&self, handle: RenderHandle) -> bool {
        self.instances.contains_key(&handle)
    }

    /// Number of live instances belonging to `chunk`.
    pub fn instances_in(&self, chunk: ChunkCoordinate) -> usize {
        self.instances.values().filter(|i| i.chunk == chunk).count()
    }

    pub fn batches_spawned(&self) -> usize {
        self.batches_spawned
    }

    /// Every successful despawn call, in order.
    pub fn despawn_batches(&self) -> &[Vec<RenderHandle>] {
        &self.despawn_batches
    }

    /// Handles that were despawned but not (or no longer) known.
    pub fn stale_releases(&self) -> usize {
        self.stale_releases
    }
}

impl RenderSink for InstanceSink {
    fn spawn(
        &mut self,
        chunk: ChunkCoordinate,
        blocks: &[VisibleBlock],
    ) -> Result<Vec<RenderHandle>, SinkError> {
        if let Some(capacity) = self.capacity {
            let available = capacity.saturating_sub(self.instances.len());
            if blocks.len() > available {
                return Err(SinkError::Allocation {
                    requested: blocks.len(),
                    reason: format!("only {available} of {capacity} instance slots free"),
                });
            }
        }

        let handles = blocks
            .iter()
            .map(|block| {
                let handle = RenderHandle(self.next_handle);
                self.next_handle += 1;
                self.instances.insert(
                    handle,
                    Instance {
                        chunk,
                        block_id: block.block_id,
                        material: material_name(block.block_id),
                        position: block.position,
                    },
                );
                handle
            })
            .collect();

        self.batches_spawned += 1;
        Ok(handles)
    }

    fn despawn(&mut self, handles: &[RenderHandle]) -> Result<(), SinkError> {
        if self.fail_despawn {
            return Err(SinkError::Rejected("despawn disabled".to_string()));
        }

        for handle in handles {
            if self.instances.remove(handle).is_none() {
                log::warn!("Ignoring despawn of unknown render handle {:?}", handle);
                self.stale_releases += 1;
            }
        }
        self.despawn_batches.push(handles.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::block::AIR;

    fn block(id: BlockId, x: i32) -> VisibleBlock {
        VisibleBlock {
            block_id: id,
            position: Point3::new(x, 0, 0),
        }
    }

    #[test]
    fn materials_by_id() {
        assert_eq!(material_name(0), "grass");
        assert_eq!(material_name(1), "stone");
        assert_eq!(material_name(4), "bedrock");
        assert_eq!(material_name(6), "leaves");
        assert_eq!(material_name(9), DEFAULT_MATERIAL);
        assert_eq!(material_name(AIR), DEFAULT_MATERIAL);
    }

    #[test]
    fn spawn_returns_one_handle_per_block() {
        let mut sink = InstanceSink::new();
        let chunk = ChunkCoordinate::from_grid(0, 0, 0);
        let handles = sink.spawn(chunk, &[block(1, 0), block(3, 1)]).unwrap();

        assert_eq!(handles.len(), 2);
        assert_ne!(handles[0], handles[1]);
        assert_eq!(sink.instance(handles[1]).unwrap().material, "sand");
        assert_eq!(sink.instances_in(chunk), 2);
    }

    #[test]
    fn capacity_rejects_whole_batch() {
        let mut sink = InstanceSink::with_capacity(1);
        let chunk = ChunkCoordinate::from_grid(0, 0, 0);
        let err = sink.spawn(chunk, &[block(1, 0), block(1, 1)]).unwrap_err();
        assert!(matches!(err, SinkError::Allocation { requested: 2, .. }));
        assert_eq!(sink.instance_count(), 0);
        assert_eq!(sink.batches_spawned(), 0);
    }

    #[test]
    fn stale_despawn_is_ignored() {
        let mut sink = InstanceSink::new();
        let chunk = ChunkCoordinate::from_grid(0, 0, 0);
        let handles = sink.spawn(chunk, &[block(1, 0)]).unwrap();

        sink.despawn(&handles).unwrap();
        sink.despawn(&handles).unwrap();
        assert_eq!(sink.instance_count(), 0);
        assert_eq!(sink.stale_releases(), 1);
    }
}

//! # Block Type Module
//!
//! The materials terrain generation can emit. The discriminants are the
//! [`BlockId`] values written into chunk voxels and handed to the render sink,
//! so their order is part of the sink contract.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use super::BlockId;

/// Enumerates every solid material in the world.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive)]
#[repr(i16)]
pub enum BlockType {
    /// Top layer of land columns.
    GRASS = 0,
    /// Deep fill between the dirt band and bedrock.
    STONE = 1,
    /// The band a few blocks under the surface.
    DIRT = 2,
    /// Beaches and deserts.
    SAND = 3,
    /// Floor of the world at `y == 0`.
    BEDROCK = 4,
    /// Tree trunks.
    WOOD = 5,
    /// Tree canopies.
    LEAVES = 6,
}

impl BlockType {
    /// All materials in id order.
    pub const ALL: [BlockType; 7] = [
        BlockType::GRASS,
        BlockType::STONE,
        BlockType::DIRT,
        BlockType::SAND,
        BlockType::BEDROCK,
        BlockType::WOOD,
        BlockType::LEAVES,
    ];

    /// The id stored in voxel arrays for this material.
    #[inline]
    pub fn id(self) -> BlockId {
        self as BlockId
    }

    /// Looks up the material for an id. Air and unknown ids yield `None`.
    pub fn from_id(id: BlockId) -> Option<Self> {
        FromPrimitive::from_i16(id)
    }

    /// Lowercase material name, as used for render material lookup.
    pub fn name(self) -> &'static str {
        match self {
            BlockType::GRASS => "grass",
            BlockType::STONE => "stone",
            BlockType::DIRT => "dirt",
            BlockType::SAND => "sand",
            BlockType::BEDROCK => "bedrock",
            BlockType::WOOD => "wood",
            BlockType::LEAVES => "leaves",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::block::{is_valid_id, AIR};

    #[test]
    fn ids_round_trip() {
        for (expected, block) in BlockType::ALL.iter().enumerate() {
            assert_eq!(block.id(), expected as BlockId);
            assert_eq!(BlockType::from_id(block.id()), Some(*block));
        }
    }

    #[test]
    fn air_and_unknown_ids_have_no_type() {
        assert_eq!(BlockType::from_id(AIR), None);
        assert_eq!(BlockType::from_id(7), None);
        assert!(is_valid_id(AIR));
        assert!(!is_valid_id(-2));
        assert!(!is_valid_id(42));
    }
}

//! # Block Module
//!
//! Voxel cells store a bare [`BlockId`]. The id space is small and signed so
//! that air can be represented by the `-1` sentinel without an extra tag.

pub mod block_type;

pub use block_type::BlockType;

/// Material identifier stored in each voxel cell.
///
/// `-1` ([`AIR`]) means "no block"; `0..` are material ids, see [`BlockType`].
pub type BlockId = i16;

/// Sentinel id for an empty cell.
pub const AIR: BlockId = -1;

/// Returns `true` when `id` denotes an empty cell.
#[inline]
pub fn is_air(id: BlockId) -> bool {
    id == AIR
}

/// Returns `true` when `id` is either air or a known material.
pub fn is_valid_id(id: BlockId) -> bool {
    is_air(id) || BlockType::from_id(id).is_some()
}

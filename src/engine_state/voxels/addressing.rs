//! # Voxel Addressing
//!
//! Mapping between in-chunk `(x, y, z)` coordinates and indices into a dense,
//! flat voxel array.
//!
//! The layout is row-major with `z` fastest:
//!
//! ```text
//! index = z + y * size + x * size * size
//! ```
//!
//! Walking indices `0..size³` therefore visits cells in the same order as the
//! triple loop `for x { for y { for z { .. } } }`, which is the scan order the
//! meshing stage emits visible blocks in.

/// Flattens a local coordinate into an array index.
///
/// Returns `None` when any axis lies outside `[0, size)`. Callers use this as
/// the "is this neighbor inside the chunk" test, so it never panics.
#[inline]
pub fn flatten(x: i32, y: i32, z: i32, size: i32) -> Option<usize> {
    if !in_bounds(x, size) || !in_bounds(y, size) || !in_bounds(z, size) {
        return None;
    }
    Some((z + y * size + x * size * size) as usize)
}

/// Inverse of [`flatten`] for any index in `[0, size³)`.
#[inline]
pub fn unflatten(index: usize, size: i32) -> (i32, i32, i32) {
    let size = size as usize;
    let x = index / (size * size);
    let y = (index / size) % size;
    let z = index % size;
    (x as i32, y as i32, z as i32)
}

/// Number of cells in a cube of side `size`.
#[inline]
pub const fn volume(size: i32) -> usize {
    (size * size * size) as usize
}

#[inline]
fn in_bounds(v: i32, size: i32) -> bool {
    (0..size).contains(&v)
}

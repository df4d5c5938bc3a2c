//! # Voxel Pipeline
//!
//! Chunk data and the stages that produce it.
//!
//! ## Architecture
//!
//! * **Addressing**: maps local `(x, y, z)` cells to flat indices and back
//! * **Block**: block ids and the known materials
//! * **Terrain**: stateless noise terrain, one `BlockId` per world coordinate
//! * **Chunk**: coordinates, voxel grids and per-chunk records
//! * **Store**: the sparse set of live chunks
//! * **Streamer**: admits and evicts chunks around the observer
//! * **Generation** and **Tasks**: fill `Pending` chunks, inline or on workers
//!
//! ## Data Flow
//!
//! 1. The streamer admits a coordinate into the store as `Pending`
//! 2. A generation task samples the terrain for every cell of the chunk
//! 3. The grid is installed at the next flush and the chunk becomes `Generated`
//! 4. Meshing (see `rendering`) turns it into visible blocks and spawns them
//! 5. When the observer moves away the streamer releases the chunk's handles
//!    and drops the record

pub mod addressing;
pub mod block;
pub mod chunk;
pub mod generation;
pub mod store;
pub mod streamer;
pub mod tasks;
pub mod terrain;

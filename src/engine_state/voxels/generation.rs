//! # Chunk Generation
//!
//! Fills a chunk's voxel grid from the terrain generator.
//!
//! Every cell is independent of every other cell and of neighboring chunks,
//! so chunks can be generated on any worker in any order. The terrain is
//! sampled once per `(x, z)` column and each column's 16 cells are classified
//! from that sample.

use std::sync::Arc;

use crate::error::LifecycleError;

use super::{
    chunk::{ChunkCoordinate, ChunkRecord, ChunkVoxels, ChunkVoxelsBuilder, CHUNK_SIZE},
    terrain::{ColumnSample, TerrainGenerator},
};

/// Generates the voxel grid for the chunk at `coordinate`.
///
/// Cells are written in flat-index order, so the grid matches
/// `terrain.generate` at `origin + (x, y, z)` for every local cell.
pub fn generate_voxels(coordinate: ChunkCoordinate, terrain: &TerrainGenerator) -> ChunkVoxels {
    let origin = coordinate.origin();

    let columns: Vec<ColumnSample> = (0..CHUNK_SIZE)
        .flat_map(|x| (0..CHUNK_SIZE).map(move |z| (x, z)))
        .map(|(x, z)| terrain.sample_column(origin.x + x, origin.z + z))
        .collect();

    let mut builder = ChunkVoxelsBuilder::new();
    for x in 0..CHUNK_SIZE {
        for y in 0..CHUNK_SIZE {
            for z in 0..CHUNK_SIZE {
                let column = &columns[(x * CHUNK_SIZE + z) as usize];
                builder.push_block(column.classify(origin.y + y));
            }
        }
    }
    builder.build()
}

/// Runs the generation stage on a `Pending` record in place.
pub fn generate_chunk(record: &mut ChunkRecord, terrain: &TerrainGenerator) -> Result<(), LifecycleError> {
    let voxels = generate_voxels(record.coordinate(), terrain);
    record.install_voxels(Arc::new(voxels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::{
        block::{is_valid_id, AIR},
        chunk::{ChunkLifecycle, CHUNK_VOLUME},
    };

    #[test]
    fn every_cell_is_air_or_a_material() {
        let terrain = TerrainGenerator::new(7);
        for coordinate in [
            ChunkCoordinate::from_grid(0, 0, 0),
            ChunkCoordinate::from_grid(3, 1, -2),
            ChunkCoordinate::from_grid(-1, -1, 0),
        ] {
            let voxels = generate_voxels(coordinate, &terrain);
            assert_eq!(voxels.blocks().len(), CHUNK_VOLUME);
            assert!(voxels.blocks().iter().all(|&id| id == AIR || is_valid_id(id)));
        }
    }

    #[test]
    fn matches_point_queries() {
        let terrain = TerrainGenerator::new(42);
        let coordinate = ChunkCoordinate::from_grid(2, 0, -3);
        let voxels = generate_voxels(coordinate, &terrain);
        let origin = coordinate.origin();

        for (x, y, z) in [(0, 0, 0), (15, 15, 15), (3, 7, 11), (8, 0, 2), (15, 1, 0)] {
            assert_eq!(
                voxels.get(x, y, z),
                Some(terrain.generate(origin.x + x, origin.y + y, origin.z + z))
            );
        }
    }

    #[test]
    fn below_world_is_air() {
        let voxels = generate_voxels(ChunkCoordinate::from_grid(0, -1, 0), &TerrainGenerator::new(1));
        assert_eq!(voxels.solid_count(), 0);
    }

    #[test]
    fn deterministic_across_calls() {
        let coordinate = ChunkCoordinate::from_grid(1, 1, 1);
        let a = generate_voxels(coordinate, &TerrainGenerator::new(5));
        let b = generate_voxels(coordinate, &TerrainGenerator::new(5));
        assert_eq!(a, b);
    }

    #[test]
    fn generate_chunk_transitions_once() {
        let terrain = TerrainGenerator::default();
        let mut record = ChunkRecord::new(ChunkCoordinate::from_grid(0, 0, 0), 1);

        generate_chunk(&mut record, &terrain).unwrap();
        assert_eq!(record.lifecycle(), ChunkLifecycle::Generated);
        assert_eq!(record.voxels().map(|v| v.blocks().len()), Some(CHUNK_VOLUME));

        assert!(generate_chunk(&mut record, &terrain).is_err());
    }
}

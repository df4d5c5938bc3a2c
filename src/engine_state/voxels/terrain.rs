//! # Terrain Generation
//!
//! A stateless mapping from a world-space block coordinate to a [`BlockId`].
//!
//! Each `(x, z)` column is described by a handful of layered 2D Perlin samples:
//! biome strengths (mountain, desert, ocean, detail) decide a surface height,
//! and two fine-grained samples drive tree placement. The `y` coordinate is
//! then classified against that column:
//!
//! ```text
//!   y > h            air, or wood/leaves where the tree overlay fires
//!   y == h, h > 2    grass (sand on beaches and in deserts)
//!   h-6 <= y < h     dirt  (sand in deserts), only when h > 6
//!   0 < y            stone
//!   y == 0           bedrock
//!   y < 0            air
//! ```
//!
//! The generator holds nothing but the immutable noise permutation table, so
//! it can be shared across worker threads and queried in any order.

use noise::{NoiseFn, Perlin};

use super::block::{BlockId, BlockType, AIR};

const MOUNTAIN_HEIGHT_SCALE: f64 = 150.0;
const MOUNTAIN_BIOME_SCALE: f64 = 100.0;
const DESERT_BIOME_SCALE: f64 = 300.0;
const DESERT_JITTER_SCALE: f64 = 25.0;
const OCEAN_BIOME_SCALE: f64 = 500.0;
const DETAIL_HEIGHT_SCALE: f64 = 20.0;
const DETAIL_BIOME_SCALE: f64 = 30.0;
const TRUNK_SCALE: f64 = 0.3543;
const LEAVES_SCALE: f64 = 5.0;

const MOUNTAIN_AMPLITUDE: f64 = 40.0;
const DETAIL_AMPLITUDE: f64 = 5.0;
const BASE_HEIGHT: f64 = 20.0;

/// Biome strengths below this keep trees out.
const TREE_BIOME_LIMIT: f64 = 0.4;
/// Columns must be strictly taller than this to grow trees.
const TREE_MIN_HEIGHT: i32 = 15;
const TRUNK_THRESHOLD: f64 = 0.75;
const TRUNK_LEAVES_CUTOFF: f64 = 0.925;
const TRUNK_HEIGHT: i32 = 5;
const CANOPY_OFFSET: i32 = 7;
const CANOPY_RADIUS: f64 = 5.0;
const LEAVES_THRESHOLD: f64 = 0.25;

const DESERT_SAND_THRESHOLD: f64 = 0.5;
const BEACH_OCEAN_THRESHOLD: f64 = 0.1;
const BEACH_MAX_HEIGHT: i32 = 16;
const DIRT_DEPTH: i32 = 6;

/// Everything the classifier needs to know about one `(x, z)` column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnSample {
    /// Floored surface height.
    pub height: i32,
    /// Desert strength in `[0, 1.05]`.
    pub desert: f64,
    /// Ocean strength in `[0, 1]`.
    pub ocean: f64,
    /// Trunk noise in `[0, 1]`.
    pub trunk: f64,
    /// Leaves noise in `[0, 1]`.
    pub leaves: f64,
}

/// Deterministic layered-noise terrain.
#[derive(Clone)]
pub struct TerrainGenerator {
    seed: u32,
    perlin: Perlin,
}

impl TerrainGenerator {
    pub fn new(seed: u32) -> Self {
        TerrainGenerator {
            seed,
            perlin: Perlin::new(seed),
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Block at a world coordinate.
    pub fn generate(&self, x: i32, y: i32, z: i32) -> BlockId {
        self.sample_column(x, z).classify(y)
    }

    /// Samples every noise layer for a column.
    ///
    /// The generation stage calls this once per column and classifies all
    /// the column's cells from the result.
    pub fn sample_column(&self, x: i32, z: i32) -> ColumnSample {
        let x = x as f64;
        let z = z as f64;

        let mountain_contrib =
            remap(self.noise01(x, z, MOUNTAIN_HEIGHT_SCALE), 0.33, 0.66, 0.0, 1.0) * MOUNTAIN_AMPLITUDE;
        let detail_contrib =
            remap(self.noise01(x, z, DETAIL_HEIGHT_SCALE), 0.0, 1.0, -1.0, 1.0) * DETAIL_AMPLITUDE;

        let detail = remap(self.noise01(x, z, DETAIL_BIOME_SCALE), 0.33, 0.66, 0.0, 1.0);
        let mountain = remap(self.noise01(x, z, MOUNTAIN_BIOME_SCALE), 0.33, 0.66, 0.0, 1.0);
        let desert = remap(self.noise01(x, z, DESERT_BIOME_SCALE), 0.33, 0.66, 0.0, 1.0)
            * remap(self.noise01(x, z, DESERT_JITTER_SCALE), 0.33, 0.66, 0.95, 1.05);
        let ocean = remap(self.noise01(x, z, OCEAN_BIOME_SCALE), 0.33, 0.66, 0.0, 1.0);

        let detail_height = detail_contrib * detail;
        let mountain_height = mountain_contrib * mountain + detail_height + BASE_HEIGHT;
        // Deserts are flat: no large-scale contribution of their own.
        let desert_height = detail_height + BASE_HEIGHT;
        // Ocean floor sits at zero.
        let ocean_height = 0.0;

        // Ocean is blended last so a strong ocean overrides the other biomes.
        let height = lerp(mountain_height, desert_height, desert);
        let height = lerp(height, ocean_height, ocean);

        ColumnSample {
            height: height.floor() as i32,
            desert,
            ocean,
            trunk: self.noise01(x, z, TRUNK_SCALE),
            leaves: self.noise01(x, z, LEAVES_SCALE),
        }
    }

    /// Perlin noise at `(x / scale, z / scale)`, moved from `[-1, 1]` to `[0, 1]`.
    fn noise01(&self, x: f64, z: f64, scale: f64) -> f64 {
        let value = self.perlin.get([x / scale, z / scale]);
        (value * 0.5 + 0.5).clamp(0.0, 1.0)
    }
}

impl Default for TerrainGenerator {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ColumnSample {
    /// Classifies height `y` within this column.
    pub fn classify(&self, y: i32) -> BlockId {
        let h = self.height;

        if y > h {
            return self.tree_at(y).map_or(AIR, BlockType::id);
        }
        if y < 0 {
            return AIR;
        }

        let in_desert = self.desert >= DESERT_SAND_THRESHOLD;
        let block = if y == h && h > 2 {
            if (self.ocean >= BEACH_OCEAN_THRESHOLD && h < BEACH_MAX_HEIGHT) || in_desert {
                BlockType::SAND
            } else {
                BlockType::GRASS
            }
        } else if y >= h - DIRT_DEPTH && h > DIRT_DEPTH {
            if in_desert {
                BlockType::SAND
            } else {
                BlockType::DIRT
            }
        } else if y > 0 {
            BlockType::STONE
        } else {
            BlockType::BEDROCK
        };
        block.id()
    }

    /// Tree overlay for cells above the surface.
    fn tree_at(&self, y: i32) -> Option<BlockType> {
        let h = self.height;
        if h <= TREE_MIN_HEIGHT || self.ocean >= TREE_BIOME_LIMIT || self.desert >= TREE_BIOME_LIMIT {
            return None;
        }

        if self.trunk >= TRUNK_THRESHOLD && y <= h + TRUNK_HEIGHT {
            return Some(BlockType::WOOD);
        }

        let canopy_distance = (y - (h + CANOPY_OFFSET)).abs() as f64;
        let falloff = (1.0 - canopy_distance / CANOPY_RADIUS).clamp(0.0, 1.0);
        if self.leaves * falloff >= LEAVES_THRESHOLD && self.trunk <= TRUNK_LEAVES_CUTOFF {
            return Some(BlockType::LEAVES);
        }
        None
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

fn inverse_lerp(a: f64, b: f64, value: f64) -> f64 {
    if a == b {
        return 0.0;
    }
    ((value - a) / (b - a)).clamp(0.0, 1.0)
}

/// Maps `value` from `[in_min, in_max]` to `[out_min, out_max]`, clamping.
fn remap(value: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    lerp(out_min, out_max, inverse_lerp(in_min, in_max, value))
}

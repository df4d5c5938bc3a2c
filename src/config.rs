//! # Configuration
//!
//! World settings are plain serde structs. Every field has a default, so an
//! empty JSON object is a valid configuration and partial files only override
//! what they mention.
//!
//! ```text
//! {
//!     "seed": 42,
//!     "worker_count": 4,
//!     "streaming": {
//!         "generation_radius": 128.0,
//!         "degeneration_radius": 150.0,
//!         "evict_unspawned": false
//!     }
//! }
//! ```

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default distance within which missing chunks are admitted.
pub const DEFAULT_GENERATION_RADIUS: f32 = 128.0;
/// Default distance beyond which spawned chunks are torn down.
pub const DEFAULT_DEGENERATION_RADIUS: f32 = 150.0;
/// Default number of worker threads.
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// Top level configuration for a streamed world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Seed fed to the terrain noise.
    pub seed: u32,
    /// Worker threads used for generation and meshing. Zero runs every task
    /// inline on the thread that pumps the task manager.
    pub worker_count: usize,
    /// Admission/eviction radii.
    pub streaming: StreamingConfig,
}

/// Radii driving chunk admission and eviction.
///
/// Both radii are compared as squared Euclidean distances between the
/// observer and a chunk's grid origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    pub generation_radius: f32,
    pub degeneration_radius: f32,
    /// Also evict chunks that have not reached `Spawned` yet.
    pub evict_unspawned: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            worker_count: DEFAULT_WORKER_COUNT,
            streaming: StreamingConfig::default(),
        }
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            generation_radius: DEFAULT_GENERATION_RADIUS,
            degeneration_radius: DEFAULT_DEGENERATION_RADIUS,
            evict_unspawned: false,
        }
    }
}

impl WorldConfig {
    /// Parses and validates a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: WorldConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&contents)?;
        log::info!("Loaded world config from {}", path.display());
        Ok(config)
    }

    /// Checks the invariants the streamer relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.streaming.validate()
    }
}

impl StreamingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_radius("generation_radius", self.generation_radius)?;
        check_radius("degeneration_radius", self.degeneration_radius)?;

        // Hysteresis: a chunk admitted this pass must never be evicted by the same pass.
        if self.degeneration_radius < self.generation_radius {
            return Err(ConfigError::RadiusOrdering {
                generation: self.generation_radius,
                degeneration: self.degeneration_radius,
            });
        }
        Ok(())
    }
}

fn check_radius(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidRadius { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_object_uses_defaults() {
        let config = WorldConfig::from_json_str("{}").unwrap();
        assert_eq!(config, WorldConfig::default());
        assert_eq!(config.streaming.generation_radius, 128.0);
        assert_eq!(config.streaming.degeneration_radius, 150.0);
    }

    #[test]
    fn partial_streaming_section_keeps_other_defaults() {
        let config =
            WorldConfig::from_json_str(r#"{ "seed": 9, "streaming": { "generation_radius": 32.0 } }"#)
                .unwrap();
        assert_eq!(config.seed, 9);
        assert_eq!(config.worker_count, DEFAULT_WORKER_COUNT);
        assert_eq!(config.streaming.generation_radius, 32.0);
        assert_eq!(config.streaming.degeneration_radius, DEFAULT_DEGENERATION_RADIUS);
    }

    #[test]
    fn rejects_degeneration_inside_generation() {
        let err = WorldConfig::from_json_str(
            r#"{ "streaming": { "generation_radius": 64.0, "degeneration_radius": 32.0 } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::RadiusOrdering { .. }));
    }

    #[test]
    fn rejects_non_positive_radius() {
        let err =
            WorldConfig::from_json_str(r#"{ "streaming": { "generation_radius": 0.0 } }"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidRadius {
                name: "generation_radius",
                ..
            }
        ));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = WorldConfig::from_json_str("{ seed: ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "worker_count": 0, "seed": 3 }}"#).unwrap();

        let config = WorldConfig::load(file.path()).unwrap();
        assert_eq!(config.worker_count, 0);
        assert_eq!(config.seed, 3);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = WorldConfig::load("/definitely/not/here.json").unwrap_err();
        match err {
            ConfigError::Io { path, .. } => assert!(path.ends_with("here.json")),
            other => panic!("unexpected error {other:?}"),
        }
    }
}

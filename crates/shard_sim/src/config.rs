//! Shard configuration.
//!
//! Loaded from a JSON file. Every field has a default, so an empty object
//! (or no file at all) describes a playable shard.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shard_model::SectorSpec;
use shard_net::Wormholes;

/// The environment variable naming the configuration file.
pub const SHARD_CONFIG_ENV: &str = "SHARD_CONFIG";

/// Default shard name.
pub const DEFAULT_SHARD_NAME: &str = "shard";

/// Errors raised while loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Durations of the simulated processes, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Timings {
    /// Added to a travel whose destination is another system.
    pub system_travel_secs: u64,
    /// Added to a travel that lands on a different planet.
    pub planet_travel_secs: u64,
    /// Time for a builder to finish a building.
    pub construction_secs: u64,
    /// Interval between two extractions of a mine.
    pub extraction_period_secs: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            system_travel_secs: 60,
            planet_travel_secs: 15,
            construction_secs: 300,
            extraction_period_secs: 60,
        }
    }
}

impl Timings {
    #[must_use]
    pub fn system_travel(&self) -> Duration {
        Duration::from_secs(self.system_travel_secs)
    }

    #[must_use]
    pub fn planet_travel(&self) -> Duration {
        Duration::from_secs(self.planet_travel_secs)
    }

    #[must_use]
    pub fn construction(&self) -> Duration {
        Duration::from_secs(self.construction_secs)
    }

    #[must_use]
    pub fn extraction_period(&self) -> Duration {
        Duration::from_secs(self.extraction_period_secs)
    }
}

/// Configuration of one shard process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShardConfig {
    /// Name of this shard, as known to its peers.
    pub name: String,
    /// How to build the sector.
    pub sector: SectorSpec,
    /// Shards reachable through wormholes.
    pub wormholes: Wormholes,
    /// Process durations.
    pub timings: Timings,
}

impl Default for ShardConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_SHARD_NAME.to_string(),
            sector: SectorSpec::default(),
            wormholes: Wormholes::new(),
            timings: Timings::default(),
        }
    }
}

impl ShardConfig {
    /// Parse a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `path`, else from the file named by `SHARD_CONFIG`, else
    /// fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a named file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => match std::env::var_os(SHARD_CONFIG_ENV) {
                Some(path) => Self::from_file(PathBuf::from(path)),
                None => Ok(Self::default()),
            },
        }
    }

    /// Override the shard name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Override the sector.
    #[must_use]
    pub fn with_sector(mut self, sector: SectorSpec) -> Self {
        self.sector = sector;
        self
    }

    /// Override the wormhole directory.
    #[must_use]
    pub fn with_wormholes(mut self, wormholes: Wormholes) -> Self {
        self.wormholes = wormholes;
        self
    }
}

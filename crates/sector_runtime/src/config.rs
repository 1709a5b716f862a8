//! # Engine Configuration
//!
//! Everything the runtime needs to size its regions and shape its dispatches.
//! Every section has a default, so a config file only names what it changes:
//!
//! ```toml
//! [capacity.core]
//! entity = 20000
//!
//! [scan]
//! block_size = 512
//!
//! [runtime]
//! verify_integrity = true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use sector_core::config::{core_capacity, transfer_capacity};
use sector_core::{CompactConfig, FamilyCounts, ScanConfig, SectorError};

/// Default bound of each streaming channel, in batches.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Default tick budget (60 ticks per second).
pub const DEFAULT_TICK_BUDGET_US: u64 = 16_666;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The text is not valid TOML for [`EngineConfig`].
    #[error("parse error: {0}")]
    Parse(String),

    /// The config could not be written back out.
    #[error("serialization error: {0}")]
    Serialize(String),

    /// Scan or dispatch sizes were rejected by the core.
    #[error("invalid dispatch settings: {0}")]
    Dispatch(#[from] SectorError),

    /// A runtime setting is out of range.
    #[error("invalid runtime setting {field}: {reason}")]
    Invalid {
        /// Offending key.
        field: &'static str,
        /// What the value must satisfy.
        reason: &'static str,
    },
}

/// Initial buffer capacities. Buffers grow past these on demand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityConfig {
    /// The active region and its render mirror.
    #[serde(deserialize_with = "core_section")]
    pub core: FamilyCounts,
    /// Staging and egress regions.
    #[serde(deserialize_with = "transfer_section")]
    pub transfer: FamilyCounts,
}

/// A capacity table as written, with the families it leaves out still unset.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CountsSection {
    point: Option<u32>,
    edge: Option<u32>,
    hull: Option<u32>,
    entity: Option<u32>,
    hull_bone: Option<u32>,
    entity_bone: Option<u32>,
}

impl CountsSection {
    fn over(self, base: FamilyCounts) -> FamilyCounts {
        FamilyCounts {
            point: self.point.unwrap_or(base.point),
            edge: self.edge.unwrap_or(base.edge),
            hull: self.hull.unwrap_or(base.hull),
            entity: self.entity.unwrap_or(base.entity),
            hull_bone: self.hull_bone.unwrap_or(base.hull_bone),
            entity_bone: self.entity_bone.unwrap_or(base.entity_bone),
        }
    }
}

fn core_section<'de, D: Deserializer<'de>>(deserializer: D) -> Result<FamilyCounts, D::Error> {
    Ok(CountsSection::deserialize(deserializer)?.over(core_capacity()))
}

fn transfer_section<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<FamilyCounts, D::Error> {
    Ok(CountsSection::deserialize(deserializer)?.over(transfer_capacity()))
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            core: core_capacity(),
            transfer: transfer_capacity(),
        }
    }
}

/// Driver settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Bound of the loader and unloader channels.
    pub channel_capacity: usize,
    /// Ticks slower than this are logged and counted.
    pub tick_budget_us: u64,
    /// Run the integrity diagnostic after every tick.
    pub verify_integrity: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            tick_budget_us: DEFAULT_TICK_BUDGET_US,
            verify_integrity: false,
        }
    }
}

/// Complete engine configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Initial capacities.
    pub capacity: CapacityConfig,
    /// Delete scan settings.
    pub scan: ScanConfig,
    /// Compaction dispatch settings.
    pub compact: CompactConfig,
    /// Driver settings.
    pub runtime: RuntimeConfig,
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and the
    /// [`validate`](Self::validate) errors for out-of-range values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file can not be read, otherwise the
    /// errors of [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Renders the config as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Checks every section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Dispatch`] for a bad scan block or dispatch
    /// slice, [`ConfigError::Invalid`] for a zero channel bound or budget.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scan.validate()?;
        self.compact.validate()?;
        if self.runtime.channel_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "runtime.channel_capacity",
                reason: "must be greater than zero",
            });
        }
        if self.runtime.tick_budget_us == 0 {
            return Err(ConfigError::Invalid {
                field: "runtime.tick_budget_us",
                reason: "must be greater than zero",
            });
        }
        Ok(())
    }
}

//! # Runtime Error Types

use thiserror::Error;

use sector_core::SectorError;

use crate::config::ConfigError;

/// Errors that can occur while driving a region.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration was rejected at construction.
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    /// A core operation failed.
    #[error("sector: {0}")]
    Sector(#[from] SectorError),

    /// The other end of a streaming channel was dropped.
    #[error("{0} channel disconnected")]
    Disconnected(&'static str),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

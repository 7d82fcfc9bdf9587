//! Errors that stop a run before or while it is orchestrated.
//!
//! Per-order failures are not errors at this level; they are recorded as
//! failed outcomes by the executor.
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating a [`crate::BenchConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in config file {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Orchestration-level failures.
///
/// A failed order submission is never one of these: it is recorded as a failed
/// [`crate::Outcome`] and the run continues.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid stage plan: {0}")]
    InvalidPlan(String),

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

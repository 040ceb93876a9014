//! Error types for the agent registry and integrity tracking system.

use std::path::PathBuf;
use thiserror::Error;

/// Registry-related errors
///
/// Fatal configuration errors only. Per-file parse failures are reported as
/// data (`ParseOutcome::Failure`) and never surface through this enum.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Could not find project root (no package.json above {0})")]
    ProjectRootNotFound(PathBuf),

    #[error("Agents directory not found: {0}")]
    AgentsDirNotFound(PathBuf),

    #[error("Registry I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Top-level errors for validator, integrity and dashboard operations
#[derive(Debug, Error)]
pub enum WardenError {
    #[error("Registry error: {0}")]
    RegistryError(#[from] RegistryError),

    #[error("Snapshot persistence failed: {0}")]
    PersistenceFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<serde_json::Error> for WardenError {
    fn from(err: serde_json::Error) -> Self {
        WardenError::PersistenceFailed(err.to_string())
    }
}

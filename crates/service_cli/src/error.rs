//! CLI error types.

use std::path::{Path, PathBuf};

use sim_core::SimulationError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Simulation or analytics failure
    #[error(transparent)]
    Simulation(#[from] SimulationError),

    /// Invalid or unreadable configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// File system failure
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Malformed portfolio JSON or failed report serialisation
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV read or write failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Input that parses but makes no sense
    #[error("invalid input: {0}")]
    Input(String),
}

impl CliError {
    /// Wrap an I/O error with the path it concerns.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result alias for CLI commands.
pub type Result<T> = std::result::Result<T, CliError>;

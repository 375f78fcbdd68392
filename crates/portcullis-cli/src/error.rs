//! Error types for the Portcullis CLI

use std::path::PathBuf;
use thiserror::Error;

use portcullis::{ConfigError, GateError};

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration file read error
    #[error("Failed to read configuration file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration parse error
    #[error("Failed to parse configuration file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },

    /// Environment configuration error
    #[error("Invalid environment configuration: {0}")]
    Env(#[source] ConfigError),

    /// Upload candidate could not be read
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Gate rejected the call itself
    #[error(transparent)]
    Gate(#[from] GateError),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

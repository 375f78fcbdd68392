//! Configuration loading for the CLI
//!
//! An explicit `--config` file wins. Without one, `portcullis.toml` in the
//! working directory is used if present, then `PORTCULLIS_*` variables.

use std::path::{Path, PathBuf};

use portcullis::GateConfig;

use crate::error::{CliError, Result};

/// Config file picked up from the working directory
pub const DEFAULT_CONFIG_FILE: &str = "portcullis.toml";

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// A TOML file
    File(PathBuf),
    /// Environment variables and built-in defaults
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Environment => write!(f, "environment"),
        }
    }
}

/// Resolve and load the gate configuration
pub fn load(explicit: Option<&Path>) -> Result<(GateConfig, ConfigSource)> {
    match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::ConfigNotFound {
                    path: path.to_path_buf(),
                });
            }
            Ok((from_file(path)?, ConfigSource::File(path.to_path_buf())))
        }
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if default.exists() {
                Ok((from_file(default)?, ConfigSource::File(default.to_path_buf())))
            } else {
                let config = GateConfig::from_env().map_err(CliError::Env)?;
                Ok((config, ConfigSource::Environment))
            }
        }
    }
}

/// Load configuration from a TOML file
pub fn from_file(path: &Path) -> Result<GateConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CliError::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    GateConfig::from_toml_str(&content).map_err(|e| CliError::ConfigParse {
        path: path.to_path_buf(),
        source: e,
    })
}

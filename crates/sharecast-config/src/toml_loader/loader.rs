//! Core TOML config loading: read from an explicit path or the platform default.

use crate::schema::RelayConfig;
use crate::validation;
use sharecast_common::ConfigError;
use std::path::Path;
use tracing::{debug, info};

use super::paths::default_config_path;

/// Load config from a specific TOML file path.
///
/// Missing fields take their serde defaults. A config that parses but
/// fails validation is rejected.
pub fn load_from_path(path: &Path) -> Result<RelayConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ParseError(format!("failed to read {}: {e}", path.display())))?;

    let config: RelayConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

    validation::validate(&config)?;

    info!("loaded config from {}", path.display());
    Ok(config)
}

/// Load config from `path` if given, else from the platform default path
/// if a file exists there, else fall back to built-in defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<RelayConfig, ConfigError> {
    if let Some(path) = path {
        return load_from_path(path);
    }

    match default_config_path() {
        Ok(default_path) if default_path.exists() => load_from_path(&default_path),
        Ok(default_path) => {
            debug!("no config at {}, using defaults", default_path.display());
            Ok(RelayConfig::default())
        }
        Err(e) => {
            debug!("{e}, using defaults");
            Ok(RelayConfig::default())
        }
    }
}

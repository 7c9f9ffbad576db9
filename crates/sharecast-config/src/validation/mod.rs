//! Full configuration validation.
//!
//! Each section has its own submodule; this orchestrator calls them all
//! and collects errors into a single `ConfigError`.

mod helpers;
mod limits;
mod server;


use crate::schema::RelayConfig;
use sharecast_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &RelayConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    server::validate_server(&mut errors, config);
    limits::validate_limits(&mut errors, config);

    if config.logging.filter.trim().is_empty() {
        errors.push("logging.filter must not be empty".into());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

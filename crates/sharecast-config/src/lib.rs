//! Sharecast relay configuration.
//!
//! TOML-based configuration with full validation. Every section uses
//! serde defaults so a partial file (or no file at all) works.

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{LimitsConfig, LoggingConfig, RelayConfig, ServerConfig};
pub use toml_loader::{default_config_path, load_from_path, load_or_default};

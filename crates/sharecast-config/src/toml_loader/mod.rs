//! TOML config file loading and path resolution.

mod loader;
mod paths;


pub use loader::{load_from_path, load_or_default};
pub use paths::default_config_path;

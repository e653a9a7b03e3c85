//! Configuration system for GroupSave clients.
//!
//! Provides TOML-based configuration with:
//! - `[api]` server location and request timeout
//! - `[session]` expiry margin and safety-net poll interval
//! - `[cache]` dashboard freshness window
//! - `[storage]` and `[logging]` locations
//! - Config file layering (user config dir + project-local overrides)

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigLayer, ConfigSource, LoadedConfig, load_config, load_config_file,
    load_config_with_options, save_config, user_config_dir, user_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;

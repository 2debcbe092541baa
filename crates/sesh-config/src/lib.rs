//! Configuration system for the sesh session server.
//!
//! Provides TOML-based configuration with:
//! - A `[session]` section (cookie name, idle window, provider)
//! - A `[server]` section (bind address, port, request logging)
//! - Config file layering (user config dir + project-local `sesh.toml`)

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    CONFIG_DIR_ENV, ConfigLayer, ConfigSource, LoadedConfig, load_config, load_config_file,
    load_config_with_options, save_config, user_config_dir, user_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;

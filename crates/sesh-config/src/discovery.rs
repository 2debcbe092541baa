//! Where `sesh` looks for configuration.
//!
//! Two files are consulted, lowest precedence first:
//!
//! | layer | path |
//! |---|---|
//! | [`ConfigLayer::User`] | `$SESH_CONFIG_DIR/config.toml`, else `<platform config dir>/sesh/config.toml` |
//! | [`ConfigLayer::Project`] | `sesh.toml` in the working (or given) directory |
//!
//! A `[section]` present in a later file replaces that section wholesale.
//! Command-line flags are applied by the binary on top of the result.
//! `sesh start --config <file>` skips discovery and reads one
//! [`ConfigLayer::Explicit`] file instead.

use std::path::{Path, PathBuf};

use crate::{ConfigError, Result, SeshConfig};

const PROJECT_CONFIG_FILE: &str = "sesh.toml";
const USER_CONFIG_FILE: &str = "config.toml";
const APP_DIR: &str = "sesh";

/// Points the user layer at a different directory (tests, containers).
pub const CONFIG_DIR_ENV: &str = "SESH_CONFIG_DIR";

/// Which layer a config file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    User,
    Project,
    Explicit,
}

/// One file that discovery considered.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub layer: ConfigLayer,
    pub path: PathBuf,
    /// False when the file is missing or was skipped with a warning.
    pub loaded: bool,
}

/// Merged configuration plus an account of how it was assembled.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: SeshConfig,
    /// Every file considered, lowest precedence first.
    pub sources: Vec<ConfigSource>,
    /// One message per layer that existed but could not be used.
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Read a single file and nothing else. Unlike discovery, a missing or
    /// invalid file is an error here.
    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self {
            config: load_config_file(path)?,
            sources: vec![ConfigSource {
                layer: ConfigLayer::Explicit,
                path: path.to_path_buf(),
                loaded: true,
            }],
            warnings: Vec::new(),
        })
    }

    /// Files that actually contributed, lowest precedence first.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Discover and merge the user and project layers.
///
/// `project_dir` defaults to the working directory.
pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(project_dir, None)
}

/// Like [`load_config`], with the user layer read from `config_dir` instead
/// of `SESH_CONFIG_DIR` or the platform directory.
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<LoadedConfig> {
    let user = match config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => user_config_path(),
    };
    let project = project_dir.map_or_else(
        || PathBuf::from(PROJECT_CONFIG_FILE),
        |dir| dir.join(PROJECT_CONFIG_FILE),
    );

    let candidates = user
        .map(|path| (ConfigLayer::User, path))
        .into_iter()
        .chain(std::iter::once((ConfigLayer::Project, project)));

    let mut loaded = LoadedConfig {
        config: SeshConfig::new(),
        sources: Vec::new(),
        warnings: Vec::new(),
    };
    for (layer, path) in candidates {
        let contributed = apply_layer(&mut loaded, &path);
        loaded.sources.push(ConfigSource {
            layer,
            path,
            loaded: contributed,
        });
    }

    Ok(loaded)
}

/// Parse and validate one file.
pub fn load_config_file(path: &Path) -> Result<SeshConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    SeshConfig::from_toml(&contents)
}

/// Write `config` as TOML, creating missing parent directories.
pub fn save_config(config: &SeshConfig, path: &Path) -> Result<()> {
    let write_err = |at: &Path, source| ConfigError::WriteFile {
        path: at.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| write_err(parent, e))?;
    }
    std::fs::write(path, config.to_toml()?).map_err(|e| write_err(path, e))
}

/// Path of the user layer's file, if a user directory can be determined.
pub fn user_config_path() -> Option<PathBuf> {
    user_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// `SESH_CONFIG_DIR` when set and non-empty, else `<platform config dir>/sesh`.
pub fn user_config_dir() -> Option<PathBuf> {
    match std::env::var_os(CONFIG_DIR_ENV) {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => dirs::config_dir().map(|d| d.join(APP_DIR)),
    }
}

/// Merge `path` into `loaded` when it exists. Returns whether it contributed;
/// an unreadable or invalid file is recorded as a warning and skipped.
fn apply_layer(loaded: &mut LoadedConfig, path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    match load_config_file(path) {
        Ok(layer) => {
            loaded.config.merge(layer);
            true
        }
        Err(e) => {
            loaded
                .warnings
                .push(format!("skipping {}: {}", path.display(), e));
            false
        }
    }
}

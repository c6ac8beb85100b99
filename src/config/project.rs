//! Project configuration file (`elmpack.toml`).
//!
//! ```toml
//! mode = "development"
//!
//! [elm]
//! cache = true
//! maxInstances = 2
//! report = "json"
//! ```
//!
//! The `[elm]` table is the global option layer shared by every request.

use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

use super::{ConfigError, OptionMap};
use crate::core::BuildMode;

/// Default project config file name.
pub const PROJECT_CONFIG_NAME: &str = "elmpack.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub path: Option<PathBuf>,

    /// Build mode used when the command line does not give one.
    #[serde(default)]
    mode: Option<String>,

    /// Global option layer.
    #[serde(default)]
    pub elm: OptionMap,
}

impl ProjectConfig {
    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file path.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        let mut config = Self::from_str(&content)?;
        config.path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Load `name` found upward from the current directory, or defaults.
    pub fn discover(name: &Path) -> Result<Self, ConfigError> {
        match find_config_file(name) {
            Some(path) => Self::from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// Build mode declared by the project, if any.
    pub fn mode(&self) -> Option<BuildMode> {
        self.mode.as_deref().and_then(|m| m.parse().ok())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(mode) = &self.mode {
            mode.parse::<BuildMode>().map_err(ConfigError::Validation)?;
        }
        Ok(())
    }
}

/// Find config file by searching upward from current directory.
///
/// ```text
/// /home/user/app/src/Page/   ← cwd
/// /home/user/app/elmpack.toml ← found!
/// ```
pub fn find_config_file(config_name: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    let cwd = std::env::current_dir().ok()?;
    cwd.ancestors()
        .map(|dir| dir.join(config_name))
        .find(|candidate| candidate.exists())
}

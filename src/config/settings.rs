//! User settings and preferences
//!
//! Manages settings stored in ~/.rowshape/config.toml

use crate::config::ConnectionConfig;
use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Harness settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// `tracing` filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Connection profile used when neither a URL nor a profile is given
    #[serde(default)]
    pub default_profile: Option<String>,
}

fn default_log_filter() -> String {
    "rowshape=info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            default_profile: None,
        }
    }
}

/// Load settings from config file
pub fn load_settings() -> ConfigResult<Settings> {
    load_settings_from(&ConnectionConfig::config_dir()?.join("config.toml"))
}

/// Load settings from a specific file, defaulting if it does not exist
pub fn load_settings_from(path: &Path) -> ConfigResult<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::NotFound(format!("Failed to read settings file: {}", e)))?;
    let settings: Settings = toml::from_str(&content)?;
    Ok(settings)
}

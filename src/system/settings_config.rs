// src/system/settings_config.rs

use crate::{core::paths, models::Settings};
use std::{fs, path::Path};
use thiserror::Error;

/// Errors raised while loading or writing `settings.toml`.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No configuration directory could be found or created.
    #[error("Could not find procline config directory.")]
    ConfigDirNotFound,
    /// Reading or writing the file failed.
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid settings TOML.
    #[error("Failed to parse settings.toml: {0}")]
    TomlParse(#[from] toml::de::Error),
    /// The defaults could not be serialized.
    #[error("Failed to serialize settings to TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Loads settings from `path`, or from the default location when `None`.
/// A missing file is created with the defaults, which are then returned.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let settings_path = match path {
        Some(p) => p.to_path_buf(),
        None => paths::get_settings_path().map_err(|_| ConfigError::ConfigDirNotFound)?,
    };

    if !settings_path.exists() {
        log::debug!(
            "No settings at '{}', writing defaults.",
            settings_path.display()
        );
        let defaults = Settings::default();
        let toml_string = toml::to_string_pretty(&defaults)?;
        if let Some(parent) = settings_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&settings_path, toml_string)?;
        Ok(defaults)
    } else {
        let content = fs::read_to_string(&settings_path)?;
        Ok(toml::from_str(&content)?)
    }
}

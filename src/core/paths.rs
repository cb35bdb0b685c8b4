// src/core/paths.rs

use crate::constants::{CONFIG_DIR_NAME, SETTINGS_FILENAME};
use lazy_static::lazy_static;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

lazy_static! {
    /// The resolved configuration directory, filled on first lookup.
    static ref CONFIG_DIR: Mutex<Option<PathBuf>> = Mutex::new(None);
}

/// Errors raised while locating or creating the configuration directory.
#[derive(Error, Debug)]
pub enum PathError {
    /// The platform has no user configuration directory.
    #[error("Could not find system config directory.")]
    ConfigDirNotFound,
    /// The directory exists in principle but could not be created.
    #[error("Could not create config directory at '{path}': {source}")]
    ConfigDirCreation {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Returns the procline configuration directory (`~/.config/procline`),
/// creating it if it doesn't exist.
///
/// Memoized: the first call computes and caches the path.
pub fn get_config_dir() -> Result<PathBuf, PathError> {
    let mut cached = CONFIG_DIR.lock().unwrap_or_else(PoisonError::into_inner);

    // Later calls are answered from the cache.
    if let Some(path) = &*cached {
        return Ok(path.clone());
    }

    // 1. `<platform config dir>/procline`, e.g. `~/.config/procline` or `%APPDATA%\procline`.
    let config_path = dirs::config_dir()
        .ok_or(PathError::ConfigDirNotFound)?
        .join(CONFIG_DIR_NAME);

    // 2. Create it on first use, so the settings file can be written next to it.
    if !config_path.exists() {
        fs::create_dir_all(&config_path).map_err(|e| PathError::ConfigDirCreation {
            path: config_path.display().to_string(),
            source: e,
        })?;
    }

    // 3. Remember it for the rest of the process.
    *cached = Some(config_path.clone());
    Ok(config_path)
}

/// Returns the path to `settings.toml` inside the config directory.
///
/// The file itself may not exist yet; `settings_config::load_settings`
/// writes the defaults there when it is missing.
pub fn get_settings_path() -> Result<PathBuf, PathError> {
    get_config_dir().map(|dir| dir.join(SETTINGS_FILENAME))
}

// src/core/paths.rs

use crate::constants::{CONFIG_DIR_NAME, CONFIG_FILENAME, NUGET_PACKAGES_VAR};
use std::env;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while locating or expanding paths.
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum PathError {
    #[error("Could not find system config directory.")]
    ConfigDirNotFound,
    #[error("Failed to expand path template '{template}': {message}")]
    Expansion { template: String, message: String },
}

/// Returns the path to the retype-tasks configuration directory (`~/.config/retype-tasks`).
/// The directory is not created; a missing directory simply means "no configuration".
pub fn get_config_dir() -> Result<PathBuf, PathError> {
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME))
        .ok_or(PathError::ConfigDirNotFound)
}

/// Returns the path of the default configuration file.
pub fn get_default_config_path() -> Result<PathBuf, PathError> {
    get_config_dir().map(|dir| dir.join(CONFIG_FILENAME))
}

/// Returns the NuGet global packages folder: `$NUGET_PACKAGES` when set, otherwise
/// `~/.nuget/packages`.
pub fn default_package_cache() -> PathBuf {
    if let Some(custom) = env::var_os(NUGET_PACKAGES_VAR).filter(|v| !v.is_empty()) {
        return PathBuf::from(custom);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".nuget")
        .join("packages")
}

/// Expands a user-supplied path template, resolving the home directory (`~`) and
/// environment variables (`$VAR`).
pub fn expand_path_template(template: &str) -> Result<PathBuf, PathError> {
    let expanded = shellexpand::full(template).map_err(|e| PathError::Expansion {
        template: template.to_string(),
        message: e.to_string(),
    })?;
    Ok(PathBuf::from(expanded.into_owned()))
}

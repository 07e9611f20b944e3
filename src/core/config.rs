//! # Runner Configuration
//!
//! Optional TOML file that seeds the process-wide [`ToolContext`]:
//!
//! ```toml
//! version = "3.5.0"                 # package version pin
//! package_cache = "~/.nuget/packages"
//! descriptor = "tools/retype.json"  # replaces the built-in descriptor
//! timeout_secs = 600
//! ```

use crate::{
    context::ToolContext,
    core::{descriptor::{self, DescriptorError}, paths::{self, PathError}},
    models::ToolDescriptor,
    system::locator::SystemLocator,
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use thiserror::Error;

/// Errors raised while loading `config.toml`.
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum ConfigError {
    #[error("Could not read configuration file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse configuration file '{path}': {source}")]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}

/// The contents of `config.toml`. Every field is optional.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfig {
    /// Package version to resolve from the cache instead of the highest available.
    pub version: Option<String>,
    /// Package cache root; `~` and `$VAR` are expanded.
    pub package_cache: Option<String>,
    /// Descriptor file replacing the built-in one.
    pub descriptor: Option<PathBuf>,
    /// Default timeout for every invocation, in seconds.
    pub timeout_secs: Option<u64>,
}

impl RunnerConfig {
    /// Loads a configuration file. A relative `descriptor` path is resolved against the
    /// directory of the configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        log::debug!("Loading configuration from '{}'", path.display());
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
            path: path.to_path_buf(),
            source,
        })?;

        if let (Some(descriptor), Some(base)) = (&config.descriptor, path.parent()) {
            if descriptor.is_relative() {
                config.descriptor = Some(base.join(descriptor));
            }
        }
        Ok(config)
    }

    /// Loads the configuration from the default location, or returns the defaults when
    /// no file exists there.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = paths::get_default_config_path()?;
        if path.is_file() {
            Self::load(&path)
        } else {
            log::debug!("No configuration file at '{}', using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Builds the tool context described by this configuration.
    pub fn to_context(&self) -> Result<ToolContext, ConfigError> {
        let package_cache = match &self.package_cache {
            Some(template) => paths::expand_path_template(template)?,
            None => paths::default_package_cache(),
        };

        let mut context =
            ToolContext::default().with_locator(Arc::new(SystemLocator::new(package_cache)));
        if let Some(version) = &self.version {
            context = context.with_version(version.clone());
        }
        if let Some(secs) = self.timeout_secs {
            context = context.with_timeout(Duration::from_secs(secs));
        }
        Ok(context)
    }

    /// Loads the configured descriptor, or returns the built-in one.
    pub fn to_descriptor(&self) -> Result<Arc<ToolDescriptor>, ConfigError> {
        match &self.descriptor {
            Some(path) => Ok(Arc::new(descriptor::load(path)?)),
            None => Ok(descriptor::retype()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_full_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
                version = "3.5.0"
                package_cache = "/opt/packages"
                descriptor = "retype.json"
                timeout_secs = 90
            "#,
        )
        .unwrap();

        let config = RunnerConfig::load(&path).unwrap();
        assert_eq!(config.version.as_deref(), Some("3.5.0"));
        assert_eq!(config.descriptor, Some(dir.path().join("retype.json")));

        let context = config.to_context().unwrap();
        assert_eq!(context.version(), Some("3.5.0"));
        assert_eq!(context.timeout(), Some(Duration::from_secs(90)));
        assert!(format!("{:?}", context).contains("/opt/packages"));
    }

    #[test]
    fn test_empty_config_uses_builtin_descriptor() {
        let config = RunnerConfig::default();
        let descriptor = config.to_descriptor().unwrap();
        assert_eq!(descriptor.name, "retype");
        assert!(config.to_context().unwrap().version().is_none());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "verison = \"1.0.0\"\n").unwrap();
        assert!(matches!(
            RunnerConfig::load(&path),
            Err(ConfigError::TomlParse { .. })
        ));
    }

    #[test]
    fn test_missing_descriptor_file_is_reported() {
        let config = RunnerConfig {
            descriptor: Some(PathBuf::from("/definitely/not/here.json")),
            ..Default::default()
        };
        assert!(matches!(
            config.to_descriptor(),
            Err(ConfigError::Descriptor(DescriptorError::Io { .. }))
        ));
    }
}

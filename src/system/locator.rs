// src/system/locator.rs

use crate::models::ToolDescriptor;
use semver::Version;
use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use walkdir::WalkDir;

/// Errors raised while locating the external executable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ResolutionError {
    #[error("Package '{package}' is not present in the package cache at '{root}'.")]
    PackageNotFound { package: String, root: PathBuf },
    #[error("Version '{version}' of package '{package}' is not present in the package cache.")]
    VersionNotFound { package: String, version: String },
    #[error("Package '{package}' {version} does not contain '{executable}'.")]
    ExecutableMissing {
        package: String,
        version: String,
        executable: String,
    },
    #[error("Could not locate the '{tool}' executable. Tried: {}", .attempts.join("; "))]
    NotFound { tool: String, attempts: Vec<String> },
}

/// Finds the external executable on the host.
///
/// The default implementation is [`SystemLocator`]; tests and embedders can supply their own.
pub trait ExecutableLocator: Send + Sync + fmt::Debug {
    /// Returns the value of `variable` when it is set and non-empty, used verbatim as a path.
    fn lookup_environment(&self, variable: &str) -> Option<PathBuf>;

    /// Finds `executable` inside the cached package `package_id`. Without a pinned version
    /// the highest available version is used.
    fn lookup_package_cache(
        &self,
        package_id: &str,
        executable: &str,
        version: Option<&str>,
    ) -> Result<PathBuf, ResolutionError>;

    /// Finds `name` on `PATH`.
    fn lookup_path(&self, name: &str) -> Option<PathBuf>;
}

/// Locator backed by the process environment, a NuGet-style package folder and `PATH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemLocator {
    package_cache: PathBuf,
}

impl SystemLocator {
    /// Creates a locator that searches the given package cache root.
    pub fn new(package_cache: impl Into<PathBuf>) -> Self {
        Self {
            package_cache: package_cache.into(),
        }
    }

    /// The package cache root this locator searches.
    pub fn package_cache(&self) -> &Path {
        &self.package_cache
    }
}

impl ExecutableLocator for SystemLocator {
    fn lookup_environment(&self, variable: &str) -> Option<PathBuf> {
        env::var_os(variable)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    }

    fn lookup_package_cache(
        &self,
        package_id: &str,
        executable: &str,
        version: Option<&str>,
    ) -> Result<PathBuf, ResolutionError> {
        find_in_package_cache(&self.package_cache, package_id, executable, version)
    }

    fn lookup_path(&self, name: &str) -> Option<PathBuf> {
        which::which(name).ok()
    }
}

/// Resolves the executable for `descriptor`.
///
/// Order: the environment override (set and non-empty), the package cache, then `PATH`.
/// Every failed attempt is reported when nothing is found.
pub fn resolve_executable(
    descriptor: &ToolDescriptor,
    locator: &dyn ExecutableLocator,
    version: Option<&str>,
) -> Result<PathBuf, ResolutionError> {
    let mut attempts = Vec::new();

    if let Some(path) = locator.lookup_environment(&descriptor.env_override) {
        log::debug!(
            "Using '{}' from environment variable {}",
            path.display(),
            descriptor.env_override
        );
        return Ok(path);
    }
    attempts.push(format!("environment variable {} is not set", descriptor.env_override));

    if let Some(package) = &descriptor.package {
        match locator.lookup_package_cache(&package.id, &package.executable, version) {
            Ok(path) => {
                log::debug!("Using '{}' from the package cache", path.display());
                return Ok(path);
            }
            Err(e) => attempts.push(e.to_string()),
        }
    }

    if let Some(name) = &descriptor.path_executable {
        if let Some(path) = locator.lookup_path(name) {
            log::debug!("Using '{}' from PATH", path.display());
            return Ok(path);
        }
        attempts.push(format!("'{}' is not on PATH", name));
    }

    Err(ResolutionError::NotFound {
        tool: descriptor.name.clone(),
        attempts,
    })
}

/// Searches `<root>/<package_id>/<version>/**/<executable>`.
///
/// NuGet lower-cases package folders, so both the given and lower-cased ids are tried.
/// When several files match (one per target framework), the last in path order wins,
/// which is the newest framework for the usual `tools/netX.Y/any` layout.
pub fn find_in_package_cache(
    root: &Path,
    package_id: &str,
    executable: &str,
    version: Option<&str>,
) -> Result<PathBuf, ResolutionError> {
    let package_dir = [root.join(package_id), root.join(package_id.to_lowercase())]
        .into_iter()
        .find(|dir| dir.is_dir())
        .ok_or_else(|| ResolutionError::PackageNotFound {
            package: package_id.to_string(),
            root: root.to_path_buf(),
        })?;

    let versions = list_versions(&package_dir);
    let selected = match version {
        Some(pin) => versions
            .into_iter()
            .find(|name| name.eq_ignore_ascii_case(pin))
            .ok_or_else(|| ResolutionError::VersionNotFound {
                package: package_id.to_string(),
                version: pin.to_string(),
            })?,
        None => highest_version(versions).ok_or_else(|| ResolutionError::PackageNotFound {
            package: package_id.to_string(),
            root: root.to_path_buf(),
        })?,
    };

    WalkDir::new(package_dir.join(&selected))
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == executable)
        .map(|entry| entry.into_path())
        .max_by(|a, b| {
            framework_version(a)
                .cmp(&framework_version(b))
                .then_with(|| a.cmp(b))
        })
        .ok_or_else(|| ResolutionError::ExecutableMissing {
            package: package_id.to_string(),
            version: selected,
            executable: executable.to_string(),
        })
}

fn list_versions(package_dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(package_dir) else {
        return Vec::new();
    };
    entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|ft| ft.is_dir()))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect()
}

/// Picks the highest semantic version. Folders that are not valid versions are ignored.
/// Numeric `(major, minor)` of the first `netX.Y` or `netcoreappX.Y` folder in `path`,
/// so that `net10.0` ranks above `net9.0`. Platform suffixes (`net8.0-windows`) are ignored.
fn framework_version(path: &Path) -> Option<(u64, u64)> {
    path.components().find_map(|component| {
        let name = component.as_os_str().to_str()?.to_ascii_lowercase();
        let rest = name
            .strip_prefix("netcoreapp")
            .or_else(|| name.strip_prefix("net"))?;
        let rest = rest.split('-').next()?;
        let (major, minor) = rest.split_once('.')?;
        Some((major.parse().ok()?, minor.parse().ok()?))
    })
}

fn highest_version(names: Vec<String>) -> Option<String> {
    names
        .into_iter()
        .filter_map(|name| Version::parse(&name).ok().map(|v| (v, name)))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, name)| name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::descriptor;
    use std::collections::HashMap;
    use tempfile::TempDir;

    /// A locator answering from fixed tables.
    #[derive(Debug, Default)]
    struct FakeLocator {
        env: HashMap<String, PathBuf>,
        cache: Option<PathBuf>,
        path: HashMap<String, PathBuf>,
    }

    impl ExecutableLocator for FakeLocator {
        fn lookup_environment(&self, variable: &str) -> Option<PathBuf> {
            self.env.get(variable).cloned()
        }

        fn lookup_package_cache(
            &self,
            package_id: &str,
            _executable: &str,
            _version: Option<&str>,
        ) -> Result<PathBuf, ResolutionError> {
            self.cache.clone().ok_or_else(|| ResolutionError::PackageNotFound {
                package: package_id.to_string(),
                root: PathBuf::from("/nowhere"),
            })
        }

        fn lookup_path(&self, name: &str) -> Option<PathBuf> {
            self.path.get(name).cloned()
        }
    }

    fn make_package(root: &Path, version: &str, relative: &str) {
        let file = root.join("retypeapp").join(version).join(relative);
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(file, b"").unwrap();
    }

    #[test]
    fn test_environment_override_wins() {
        let locator = FakeLocator {
            env: HashMap::from([("RETYPE_EXE".to_string(), PathBuf::from("/custom/retype"))]),
            cache: Some(PathBuf::from("/cache/retype.dll")),
            ..Default::default()
        };
        let path = resolve_executable(&descriptor::retype(), &locator, None).unwrap();
        assert_eq!(path, PathBuf::from("/custom/retype"));
    }

    #[test]
    fn test_package_cache_before_path() {
        let locator = FakeLocator {
            cache: Some(PathBuf::from("/cache/retype.dll")),
            path: HashMap::from([("retype".to_string(), PathBuf::from("/usr/bin/retype"))]),
            ..Default::default()
        };
        let path = resolve_executable(&descriptor::retype(), &locator, None).unwrap();
        assert_eq!(path, PathBuf::from("/cache/retype.dll"));
    }

    #[test]
    fn test_path_is_last_resort() {
        let locator = FakeLocator {
            path: HashMap::from([("retype".to_string(), PathBuf::from("/usr/bin/retype"))]),
            ..Default::default()
        };
        let path = resolve_executable(&descriptor::retype(), &locator, None).unwrap();
        assert_eq!(path, PathBuf::from("/usr/bin/retype"));
    }

    #[test]
    fn test_not_found_lists_every_attempt() {
        let err = resolve_executable(&descriptor::retype(), &FakeLocator::default(), None)
            .unwrap_err();
        match err {
            ResolutionError::NotFound { tool, attempts } => {
                assert_eq!(tool, "retype");
                assert_eq!(attempts.len(), 3);
                assert!(attempts.first().unwrap().contains("RETYPE_EXE"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_environment_value_is_ignored() {
        let locator = SystemLocator::new("/nowhere");
        assert!(locator
            .lookup_environment("RETYPE_TASKS_TEST_SURELY_UNSET_VARIABLE")
            .is_none());
    }

    #[test]
    fn test_package_cache_picks_highest_version() {
        let root = TempDir::new().unwrap();
        make_package(root.path(), "2.3.0", "tools/net6.0/any/retype.dll");
        make_package(root.path(), "2.10.1", "tools/net6.0/any/retype.dll");
        make_package(root.path(), "2.9.0", "tools/net6.0/any/retype.dll");
        fs::create_dir_all(root.path().join("retypeapp").join("not-a-version")).unwrap();

        let path = find_in_package_cache(root.path(), "RetypeApp", "retype.dll", None).unwrap();
        assert!(path.ends_with("2.10.1/tools/net6.0/any/retype.dll"));
    }

    #[test]
    fn test_package_cache_honours_pinned_version() {
        let root = TempDir::new().unwrap();
        make_package(root.path(), "2.3.0", "tools/net6.0/any/retype.dll");
        make_package(root.path(), "2.10.1", "tools/net6.0/any/retype.dll");

        let path =
            find_in_package_cache(root.path(), "retypeapp", "retype.dll", Some("2.3.0")).unwrap();
        assert!(path.ends_with("2.3.0/tools/net6.0/any/retype.dll"));

        let err = find_in_package_cache(root.path(), "retypeapp", "retype.dll", Some("9.9.9"))
            .unwrap_err();
        assert!(matches!(err, ResolutionError::VersionNotFound { .. }));
    }

    #[test]
    fn test_package_cache_prefers_newest_framework_folder() {
        let root = TempDir::new().unwrap();
        make_package(root.path(), "3.0.0", "tools/net6.0/any/retype.dll");
        make_package(root.path(), "3.0.0", "tools/net7.0/any/retype.dll");

        let path = find_in_package_cache(root.path(), "retypeapp", "retype.dll", None).unwrap();
        assert!(path.ends_with("net7.0/any/retype.dll"));

        make_package(root.path(), "3.0.0", "tools/net9.0/any/retype.dll");
        make_package(root.path(), "3.0.0", "tools/net10.0/any/retype.dll");
        let path = find_in_package_cache(root.path(), "retypeapp", "retype.dll", None).unwrap();
        assert!(path.ends_with("net10.0/any/retype.dll"));
    }

    #[test]
    fn test_framework_version_is_numeric() {
        assert_eq!(
            framework_version(Path::new("/p/3.0.0/tools/net10.0/any/retype.dll")),
            Some((10, 0))
        );
        assert_eq!(
            framework_version(Path::new("tools/netcoreapp3.1/retype.dll")),
            Some((3, 1))
        );
        assert_eq!(
            framework_version(Path::new("tools/net8.0-windows/retype.dll")),
            Some((8, 0))
        );
        assert_eq!(framework_version(Path::new("tools/any/retype.dll")), None);
    }

    #[test]
    fn test_package_cache_errors() {
        let root = TempDir::new().unwrap();
        let err = find_in_package_cache(root.path(), "retypeapp", "retype.dll", None).unwrap_err();
        assert!(matches!(err, ResolutionError::PackageNotFound { .. }));

        make_package(root.path(), "1.0.0", "tools/readme.txt");
        let err = find_in_package_cache(root.path(), "retypeapp", "retype.dll", None).unwrap_err();
        assert!(matches!(err, ResolutionError::ExecutableMissing { .. }));
    }
}

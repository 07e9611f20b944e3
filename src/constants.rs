// src/constants.rs

/// The name of the external tool, used in log lines and error messages.
pub const TOOL_NAME: &str = "retype";

/// Environment variable that, when set and non-empty, points directly at the Retype executable.
pub const ENV_OVERRIDE_VAR: &str = "RETYPE_EXE";

/// The NuGet package id Retype is distributed under.
pub const PACKAGE_ID: &str = "retypeapp";

/// The executable inside the package, launched through the .NET host.
pub const PACKAGE_EXECUTABLE: &str = "retype.dll";

/// The .NET host used to launch `.dll` executables.
pub const DOTNET_HOST: &str = "dotnet";

/// Environment variable that relocates the NuGet global packages folder.
pub const NUGET_PACKAGES_VAR: &str = "NUGET_PACKAGES";

/// The name of the directory holding retype-tasks configuration (inside the system config dir).
pub const CONFIG_DIR_NAME: &str = "retype-tasks";

/// The name of the configuration file inside [`CONFIG_DIR_NAME`].
pub const CONFIG_FILENAME: &str = "config.toml";

/// Replacement text for secret option values in logs and error messages.
pub const REDACTED: &str = "[REDACTED]";

/// The `log` target used for the external tool's own output.
pub const OUTPUT_LOG_TARGET: &str = "retype";

//! # Tool Descriptor
//!
//! The descriptor is the static configuration the argument compiler runs on: which
//! sub-commands exist, which options each one accepts, and the order they are emitted in.
//! A built-in descriptor for Retype ships with the crate; a replacement can be loaded
//! from a JSON or TOML file.

use crate::{
    constants::{ENV_OVERRIDE_VAR, PACKAGE_EXECUTABLE, PACKAGE_ID, TOOL_NAME},
    models::{OptionKind, OptionSpec, PackageSpec, SubCommandSpec, ToolDescriptor},
};
use lazy_static::lazy_static;
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;

lazy_static! {
    static ref RETYPE_DESCRIPTOR: Arc<ToolDescriptor> = Arc::new(build_retype_descriptor());
}

/// Errors raised while loading or validating a descriptor.
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum DescriptorError {
    #[error("Could not read descriptor file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse JSON descriptor '{path}': {source}")]
    JsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to parse TOML descriptor '{path}': {source}")]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Sub-command '{0}' is declared more than once.")]
    DuplicateSubCommand(String),
    #[error("Option '{option}' is declared more than once in sub-command '{sub_command}'.")]
    DuplicateOption { sub_command: String, option: String },
    #[error("Options '{first}' and '{second}' of sub-command '{sub_command}' share position {position}.")]
    DuplicatePosition {
        sub_command: String,
        first: String,
        second: String,
        position: u32,
    },
    #[error("Option '{option}' of sub-command '{sub_command}' must have a CLI token unless it is positional.")]
    MissingCliToken { sub_command: String, option: String },
    #[error("Positional option '{option}' of sub-command '{sub_command}' must not have a CLI token.")]
    PositionalWithToken { sub_command: String, option: String },
    #[error("Sub-command '{0}' declares more than one positional option.")]
    MultiplePositionals(String),
}

/// Returns the built-in Retype descriptor.
///
/// Declared orders:
/// - `build`: `--output`, `--secret`, `--override`, `<config>`, `--verbose`
/// - `watch`: `--secret`, `--api`, `--host`, `--port`, `<config>`, `--verbose`
/// - `run`: `--host`, `--port`, `<config>`, `--verbose`
pub fn retype() -> Arc<ToolDescriptor> {
    Arc::clone(&RETYPE_DESCRIPTOR)
}

/// Loads a descriptor from disk. Files ending in `.json` are parsed as JSON, everything
/// else as TOML. The result is validated before it is returned.
pub fn load(path: &Path) -> Result<ToolDescriptor, DescriptorError> {
    log::debug!("Loading tool descriptor from '{}'", path.display());
    let content = fs::read_to_string(path).map_err(|source| DescriptorError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let descriptor: ToolDescriptor = if is_json {
        serde_json::from_str(&content).map_err(|source| DescriptorError::JsonParse {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        toml::from_str(&content).map_err(|source| DescriptorError::TomlParse {
            path: path.to_path_buf(),
            source,
        })?
    };

    validate(&descriptor)?;
    Ok(descriptor)
}

/// Checks the structural invariants the argument compiler relies on.
pub fn validate(descriptor: &ToolDescriptor) -> Result<(), DescriptorError> {
    let mut seen_sub_commands = HashSet::new();
    for sub in &descriptor.sub_commands {
        if !seen_sub_commands.insert(sub.name.as_str()) {
            return Err(DescriptorError::DuplicateSubCommand(sub.name.clone()));
        }
        validate_sub_command(sub)?;
    }
    Ok(())
}

fn validate_sub_command(sub: &SubCommandSpec) -> Result<(), DescriptorError> {
    let mut names = HashSet::new();
    let mut positionals = 0usize;

    for opt in &sub.options {
        if !names.insert(opt.name.as_str()) {
            return Err(DescriptorError::DuplicateOption {
                sub_command: sub.name.clone(),
                option: opt.name.clone(),
            });
        }

        let has_token = !opt.cli_token.trim().is_empty();
        match (opt.kind, has_token) {
            (OptionKind::PositionalString, true) => {
                return Err(DescriptorError::PositionalWithToken {
                    sub_command: sub.name.clone(),
                    option: opt.name.clone(),
                });
            }
            (OptionKind::PositionalString, false) => positionals += 1,
            (_, false) => {
                return Err(DescriptorError::MissingCliToken {
                    sub_command: sub.name.clone(),
                    option: opt.name.clone(),
                });
            }
            (_, true) => {}
        }
    }

    if positionals > 1 {
        return Err(DescriptorError::MultiplePositionals(sub.name.clone()));
    }

    let ordered = sub.ordered_options();
    for pair in ordered.windows(2) {
        if let [first, second] = pair {
            if first.position == second.position {
                return Err(DescriptorError::DuplicatePosition {
                    sub_command: sub.name.clone(),
                    first: first.name.clone(),
                    second: second.name.clone(),
                    position: first.position,
                });
            }
        }
    }
    Ok(())
}

// --- Built-in Retype descriptor ---

fn option(name: &str, cli_token: &str, kind: OptionKind, position: u32, help: &str) -> OptionSpec {
    OptionSpec {
        name: name.to_string(),
        cli_token: cli_token.to_string(),
        kind,
        position,
        secret: false,
        help: Some(help.to_string()),
    }
}

fn secret_option(name: &str, cli_token: &str, position: u32, help: &str) -> OptionSpec {
    OptionSpec {
        secret: true,
        ..option(name, cli_token, OptionKind::String, position, help)
    }
}

fn config_option(position: u32) -> OptionSpec {
    option(
        "config",
        "",
        OptionKind::PositionalString,
        position,
        "Path to the project root or the retype.yml configuration file.",
    )
}

fn verbose_option(position: u32) -> OptionSpec {
    option(
        "verbose",
        "--verbose",
        OptionKind::Boolean,
        position,
        "Enable verbose logging.",
    )
}

fn build_retype_descriptor() -> ToolDescriptor {
    let build = SubCommandSpec {
        name: "build".to_string(),
        help: Some("Generate a Retype website from the project files.".to_string()),
        options: vec![
            option(
                "output",
                "--output",
                OptionKind::String,
                0,
                "Custom path to the output directory.",
            ),
            secret_option("secret", "--secret", 1, "Retype key or password."),
            option(
                "override",
                "--override",
                OptionKind::String,
                2,
                "JSON configuration overriding project config values.",
            ),
            config_option(3),
            verbose_option(4),
        ],
    };

    let watch = SubCommandSpec {
        name: "watch".to_string(),
        help: Some("Build and serve the website, rebuilding as files change.".to_string()),
        options: vec![
            secret_option("secret", "--secret", 0, "Retype key or password."),
            option(
                "api",
                "--api",
                OptionKind::Boolean,
                1,
                "Enable the watch API.",
            ),
            option(
                "host",
                "--host",
                OptionKind::String,
                2,
                "Custom host name or IP address.",
            ),
            option("port", "--port", OptionKind::Integer, 3, "Custom TCP port."),
            config_option(4),
            verbose_option(5),
        ],
    };

    let run = SubCommandSpec {
        name: "run".to_string(),
        help: Some("Serve a previously built website.".to_string()),
        options: vec![
            option(
                "host",
                "--host",
                OptionKind::String,
                0,
                "Custom host name or IP address.",
            ),
            option("port", "--port", OptionKind::Integer, 1, "Custom TCP port."),
            config_option(2),
            verbose_option(3),
        ],
    };

    ToolDescriptor {
        name: TOOL_NAME.to_string(),
        help: Some("Retype builds a website based on simple text files.".to_string()),
        env_override: ENV_OVERRIDE_VAR.to_string(),
        package: Some(PackageSpec {
            id: PACKAGE_ID.to_string(),
            executable: PACKAGE_EXECUTABLE.to_string(),
        }),
        path_executable: Some(TOOL_NAME.to_string()),
        sub_commands: vec![build, watch, run],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn order_of(descriptor: &ToolDescriptor, sub: &str) -> Vec<String> {
        descriptor
            .sub_command(sub)
            .unwrap()
            .ordered_options()
            .iter()
            .map(|opt| opt.name.clone())
            .collect()
    }

    #[test]
    fn test_builtin_descriptor_is_valid() {
        assert!(validate(&retype()).is_ok());
    }

    #[test]
    fn test_builtin_declared_orders() {
        let descriptor = retype();
        assert_eq!(
            order_of(&descriptor, "build"),
            vec!["output", "secret", "override", "config", "verbose"]
        );
        assert_eq!(
            order_of(&descriptor, "watch"),
            vec!["secret", "api", "host", "port", "config", "verbose"]
        );
        assert_eq!(
            order_of(&descriptor, "run"),
            vec!["host", "port", "config", "verbose"]
        );
    }

    #[test]
    fn test_builtin_marks_secret_options() {
        let descriptor = retype();
        assert!(descriptor.sub_command("build").unwrap().option("secret").unwrap().secret);
        assert!(descriptor.sub_command("watch").unwrap().option("secret").unwrap().secret);
        assert!(!descriptor.sub_command("build").unwrap().option("output").unwrap().secret);
    }

    #[test]
    fn test_load_json_descriptor() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        write!(
            file,
            r#"{{
                "name": "fake",
                "env_override": "FAKE_EXE",
                "sub_commands": [
                    {{
                        "name": "build",
                        "options": [
                            {{ "name": "config", "kind": "positional-string", "position": 1 }},
                            {{ "name": "output", "cli_token": "-o", "kind": "string", "position": 0 }}
                        ]
                    }}
                ]
            }}"#
        )
        .unwrap();

        let descriptor = load(file.path()).unwrap();
        assert_eq!(descriptor.name, "fake");
        assert!(descriptor.package.is_none());
        assert_eq!(order_of(&descriptor, "build"), vec!["output", "config"]);
    }

    #[test]
    fn test_load_toml_descriptor() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(
            file,
            r#"
                name = "fake"
                env_override = "FAKE_EXE"
                path_executable = "fake"

                [[sub_commands]]
                name = "serve"

                [[sub_commands.options]]
                name = "port"
                cli_token = "--port"
                kind = "integer"
                position = 0
            "#
        )
        .unwrap();

        let descriptor = load(file.path()).unwrap();
        assert_eq!(descriptor.path_executable.as_deref(), Some("fake"));
        let serve = descriptor.sub_command("serve").unwrap();
        assert_eq!(serve.option("port").unwrap().kind, OptionKind::Integer);
    }

    #[test]
    fn test_load_rejects_unknown_fields() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        write!(file, r#"{{ "name": "x", "env_override": "X", "subcommands": [] }}"#).unwrap();
        let err = load(file.path()).unwrap_err();
        assert!(matches!(err, DescriptorError::JsonParse { .. }));
    }

    #[test]
    fn test_validate_rejects_positional_with_token() {
        let mut descriptor = (*retype()).clone();
        descriptor.sub_commands[0].options[3].cli_token = "--config".to_string();
        assert!(matches!(
            validate(&descriptor),
            Err(DescriptorError::PositionalWithToken { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_flag_without_token() {
        let mut descriptor = (*retype()).clone();
        descriptor.sub_commands[0].options[0].cli_token = String::new();
        assert!(matches!(
            validate(&descriptor),
            Err(DescriptorError::MissingCliToken { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_second_positional() {
        let mut descriptor = (*retype()).clone();
        descriptor.sub_commands[2].options.push(OptionSpec {
            name: "extra".to_string(),
            cli_token: String::new(),
            kind: OptionKind::PositionalString,
            position: 10,
            secret: false,
            help: None,
        });
        assert!(matches!(
            validate(&descriptor),
            Err(DescriptorError::MultiplePositionals(name)) if name == "run"
        ));
    }

    #[test]
    fn test_validate_rejects_shared_position() {
        let mut descriptor = (*retype()).clone();
        descriptor.sub_commands[2].options[1].position = 0;
        assert!(matches!(
            validate(&descriptor),
            Err(DescriptorError::DuplicatePosition { position: 0, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_sub_command() {
        let mut descriptor = (*retype()).clone();
        let copy = descriptor.sub_commands[0].clone();
        descriptor.sub_commands.push(copy);
        assert!(matches!(
            validate(&descriptor),
            Err(DescriptorError::DuplicateSubCommand(name)) if name == "build"
        ));
    }
}

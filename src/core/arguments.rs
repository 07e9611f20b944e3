// src/core/arguments.rs

use crate::{
    constants::REDACTED,
    core::{commons::wrap_value, settings::Settings},
    models::{OptionKind, SubCommandSpec},
};
use thiserror::Error;

/// Errors raised while turning settings into a command line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// The descriptor has no such sub-command.
    #[error("Unknown sub-command '{0}'.")]
    UnknownSubCommand(String),
    /// The settings belong to another sub-command.
    #[error("Settings for '{settings}' cannot be compiled as sub-command '{expected}'.")]
    SubCommandMismatch {
        /// Sub-command being compiled.
        expected: String,
        /// Sub-command the settings were created for.
        settings: String,
    },
    /// The settings hold an option the sub-command does not declare.
    #[error("Sub-command '{sub_command}' has no option named '{option}'.")]
    UnknownOption {
        /// Sub-command being compiled.
        sub_command: String,
        /// The undeclared option.
        option: String,
    },
    /// A value does not fit the kind of its option.
    #[error("Option '{option}' expects a {expected} value, got '{value}'.")]
    KindMismatch {
        /// The offending option.
        option: String,
        /// Kind the option declares.
        expected: OptionKind,
        /// The rejected value, as text.
        value: String,
    },
    /// A raw argument string has unbalanced quotes.
    #[error("Argument string could not be parsed: {0}")]
    RawParse(String),
}

/// An ordered argument vector, with secret values tracked for display.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompiledArguments {
    tokens: Vec<String>,
    secret: Vec<bool>,
}

impl CompiledArguments {
    /// Creates an empty argument vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits a raw argument string with POSIX shell word rules.
    ///
    /// Quotes group words (`--override '{"a": 1}'` is two tokens) and are removed.
    pub fn parse_raw(arguments: &str) -> Result<Self, CompileError> {
        let tokens = shlex::split(arguments)
            .ok_or_else(|| CompileError::RawParse(arguments.to_string()))?;
        Ok(tokens.into_iter().collect())
    }

    /// Appends a token.
    pub fn push(&mut self, token: impl Into<String>) {
        self.tokens.push(token.into());
        self.secret.push(false);
    }

    /// Appends a token that is hidden when the command line is displayed.
    pub fn push_secret(&mut self, token: impl Into<String>) {
        self.tokens.push(token.into());
        self.secret.push(true);
    }

    /// The tokens, in order.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Consumes the argument vector, returning its tokens.
    pub fn into_tokens(self) -> Vec<String> {
        self.tokens
    }

    /// Whether no token has been added.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Renders the command line for logs: secrets replaced, tokens with spaces quoted.
    pub fn redacted(&self) -> String {
        self.tokens
            .iter()
            .zip(&self.secret)
            .map(|(token, secret)| {
                if *secret {
                    REDACTED.to_string()
                } else {
                    display_token(token)
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl FromIterator<String> for CompiledArguments {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut arguments = Self::new();
        for token in iter {
            arguments.push(token);
        }
        arguments
    }
}

fn display_token(token: &str) -> String {
    if token.is_empty() || token.chars().any(|c| c.is_whitespace() || c == '"') {
        wrap_value(token)
    } else {
        token.to_string()
    }
}

/// Compiles settings into the argument vector for `spec`.
///
/// The sub-command literal comes first, then every present option in declared position
/// order (never alphabetical, never the order the setters were called in):
/// - string and integer options emit their flag and the value as two tokens;
/// - boolean options emit their flag alone, and only when `true`;
/// - the positional option emits its value alone.
///
/// Process-level extra arguments are appended last.
pub fn compile(
    spec: &SubCommandSpec,
    settings: &Settings,
) -> Result<CompiledArguments, CompileError> {
    if settings.sub_command() != spec.name {
        return Err(CompileError::SubCommandMismatch {
            expected: spec.name.clone(),
            settings: settings.sub_command().to_string(),
        });
    }

    // Reject anything the descriptor does not know before emitting a single token.
    for (name, value) in settings.values() {
        let option = spec.option(name).ok_or_else(|| CompileError::UnknownOption {
            sub_command: spec.name.clone(),
            option: name.clone(),
        })?;
        if !value.matches(option.kind) {
            return Err(CompileError::KindMismatch {
                option: name.clone(),
                expected: option.kind,
                value: value.to_string(),
            });
        }
    }

    let mut arguments = CompiledArguments::new();
    arguments.push(spec.name.as_str());

    for option in spec.ordered_options() {
        let Some(value) = settings.get(&option.name) else {
            continue;
        };
        match option.kind {
            OptionKind::String | OptionKind::Integer => {
                arguments.push(option.cli_token.as_str());
                if option.secret {
                    arguments.push_secret(value.to_string());
                } else {
                    arguments.push(value.to_string());
                }
            }
            OptionKind::Boolean => {
                if value.as_bool() == Some(true) {
                    arguments.push(option.cli_token.as_str());
                }
            }
            OptionKind::PositionalString => {
                if option.secret {
                    arguments.push_secret(value.to_string());
                } else {
                    arguments.push(value.to_string());
                }
            }
        }
    }

    for extra in &settings.process().extra_arguments {
        arguments.push(extra.as_str());
    }

    log::trace!(
        "Compiled '{}' settings into: {}",
        spec.name,
        arguments.redacted()
    );
    Ok(arguments)
}

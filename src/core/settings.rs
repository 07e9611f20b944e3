//! # Settings Model
//!
//! A [`Settings`] value holds the options chosen for one invocation of one sub-command.
//! It has value semantics: every transformation borrows the receiver and returns a new,
//! independent instance, so a partially configured settings value can be reused as the
//! base of several invocations without any aliasing between them.
//!
//! No validation happens here. Unknown option names and mismatched value types are
//! reported by the argument compiler.

use crate::models::OptionValue;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::Duration,
};

/// Process-level options that apply to any sub-command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessSettings {
    /// Explicit executable path, bypassing resolution.
    pub tool_path: Option<PathBuf>,
    /// Working directory of the child. Defaults to the current directory.
    pub working_directory: Option<PathBuf>,
    /// Variables merged on top of the inherited environment.
    pub environment: BTreeMap<String, String>,
    /// Hard limit for the whole invocation.
    pub timeout: Option<Duration>,
    /// Whether captured lines are forwarded to the logger. Defaults to `true`.
    pub log_output: Option<bool>,
    /// Whether the command line is logged before starting. Defaults to `true`.
    pub log_invocation: Option<bool>,
    /// Raw tokens appended after the compiled arguments.
    pub extra_arguments: Vec<String>,
}

impl ProcessSettings {
    /// Effective value of [`ProcessSettings::log_output`].
    pub fn logs_output(&self) -> bool {
        self.log_output.unwrap_or(true)
    }

    /// Effective value of [`ProcessSettings::log_invocation`].
    pub fn logs_invocation(&self) -> bool {
        self.log_invocation.unwrap_or(true)
    }
}

/// Immutable set of option values for one sub-command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    sub_command: String,
    values: BTreeMap<String, OptionValue>,
    process: ProcessSettings,
}

impl Settings {
    /// Creates an empty settings instance: every option is absent.
    pub fn new(sub_command: impl Into<String>) -> Self {
        Self {
            sub_command: sub_command.into(),
            values: BTreeMap::new(),
            process: ProcessSettings::default(),
        }
    }

    /// The sub-command these settings are for.
    pub fn sub_command(&self) -> &str {
        &self.sub_command
    }

    /// The stored value of an option, `None` when absent.
    pub fn get(&self, option: &str) -> Option<&OptionValue> {
        self.values.get(option)
    }

    /// Whether an option has a value (including `false` or an empty string).
    pub fn is_set(&self, option: &str) -> bool {
        self.values.contains_key(option)
    }

    /// All present values, keyed by option name.
    pub fn values(&self) -> &BTreeMap<String, OptionValue> {
        &self.values
    }

    /// The process-level options.
    pub fn process(&self) -> &ProcessSettings {
        &self.process
    }

    fn derive(&self, change: impl FnOnce(&mut Self)) -> Self {
        let mut next = self.clone();
        change(&mut next);
        next
    }

    /// Stores a value for an option.
    #[must_use]
    pub fn set(&self, option: &str, value: impl Into<OptionValue>) -> Self {
        let value = value.into();
        self.derive(|s| {
            s.values.insert(option.to_string(), value);
        })
    }

    /// Clears an option back to absent, whatever it held before.
    #[must_use]
    pub fn reset(&self, option: &str) -> Self {
        self.derive(|s| {
            s.values.remove(option);
        })
    }

    /// Stores `true` for a boolean option.
    #[must_use]
    pub fn enable(&self, option: &str) -> Self {
        self.set(option, true)
    }

    /// Stores `false` for a boolean option.
    #[must_use]
    pub fn disable(&self, option: &str) -> Self {
        self.set(option, false)
    }

    /// Stores the negation of the current boolean value. Absent counts as `false`,
    /// so toggling an absent option twice yields an explicit `false`.
    #[must_use]
    pub fn toggle(&self, option: &str) -> Self {
        let current = self
            .get(option)
            .and_then(OptionValue::as_bool)
            .unwrap_or(false);
        self.set(option, !current)
    }

    // --- Process-level options ---

    /// Uses the given executable instead of resolving one.
    #[must_use]
    pub fn with_tool_path(&self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        self.derive(|s| s.process.tool_path = Some(path))
    }

    /// Runs the child in the given directory.
    #[must_use]
    pub fn with_working_directory(&self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref().to_path_buf();
        self.derive(|s| s.process.working_directory = Some(dir))
    }

    /// Adds (or replaces) one environment variable for the child.
    #[must_use]
    pub fn with_env(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let (key, value) = (key.into(), value.into());
        self.derive(|s| {
            s.process.environment.insert(key, value);
        })
    }

    /// Removes every environment override.
    #[must_use]
    pub fn clear_env(&self) -> Self {
        self.derive(|s| s.process.environment.clear())
    }

    /// Kills the child if it has not exited after `timeout`.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.derive(|s| s.process.timeout = Some(timeout))
    }

    /// Controls whether captured lines are forwarded to the logger.
    #[must_use]
    pub fn with_log_output(&self, enabled: bool) -> Self {
        self.derive(|s| s.process.log_output = Some(enabled))
    }

    /// Controls whether the command line is logged before starting.
    #[must_use]
    pub fn with_log_invocation(&self, enabled: bool) -> Self {
        self.derive(|s| s.process.log_invocation = Some(enabled))
    }

    /// Appends raw tokens after the compiled arguments.
    #[must_use]
    pub fn with_extra_arguments<I, S>(&self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let arguments: Vec<String> = arguments.into_iter().map(Into::into).collect();
        self.derive(|s| s.process.extra_arguments.extend(arguments))
    }

    /// Replaces the process-level options wholesale.
    #[must_use]
    pub fn with_process(&self, process: ProcessSettings) -> Self {
        self.derive(|s| s.process = process)
    }
}

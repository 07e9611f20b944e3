// src/models.rs

use serde::{Deserialize, Serialize};
use std::fmt;

// --- TOOL DESCRIPTOR MODELS ---
// These describe the external tool declaratively. They are loaded from the
// built-in Retype descriptor or from a JSON/TOML file.

/// How an option is rendered on the command line.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum OptionKind {
    /// `--flag <value>`
    String,
    /// `--flag`, emitted only when the stored value is `true`.
    Boolean,
    /// `--flag <number>`
    Integer,
    /// A bare value with no preceding flag.
    PositionalString,
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::PositionalString => "positional-string",
        };
        f.write_str(name)
    }
}

/// Declarative description of one configurable option of a sub-command.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct OptionSpec {
    /// The identifier used by the fluent API (e.g. `output`).
    pub name: String,
    /// The literal flag (e.g. `--output`). Empty for positional options.
    #[serde(default)]
    pub cli_token: String,
    /// Value type, which also decides how the option is emitted.
    pub kind: OptionKind,
    /// Rank among the options of the sub-command. Arguments are emitted in this order.
    pub position: u32,
    /// Secret values are redacted from logged invocations.
    #[serde(default)]
    pub secret: bool,
    /// One-line description shown by `describe`.
    #[serde(default)]
    pub help: Option<String>,
}

/// One mode of the external tool with its own option set.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SubCommandSpec {
    /// The literal emitted as the first argument (e.g. `build`).
    pub name: String,
    /// One-line description shown by `describe`.
    #[serde(default)]
    pub help: Option<String>,
    /// Declared options, in any order; `position` decides emission order.
    #[serde(default)]
    pub options: Vec<OptionSpec>,
}

impl SubCommandSpec {
    /// Looks up an option by its fluent-API name.
    pub fn option(&self, name: &str) -> Option<&OptionSpec> {
        self.options.iter().find(|opt| opt.name == name)
    }

    /// Returns the options sorted by their declared position.
    pub fn ordered_options(&self) -> Vec<&OptionSpec> {
        let mut ordered: Vec<&OptionSpec> = self.options.iter().collect();
        ordered.sort_by_key(|opt| opt.position);
        ordered
    }
}

/// Key used to find the executable inside the package cache.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PackageSpec {
    /// The package id (e.g. `retypeapp`).
    pub id: String,
    /// The file to look for inside the package (e.g. `retype.dll`).
    pub executable: String,
}

/// Everything the core needs to know about the external tool.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ToolDescriptor {
    /// Display name of the tool.
    pub name: String,
    /// One-line description shown by `describe`.
    #[serde(default)]
    pub help: Option<String>,
    /// Environment variable that overrides executable resolution.
    pub env_override: String,
    /// Where to look in the package cache, if the tool ships as a package.
    #[serde(default)]
    pub package: Option<PackageSpec>,
    /// Executable name looked up on `PATH` as a last resort.
    #[serde(default)]
    pub path_executable: Option<String>,
    /// Every mode of the tool.
    #[serde(default)]
    pub sub_commands: Vec<SubCommandSpec>,
}

impl ToolDescriptor {
    /// Looks up a sub-command by name.
    pub fn sub_command(&self, name: &str) -> Option<&SubCommandSpec> {
        self.sub_commands.iter().find(|sub| sub.name == name)
    }
}

// --- SETTINGS VALUES ---

/// A value stored for one option in a settings instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OptionValue {
    /// For string and positional options.
    Str(String),
    /// For boolean options.
    Bool(bool),
    /// For integer options.
    Int(i64),
}

impl OptionValue {
    /// Parses a raw command-line string into the value type expected by `kind`.
    pub fn parse_for(kind: OptionKind, raw: &str) -> Result<Self, String> {
        match kind {
            OptionKind::String | OptionKind::PositionalString => Ok(Self::Str(raw.to_string())),
            OptionKind::Integer if raw.is_empty() => Ok(Self::Str(String::new())),
            OptionKind::Integer => raw
                .trim()
                .parse::<i64>()
                .map(Self::Int)
                .map_err(|e| format!("'{}' is not a valid integer: {}", raw, e)),
            OptionKind::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(Self::Bool(true)),
                "false" | "no" | "off" | "0" => Ok(Self::Bool(false)),
                _ => Err(format!("'{}' is not a valid boolean", raw)),
            },
        }
    }

    /// Whether this value can be stored in an option of the given kind.
    ///
    /// An integer option also accepts the empty string, which is passed through as an
    /// empty value token.
    pub fn matches(&self, kind: OptionKind) -> bool {
        match (self, kind) {
            (Self::Str(s), OptionKind::Integer) => s.is_empty(),
            (Self::Str(_), OptionKind::String | OptionKind::PositionalString) => true,
            (Self::Bool(_), OptionKind::Boolean) | (Self::Int(_), OptionKind::Integer) => true,
            _ => false,
        }
    }

    /// Returns the boolean value, or `None` for non-boolean values.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the string value, or `None` for non-string values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer value, or `None` for non-integer values.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&String> for OptionValue {
    fn from(value: &String) -> Self {
        Self::Str(value.clone())
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for OptionValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u16> for OptionValue {
    fn from(value: u16) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for OptionValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

// --- INVOCATION OUTPUT ---

/// The stream a captured line came from.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    /// Standard output.
    Std,
    /// Standard error.
    Err,
}

/// One line captured from the child process.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    /// The stream the line came from.
    #[serde(rename = "type")]
    pub kind: OutputType,
    /// The line without its terminator.
    pub text: String,
}

impl OutputLine {
    /// Creates a line captured from standard output.
    pub fn std(text: impl Into<String>) -> Self {
        Self {
            kind: OutputType::Std,
            text: text.into(),
        }
    }

    /// Creates a line captured from standard error.
    pub fn err(text: impl Into<String>) -> Self {
        Self {
            kind: OutputType::Err,
            text: text.into(),
        }
    }
}

/// The outcome of a successful invocation: every captured line in arrival order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct InvocationResult {
    /// Captured lines from both streams.
    pub output: Vec<OutputLine>,
    /// Always `0`; failures are reported as errors.
    pub exit_code: i32,
}

impl InvocationResult {
    /// Iterates over the text of the standard output lines only.
    pub fn std_lines(&self) -> impl Iterator<Item = &str> {
        self.output
            .iter()
            .filter(|line| line.kind == OutputType::Std)
            .map(|line| line.text.as_str())
    }

    /// Iterates over the text of the standard error lines only.
    pub fn err_lines(&self) -> impl Iterator<Item = &str> {
        self.output
            .iter()
            .filter(|line| line.kind == OutputType::Err)
            .map(|line| line.text.as_str())
    }
}

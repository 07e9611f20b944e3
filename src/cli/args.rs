// src/cli/args.rs
use clap::{Args, Parser};
use std::path::PathBuf;

/// Option values for the sub-command being run.
#[derive(Args, Debug, Default, Clone)]
pub struct OptionArgs {
    /// Set an option (e.g., "output=dist"). Repeatable.
    #[arg(long = "set", value_name = "NAME=VALUE")]
    pub set: Vec<String>,

    /// Set a boolean option to true. Repeatable.
    #[arg(long, value_name = "NAME")]
    pub enable: Vec<String>,

    /// Set a boolean option to false. Repeatable.
    #[arg(long, value_name = "NAME")]
    pub disable: Vec<String>,
}

/// How the external process is started.
#[derive(Args, Debug, Default, Clone)]
pub struct ProcessArgs {
    /// Working directory of the tool. `~` and `$VAR` are expanded.
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<String>,

    /// Environment variable for the tool (e.g., "KEY=VALUE"). Repeatable.
    #[arg(long, value_name = "KEY=VALUE")]
    pub env: Vec<String>,

    /// Kill the tool after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Run this executable instead of resolving one.
    #[arg(long, value_name = "PATH")]
    pub tool_path: Option<PathBuf>,

    /// Do not print the tool's output while it runs.
    #[arg(long)]
    pub quiet: bool,
}

/// Arguments of a tool sub-command.
#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)] // The sub-command name is consumed by the dispatcher.
pub struct SubCommandArgs {
    /// Option values.
    #[command(flatten)]
    pub options: OptionArgs,

    /// Process settings.
    #[command(flatten)]
    pub process: ProcessArgs,

    /// Print the compiled command line instead of running it.
    #[arg(long)]
    pub dry_run: bool,

    /// Raw arguments appended after the compiled ones (after `--`).
    #[arg(last = true)]
    pub extra: Vec<String>,
}

/// Arguments of the `raw` action.
#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct RawArgs {
    /// The argument string, split with shell quoting rules.
    #[arg(allow_hyphen_values = true)]
    pub arguments: String,

    /// Process settings.
    #[command(flatten)]
    pub process: ProcessArgs,
}

/// Arguments of the `describe` action.
#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct DescribeArgs {
    /// Only describe this sub-command.
    pub sub_command: Option<String>,
}

/// Arguments of the `batch` action.
#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct BatchArgs {
    /// The sub-command every combination runs.
    pub sub_command: String,

    /// An axis of values (e.g., "output=dist,public"). Repeatable; the first varies slowest.
    #[arg(long, value_name = "NAME=V1,V2")]
    pub combine: Vec<String>,

    /// Maximum number of concurrent invocations.
    #[arg(long, default_value_t = 1)]
    pub parallel: usize,

    /// Keep going after a failure and report every failure at the end.
    #[arg(long)]
    pub complete_on_failure: bool,

    /// Option values shared by every combination.
    #[command(flatten)]
    pub options: OptionArgs,

    /// Process settings shared by every combination.
    #[command(flatten)]
    pub process: ProcessArgs,
}

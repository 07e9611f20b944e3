use clap::Parser;
use std::path::PathBuf;

/// Per-action argument structs.
pub mod args;
/// Action handlers.
pub mod handlers;

/// retype-tasks: run the Retype static-site generator with typed, ordered options.
///
/// Usage:
///   retype-tasks [GLOBAL OPTIONS] <sub-command> [--set name=value]... [--enable name]...
///   retype-tasks [GLOBAL OPTIONS] raw "<arguments>"
///   retype-tasks [GLOBAL OPTIONS] describe [sub-command]
///   retype-tasks [GLOBAL OPTIONS] batch <sub-command> --combine name=v1,v2 [--parallel N]
#[derive(Parser, Debug, Default)]
#[command(
    author,
    version,
    about,
    styles = clap::builder::Styles::styled()
        .header(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .usage(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .literal(clap::builder::styling::AnsiColor::Cyan.on_default().bold())
        .placeholder(clap::builder::styling::AnsiColor::Green.on_default()),
)]
#[command(disable_help_subcommand = true)]
#[command(trailing_var_arg = true)]
pub struct Cli {
    /// Configuration file. Defaults to `<config dir>/retype-tasks/config.toml`.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Tool descriptor (JSON or TOML) replacing the built-in one.
    #[arg(long, value_name = "FILE")]
    pub descriptor: Option<PathBuf>,

    /// Package version to resolve from the package cache.
    #[arg(long = "version-pin", value_name = "VERSION")]
    pub version_pin: Option<String>,

    /// The action followed by its arguments.
    #[arg(allow_hyphen_values = true)]
    pub args: Vec<String>,
}

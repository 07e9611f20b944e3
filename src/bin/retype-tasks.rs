// src/bin/retype-tasks.rs

use anyhow::Result;
use clap::Parser;
use colored::*;
use retype_tasks::{
    InvokeError,
    cli::{Cli, handlers},
};

// --- Command Definition and Registry ---

/// A built-in action and its handler. Anything else on the command line is treated as a
/// sub-command of the tool descriptor.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    handler: fn(Vec<String>, &Cli) -> Result<()>,
}

static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "batch",
        aliases: &[],
        handler: handlers::batch::handle,
    },
    CommandDefinition {
        name: "describe",
        aliases: &["options"],
        handler: handlers::describe::handle,
    },
    CommandDefinition {
        name: "raw",
        aliases: &[],
        handler: handlers::raw::handle,
    },
];

/// Finds a command definition in the registry by its name or alias.
fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

/// Sets up logging, dispatches to the handler and maps errors to exit codes.
/// A failed tool run exits with the tool's own exit code.
fn main() {
    env_logger::init();

    if let Err(e) = run_cli(Cli::parse()) {
        if let Some(invoke_err) = e.downcast_ref::<InvokeError>() {
            eprintln!("\n{}: {}", "Error".red().bold(), invoke_err);
            std::process::exit(invoke_err.exit_code().filter(|code| *code != 0).unwrap_or(1));
        }
        eprintln!("\n{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let Some((action, rest)) = cli.args.split_first() else {
        println!(
            "{}",
            "Nothing to do. Try `retype-tasks describe` or `retype-tasks build --dry-run`.".yellow()
        );
        return Ok(());
    };
    let rest = rest.to_vec();

    match find_command(action) {
        Some(command) => (command.handler)(rest, &cli),
        None => {
            // Not a built-in action, so it names a sub-command of the tool.
            let mut run_args = vec![action.clone()];
            run_args.extend(rest);
            handlers::run::handle(run_args, &cli)
        }
    }
}

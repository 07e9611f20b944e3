// src/cli/handlers/run.rs

use crate::cli::{Cli, args::SubCommandArgs, handlers::commons};
use anyhow::{Result, anyhow};
use clap::Parser;
use colored::*;

/// Main entry point for running one sub-command of the descriptor.
/// The dispatcher guarantees that the sub-command name is the first argument.
pub fn handle(mut args: Vec<String>, cli: &Cli) -> Result<()> {
    if args.is_empty() {
        return Err(anyhow!("Internal error: 'run' handler called without a sub-command."));
    }
    let sub_command = args.remove(0);
    let run_args = SubCommandArgs::try_parse_from(&args)?;

    let tasks = commons::prepare_tasks(cli)?;
    let spec = commons::sub_command_spec(&tasks, &sub_command)?;

    let settings = commons::apply_options(
        tasks.settings(&spec.name)?,
        spec,
        &run_args.options,
    )?
    .with_process(commons::process_settings(&run_args.process)?)
    .with_extra_arguments(run_args.extra.iter().cloned());

    if run_args.dry_run {
        let compiled = tasks.compile(&settings)?;
        let program = match tasks.resolve(settings.process()) {
            Ok(path) => path.display().to_string(),
            Err(e) => {
                log::debug!("Dry run without a resolvable executable: {}", e);
                tasks.descriptor().name.clone()
            }
        };
        println!("{} {} {}", "─>".dimmed(), program.green(), compiled.redacted());
        return Ok(());
    }

    let result = tasks.execute(&settings)?;
    log::debug!(
        "'{}' finished with {} output line(s)",
        sub_command,
        result.output.len()
    );
    Ok(())
}

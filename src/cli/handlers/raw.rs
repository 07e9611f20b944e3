// src/cli/handlers/raw.rs

use crate::cli::{Cli, args::RawArgs, handlers::commons};
use anyhow::Result;
use clap::Parser;

/// Runs the tool with a raw argument string, bypassing option compilation.
pub fn handle(args: Vec<String>, cli: &Cli) -> Result<()> {
    let raw_args = RawArgs::try_parse_from(&args)?;
    let tasks = commons::prepare_tasks(cli)?;
    let process = commons::process_settings(&raw_args.process)?;
    tasks.invoke_raw_with(&raw_args.arguments, &process)?;
    Ok(())
}

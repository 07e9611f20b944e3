// src/cli/handlers/batch.rs

use crate::{
    cli::{Cli, args::BatchArgs, handlers::commons},
    core::{
        batch::{BatchError, BatchOptions, Combinations},
        commons::split_assignment,
        settings::Settings,
    },
    models::{OptionValue, SubCommandSpec},
};
use anyhow::{Result, anyhow};
use clap::Parser;
use colored::*;

/// Runs a sub-command once per combination of the `--combine` axes.
pub fn handle(args: Vec<String>, cli: &Cli) -> Result<()> {
    let batch_args = BatchArgs::try_parse_from(&args)?;
    let tasks = commons::prepare_tasks(cli)?;
    let spec = commons::sub_command_spec(&tasks, &batch_args.sub_command)?;

    let base = commons::apply_options(tasks.settings(&spec.name)?, spec, &batch_args.options)?
        .with_process(commons::process_settings(&batch_args.process)?);

    let mut combinations = Combinations::new(base);
    for axis in &batch_args.combine {
        let (name, values) = parse_axis(spec, axis)?;
        combinations = combinations.combine_with(name, values);
    }

    let total = combinations.len();
    if total == 0 {
        println!("{}", "No combinations to run.".yellow());
        return Ok(());
    }

    let options = BatchOptions {
        degree_of_parallelism: batch_args.parallel,
        complete_on_failure: batch_args.complete_on_failure,
    };
    println!(
        "{} {} invocation(s) of '{}' ({} at a time)",
        "┌─ Batch:".dimmed(),
        total,
        spec.name.cyan(),
        options.degree_of_parallelism.max(1)
    );

    match tasks.batch(&combinations, &options) {
        Ok(results) => {
            println!(
                "{} {} of {} succeeded.",
                "└─ End batch.".dimmed(),
                results.len(),
                total
            );
            Ok(())
        }
        Err(BatchError::ThreadPool(e)) => Err(anyhow!(e)),
        Err(e) => {
            let expanded = combinations.expand();
            for (index, error) in e.failures() {
                let label = expanded
                    .get(index)
                    .map(settings_label)
                    .unwrap_or_default();
                eprintln!("{} #{} [{}]: {}", "├─>".red(), index, label, error);
            }
            Err(anyhow!(e.to_string()))
        }
    }
}

fn settings_label(settings: &Settings) -> String {
    settings
        .values()
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses `name=v1,v2,...` into typed values for `name`.
fn parse_axis<'a>(spec: &SubCommandSpec, axis: &'a str) -> Result<(&'a str, Vec<OptionValue>)> {
    let (name, raw_values) = split_assignment(axis)
        .ok_or_else(|| anyhow!("Invalid --combine '{}', expected NAME=V1,V2.", axis))?;
    let values = raw_values
        .split(',')
        .map(|raw| commons::parse_value(spec, name, raw.trim()))
        .collect::<Result<Vec<_>>>()?;
    Ok((name, values))
}

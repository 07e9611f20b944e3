// src/cli/handlers/commons.rs

// Shared helpers for the CLI handlers.

use anyhow::{Context, Result, anyhow};
use colored::Colorize;
use std::{sync::Arc, time::Duration};

use crate::{
    cli::{
        Cli,
        args::{OptionArgs, ProcessArgs},
    },
    context::OutputLogger,
    core::{
        commons::split_assignment,
        config::RunnerConfig,
        descriptor,
        paths,
        settings::{ProcessSettings, Settings},
    },
    models::{OptionKind, OptionValue, OutputType, SubCommandSpec},
    tasks::RetypeTasks,
};

/// Prints standard output as-is and standard error in red.
pub fn console_logger() -> OutputLogger {
    Arc::new(|kind, line| match kind {
        OutputType::Std => println!("{}", line),
        OutputType::Err => eprintln!("{}", line.red()),
    })
}

/// Builds the task runner from the configuration file and the global flags.
/// Flags win over the configuration file.
pub fn prepare_tasks(cli: &Cli) -> Result<RetypeTasks> {
    let config = match &cli.config {
        Some(path) => RunnerConfig::load(path)?,
        None => RunnerConfig::load_default()?,
    };

    let mut context = config.to_context()?.with_logger(console_logger());
    if let Some(version) = &cli.version_pin {
        context = context.with_version(version.clone());
    }

    let descriptor = match &cli.descriptor {
        Some(path) => Arc::new(descriptor::load(path)?),
        None => config.to_descriptor()?,
    };
    log::debug!("Using descriptor for '{}' and {:?}", descriptor.name, context);

    Ok(RetypeTasks::with_context(context).with_descriptor(descriptor)?)
}

/// Looks up a sub-command of the active descriptor.
pub fn sub_command_spec<'a>(tasks: &'a RetypeTasks, name: &str) -> Result<&'a SubCommandSpec> {
    tasks.descriptor().sub_command(name).ok_or_else(|| {
        let known: Vec<&str> = tasks
            .descriptor()
            .sub_commands
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        anyhow!(
            "Unknown sub-command '{}'. Available: {}",
            name.cyan(),
            known.join(", ")
        )
    })
}

/// Parses `raw` as a value of the named option.
pub fn parse_value(spec: &SubCommandSpec, name: &str, raw: &str) -> Result<OptionValue> {
    let option = spec.option(name).ok_or_else(|| {
        anyhow!(
            "Sub-command '{}' has no option named '{}'.",
            spec.name,
            name.cyan()
        )
    })?;
    OptionValue::parse_for(option.kind, raw).map_err(|e| anyhow!("Option '{}': {}", name, e))
}

/// Applies `--set`, `--enable` and `--disable` to `settings`.
pub fn apply_options(
    settings: Settings,
    spec: &SubCommandSpec,
    args: &OptionArgs,
) -> Result<Settings> {
    let mut settings = settings;
    for assignment in &args.set {
        let (name, raw) = split_assignment(assignment)
            .ok_or_else(|| anyhow!("Invalid --set '{}', expected NAME=VALUE.", assignment))?;
        settings = settings.set(name, parse_value(spec, name, raw)?);
    }
    for name in &args.enable {
        ensure_flag(spec, name)?;
        settings = settings.enable(name);
    }
    for name in &args.disable {
        ensure_flag(spec, name)?;
        settings = settings.disable(name);
    }
    Ok(settings)
}

fn ensure_flag(spec: &SubCommandSpec, name: &str) -> Result<()> {
    match spec.option(name) {
        Some(option) if option.kind == OptionKind::Boolean => Ok(()),
        Some(option) => Err(anyhow!(
            "Option '{}' is a {} option; use --set {}=VALUE.",
            name,
            option.kind,
            name
        )),
        None => Err(anyhow!(
            "Sub-command '{}' has no option named '{}'.",
            spec.name,
            name.cyan()
        )),
    }
}

/// Converts the process flags into process settings.
pub fn process_settings(args: &ProcessArgs) -> Result<ProcessSettings> {
    let mut process = ProcessSettings {
        tool_path: args.tool_path.clone(),
        timeout: args.timeout.map(Duration::from_secs),
        ..ProcessSettings::default()
    };

    if let Some(dir) = &args.cwd {
        process.working_directory = Some(
            paths::expand_path_template(dir)
                .with_context(|| format!("Invalid working directory '{}'", dir))?,
        );
    }
    for assignment in &args.env {
        let (key, value) = split_assignment(assignment)
            .ok_or_else(|| anyhow!("Invalid --env '{}', expected KEY=VALUE.", assignment))?;
        process.environment.insert(key.to_string(), value.to_string());
    }
    if args.quiet {
        process.log_output = Some(false);
    }
    Ok(process)
}

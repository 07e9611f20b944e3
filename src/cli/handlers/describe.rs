// src/cli/handlers/describe.rs

use crate::{
    cli::{Cli, args::DescribeArgs, handlers::commons},
    models::{OptionKind, SubCommandSpec, ToolDescriptor},
};
use anyhow::Result;
use clap::Parser;
use colored::*;
use std::fmt::Write;

/// Prints the sub-commands of the active descriptor and their options in emission order.
pub fn handle(args: Vec<String>, cli: &Cli) -> Result<()> {
    let describe_args = DescribeArgs::try_parse_from(&args)?;
    let tasks = commons::prepare_tasks(cli)?;

    let text = match &describe_args.sub_command {
        Some(name) => render_sub_command(commons::sub_command_spec(&tasks, name)?)?,
        None => render_descriptor(tasks.descriptor())?,
    };
    print!("{}", text);
    Ok(())
}

fn render_descriptor(descriptor: &ToolDescriptor) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "\n--- {} ---", descriptor.name.yellow())?;
    if let Some(help) = &descriptor.help {
        writeln!(out, "  {}", help.dimmed())?;
    }
    for sub in &descriptor.sub_commands {
        out.push_str(&render_sub_command(sub)?);
    }
    Ok(out)
}

fn render_sub_command(spec: &SubCommandSpec) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "\n{}", spec.name.green().bold())?;
    if let Some(help) = &spec.help {
        writeln!(out, "  {}", help.dimmed())?;
    }
    for option in spec.ordered_options() {
        let usage = match option.kind {
            OptionKind::String => format!("{} <{}>", option.cli_token, option.name),
            OptionKind::Integer => format!("{} <n>", option.cli_token),
            OptionKind::Boolean => option.cli_token.clone(),
            OptionKind::PositionalString => format!("<{}>", option.name),
        };
        let secret = if option.secret { " (secret)" } else { "" };
        writeln!(
            out,
            "  {:<24} {:<10} {}{}",
            usage.cyan(),
            option.name,
            option.help.as_deref().unwrap_or(""),
            secret.red()
        )?;
    }
    Ok(out)
}

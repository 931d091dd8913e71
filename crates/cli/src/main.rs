//! Entry point for the rejar CLI, a jar remapping and repair tool.
//!
//! Expands `--cfg` argument files, parses the command line, installs logging and
//! dispatches to the selected subcommand.

use anyhow::Context;
use clap::Parser;
use rejar_cli::commands::{expand_cfg_args, Cmd, Command};
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Command-line interface for rejar.
///
/// rejar renames the classes, fields, methods and parameters of a jar according to an
/// identifier mapping and optionally repairs record metadata, source file attributes and
/// illegal local variable names along the way.
#[derive(Parser)]
#[command(name = "rejar")]
#[command(about = "rejar: jar remapping and repair tool")]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

fn init_tracing(log: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = match log {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = expand_cfg_args(std::env::args())?;
    let cli = Cli::parse_from(args);
    init_tracing(cli.command.log_file())?;
    cli.command.execute()
}

use anyhow::Context;
use clap::Subcommand;
use std::fs;
use std::path::Path;

pub mod inspect;
pub mod reverse;
pub mod run;

#[derive(Subcommand)]
pub enum Cmd {
    /// Rename and repair a jar
    Run(run::RunArgs),

    /// Print the structure of a class as JSON
    Inspect(inspect::InspectArgs),

    /// Write the inverse of a mapping as TSRG
    Reverse(reverse::ReverseArgs),
}

impl Cmd {
    /// Log file requested on the command line, if any.
    pub fn log_file(&self) -> Option<&Path> {
        match self {
            Self::Run(args) => args.log.as_deref(),
            _ => None,
        }
    }
}

pub trait Command {
    fn execute(self) -> anyhow::Result<()>;
}

impl Command for Cmd {
    fn execute(self) -> anyhow::Result<()> {
        match self {
            Self::Run(args) => args.execute(),
            Self::Inspect(args) => args.execute(),
            Self::Reverse(args) => args.execute(),
        }
    }
}

/// Splices the lines of every `--cfg FILE` (or `--cfg=FILE`) into the argument list.
///
/// Each non-blank line of the file becomes one argument, so values containing spaces need
/// no quoting. Lines starting with `#` are skipped.
pub fn expand_cfg_args<I>(args: I) -> anyhow::Result<Vec<String>>
where
    I: IntoIterator<Item = String>,
{
    let mut out = Vec::new();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let path = if arg == "--cfg" {
            args.next().context("--cfg needs a file argument")?
        } else if let Some(path) = arg.strip_prefix("--cfg=") {
            path.to_owned()
        } else {
            out.push(arg);
            continue;
        };
        let text = fs::read_to_string(&path).with_context(|| format!("reading config file {path}"))?;
        out.extend(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_owned),
        );
    }
    Ok(out)
}

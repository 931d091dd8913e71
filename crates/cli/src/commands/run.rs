//! Module for the `run` subcommand, which renames and repairs a jar.
//!
//! The arguments are turned into a [`RenamerConfig`], validated and handed to the
//! [`Renamer`] pipeline. The run summary can be written out as JSON with `--emit`.

use anyhow::Context;
use clap::Args;
use rejar_transform::{
    FixOptions, IdentifierFixMode, RecordFixFlags, Renamer, RenamerConfig, SourceFixMode,
};
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Arguments for the `run` subcommand.
#[derive(Args)]
pub struct RunArgs {
    /// Input jar.
    #[arg(long)]
    pub input: PathBuf,
    /// Output jar (default: overwrite the input).
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Mapping file in SRG, CSRG, TSRG or TSRG2 format.
    #[arg(long, visible_alias = "names")]
    pub map: Option<PathBuf>,
    /// Apply the mapping in reverse.
    #[arg(long)]
    pub reverse: bool,
    /// Library jar consulted for inherited members; may be repeated.
    #[arg(long = "lib", short = 'e')]
    pub libs: Vec<PathBuf>,
    /// Worker threads (default: available parallelism).
    #[arg(long)]
    pub threads: Option<usize>,
    /// Rebuild record metadata: `components`, `signature` or both.
    #[arg(
        long = "record-fix",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "components,signature"
    )]
    pub record_fix: Option<RecordFixFlags>,
    /// Rewrite the SourceFile attribute: `java` or `basic`.
    #[arg(long = "src-fix", num_args = 0..=1, require_equals = true, default_missing_value = "java")]
    pub src_fix: Option<SourceFixMode>,
    /// Rename illegal local variable names: `all` or `snowmen`.
    #[arg(long = "ids-fix", num_args = 0..=1, require_equals = true, default_missing_value = "all")]
    pub ids_fix: Option<IdentifierFixMode>,
    /// Also write log output to this file.
    #[arg(long)]
    pub log: Option<PathBuf>,
    /// Path to emit the run report as JSON (optional).
    #[arg(long)]
    pub emit: Option<PathBuf>,
}

impl RunArgs {
    pub fn into_config(self) -> RenamerConfig {
        let mut config = RenamerConfig::new(self.input);
        config.output = self.output;
        config.mapping = self.map;
        config.reverse = self.reverse;
        config.libraries = self.libs;
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        config.fixes = FixOptions {
            record: self.record_fix,
            source: self.src_fix,
            identifiers: self.ids_fix,
        };
        config
    }
}

fn describe<T: std::fmt::Debug>(value: Option<T>) -> String {
    value.map_or_else(|| "off".to_owned(), |v| format!("{v:?}"))
}

impl super::Command for RunArgs {
    fn execute(self) -> anyhow::Result<()> {
        let emit = self.emit.clone();
        let config = self.into_config();

        info!("Input:   {}", config.input.display());
        info!("Output:  {}", config.output_path().display());
        match &config.mapping {
            Some(path) if config.reverse => info!("Mapping: {} (reversed)", path.display()),
            Some(path) => info!("Mapping: {}", path.display()),
            None => info!("Mapping: none"),
        }
        for lib in &config.libraries {
            info!("Library: {}", lib.display());
        }
        info!("Threads: {}", config.threads);
        info!("Record fix:     {}", describe(config.fixes.record));
        info!("Source fix:     {}", describe(config.fixes.source));
        info!("Identifier fix: {}", describe(config.fixes.identifiers));

        let renamer = Renamer::new(config)?;
        let report = renamer.run()?;

        for (name, count) in &report.changed {
            info!("  {name}: {count} classes changed");
        }
        if let Some(path) = emit {
            fs::write(&path, report.to_json()?)
                .with_context(|| format!("writing report to {}", path.display()))?;
            info!("Report written to {}", path.display());
        }
        Ok(())
    }
}

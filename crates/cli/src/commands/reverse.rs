//! Module for the `reverse` subcommand, which inverts a mapping file.

use anyhow::Context;
use clap::Args;
use rejar_core::mapping;
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Arguments for the `reverse` subcommand.
#[derive(Args)]
pub struct ReverseArgs {
    /// Mapping file in any supported format.
    #[arg(long, visible_alias = "names")]
    pub map: PathBuf,
    /// Where to write the inverted mapping (TSRG v2).
    #[arg(long)]
    pub output: PathBuf,
}

impl super::Command for ReverseArgs {
    fn execute(self) -> anyhow::Result<()> {
        let mappings = mapping::load(&self.map)?.reverse()?;
        fs::write(&self.output, mapping::write_tsrg2(&mappings))
            .with_context(|| format!("writing {}", self.output.display()))?;
        info!("Wrote {} reversed class mappings to {}", mappings.len(), self.output.display());
        Ok(())
    }
}

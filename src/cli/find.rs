//! `sprockets find`: list assets matching a name, glob or regex.

use anyhow::Result;
use clap::Args;

use super::common::{CommandContext, CommandExecutor};
use crate::asset::AssetRecord;
use crate::pattern::AssetFilter;

/// List matching assets without compiling them.
#[derive(Debug, Args)]
pub struct FindCommand {
    /// Logical name or glob
    pub pattern: String,

    /// Treat the pattern as a regular expression
    #[arg(long)]
    pub regex: bool,

    /// Print full asset records as JSON
    #[arg(long)]
    pub json: bool,
}

impl CommandExecutor for FindCommand {
    fn execute_with_context(self, context: &CommandContext) -> Result<()> {
        let filter = if self.regex {
            AssetFilter::regex(&self.pattern)?
        } else {
            AssetFilter::parse(&self.pattern)?
        };

        let assets = context.manifest.find(filter)?.to_vec()?;

        if self.json {
            let records: Vec<AssetRecord> = assets.into_iter().map(AssetRecord::from).collect();
            println!("{}", serde_json::to_string_pretty(&records)?);
            return Ok(());
        }

        for asset in &assets {
            let source = asset
                .source_paths
                .last()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            println!("{}\t{}", asset.logical_path, source);
        }
        Ok(())
    }
}

//! `sprockets clean`: drop old compiled versions.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::time::Duration;

use super::common::{CommandContext, CommandExecutor};

/// Remove compiled versions beyond the retention policy.
#[derive(Debug, Args)]
pub struct CleanCommand {
    /// Newest versions to keep per asset (default from sprockets.toml, else 2)
    #[arg(long)]
    pub keep: Option<usize>,

    /// Seconds an older version is kept anyway (default from sprockets.toml, else 3600)
    #[arg(long = "max-age")]
    pub max_age: Option<u64>,
}

impl CommandExecutor for CleanCommand {
    fn execute_with_context(self, context: &CommandContext) -> Result<()> {
        let keep = self.keep.unwrap_or(context.config.clean.keep);
        let max_age = self.max_age.map_or_else(|| context.config.max_age(), Duration::from_secs);

        let removed = context.manifest.clean(keep, max_age)?;
        for digest_path in &removed {
            context.say(format!("  {} {}", "-".red(), digest_path));
        }
        context.say(format!("{} {} old version(s)", "Removed".green().bold(), removed.len()));
        Ok(())
    }
}

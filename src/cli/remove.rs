//! `sprockets remove`: delete one compiled file.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, CommandExecutor};

/// Delete a compiled file and its manifest entry.
#[derive(Debug, Args)]
pub struct RemoveCommand {
    /// Digest path as listed in the manifest (e.g. application-<digest>.js)
    pub digest_path: String,
}

impl CommandExecutor for RemoveCommand {
    fn execute_with_context(self, context: &CommandContext) -> Result<()> {
        if context.manifest.remove(&self.digest_path)? {
            context.say(format!("{} {}", "Removed".green().bold(), self.digest_path));
        } else {
            context.say(format!("{} {} is not in the manifest", "Nothing to remove:".yellow(), self.digest_path));
        }
        Ok(())
    }
}

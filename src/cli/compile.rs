//! `sprockets compile`: build assets into the output directory.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, CommandExecutor};
use crate::core::SprocketsError;
use crate::environment::AssetEnvironment;
use crate::pattern::AssetFilter;

/// Compile assets and record them in the manifest.
#[derive(Debug, Args)]
pub struct CompileCommand {
    /// Logical names, absolute paths or globs. Defaults to `precompile` from
    /// sprockets.toml.
    pub names: Vec<String>,

    /// Treat every name as a regular expression
    #[arg(long)]
    pub regex: bool,
}

impl CompileCommand {
    fn filters(&self, context: &CommandContext) -> Result<Vec<AssetFilter>> {
        let names = if self.names.is_empty() {
            &context.config.precompile
        } else {
            &self.names
        };
        if names.is_empty() {
            return Err(SprocketsError::ConfigError {
                message: "nothing to compile; pass asset names or set precompile in sprockets.toml".to_string(),
            }
            .into());
        }

        names
            .iter()
            .map(|name| {
                if self.regex {
                    AssetFilter::regex(name)
                } else {
                    AssetFilter::parse(name)
                }
            })
            .collect()
    }
}

impl CommandExecutor for CompileCommand {
    fn execute_with_context(self, context: &CommandContext) -> Result<()> {
        let filters = self.filters(context)?;
        let assets = context.manifest.compile(filters)?;

        for asset in &assets {
            context.say(format!(
                "  {} {} -> {}",
                "✓".green(),
                asset.logical_path,
                context.environment.digest_path_for(asset)
            ));
        }
        context.say(format!(
            "{} {} asset(s) into {}",
            "Compiled".green().bold(),
            assets.len(),
            context.manifest.directory().display()
        ));
        Ok(())
    }
}

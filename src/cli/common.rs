//! Common utilities and traits for CLI commands

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::config::ProjectConfig;
use crate::core::SprocketsError;
use crate::environment::{Environment, EnvironmentHandle};
use crate::manifest::Manifest;

/// Command-line overrides applied on top of `sprockets.toml`.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Explicit config file
    pub config: Option<PathBuf>,
    /// Load paths replacing the configured ones when non-empty
    pub load_paths: Vec<PathBuf>,
    /// Output directory
    pub output: Option<PathBuf>,
    /// Manifest index file or directory
    pub manifest: Option<PathBuf>,
}

/// Everything a subcommand needs: resolved configuration, environment and
/// manifest.
pub struct CommandContext {
    /// Configuration after overrides
    pub config: ProjectConfig,
    /// Asset environment over the configured load paths
    pub environment: Arc<Environment>,
    /// Manifest for the output directory
    pub manifest: Manifest,
    /// Suppress informational output
    pub quiet: bool,
}

impl CommandContext {
    /// Loads the configuration, applies `overrides` and opens the manifest.
    pub fn from_overrides(overrides: &Overrides, quiet: bool) -> Result<Self> {
        let mut config = ProjectConfig::load_or_default(overrides.config.as_deref())?;

        let cwd = std::env::current_dir().context("Cannot determine current working directory")?;
        if !overrides.load_paths.is_empty() {
            config.load_paths = overrides.load_paths.iter().map(|p| cwd.join(p)).collect();
        }
        if let Some(output) = &overrides.output {
            config.output = cwd.join(output);
        }
        if let Some(manifest) = &overrides.manifest {
            config.manifest = Some(cwd.join(manifest));
        }

        if config.load_paths.is_empty() {
            return Err(SprocketsError::ConfigError {
                message: "no load paths configured; pass --load-path or set load_paths in sprockets.toml"
                    .to_string(),
            }
            .into());
        }

        debug!("Using load paths {:?}, output {}", config.load_paths, config.output.display());
        let environment = Arc::new(Environment::new(config.load_paths.clone())?);
        let handle: EnvironmentHandle = environment.clone();
        let manifest = match &config.manifest {
            Some(index) => Manifest::with_locations(Some(handle), &config.output, index)?,
            None => Manifest::new(Some(handle), &config.output)?,
        };

        Ok(Self {
            config,
            environment,
            manifest,
            quiet,
        })
    }

    /// Prints `message` unless running quietly.
    pub fn say(&self, message: impl std::fmt::Display) {
        if !self.quiet {
            println!("{message}");
        }
    }
}

/// Common trait for CLI command execution pattern
pub trait CommandExecutor: Sized {
    /// Run the command against a prepared context.
    fn execute_with_context(self, context: &CommandContext) -> Result<()>;
}

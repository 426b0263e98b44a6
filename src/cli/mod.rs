//! Command-line interface for the `sprockets` asset pipeline.
//!
//! # Available Commands
//!
//! - `compile` - Build assets and write digest-named files into the output directory
//! - `clean` - Remove compiled versions beyond the retention policy
//! - `remove` - Delete one compiled file and its manifest entry
//! - `find` - List assets matching a name, glob or regex
//!
//! # Global Options
//!
//! All commands support these global options:
//! - `--config` - Path to `sprockets.toml` (otherwise searched upwards from the current directory)
//! - `--load-path` - Source directory, repeatable; replaces configured load paths
//! - `--output` - Output directory for compiled files
//! - `--manifest` - Manifest index file or directory
//! - `--verbose` - Enable debug output
//! - `--quiet` - Suppress all output except errors
//!
//! # Example
//!
//! ```bash
//! sprockets -I app/assets compile application.js "*.css"
//! sprockets find "*.js" --json
//! sprockets clean --keep 3 --max-age 600
//! ```

mod clean;
pub mod common;
mod compile;
mod find;
mod remove;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use common::{CommandContext, CommandExecutor, Overrides};

/// Runtime configuration derived from global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter directive; `None` defers to `RUST_LOG`
    pub log_level: Option<String>,

    /// Suppress informational output
    pub quiet: bool,

    /// Path and location overrides
    pub overrides: Overrides,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter used for the tracing subscriber.
    ///
    /// An explicit level wins; otherwise `RUST_LOG` is honored and falls back
    /// to `warn`.
    #[must_use]
    pub fn log_filter(&self) -> EnvFilter {
        match &self.log_level {
            Some(level) => EnvFilter::new(level),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        }
    }

    /// Installs a stderr subscriber. Repeated calls are ignored.
    pub fn init_logging(&self) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(self.log_filter())
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

/// Main CLI structure.
#[derive(Parser)]
#[command(
    name = "sprockets",
    about = "Directive-driven asset pipeline",
    version,
    long_about = "Resolves require/include directives across load paths, concatenates assets \
                  and writes digest-named files tracked by a JSON manifest."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to sprockets.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Source directory searched for logical names (repeatable)
    #[arg(short = 'I', long = "load-path", global = true)]
    load_paths: Vec<PathBuf>,

    /// Output directory for compiled files
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Manifest index file or directory
    #[arg(long, global = true)]
    manifest: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile assets into the output directory
    Compile(compile::CompileCommand),

    /// Remove old compiled versions
    Clean(clean::CleanCommand),

    /// Delete one compiled file
    Remove(remove::RemoveCommand),

    /// List matching assets
    Find(find::FindCommand),
}

impl Cli {
    /// Runs the selected subcommand.
    pub fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config)
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            Some("error".to_string())
        } else {
            None
        };

        CliConfig {
            log_level,
            quiet: self.quiet,
            overrides: Overrides {
                config: self.config.clone(),
                load_paths: self.load_paths.clone(),
                output: self.output.clone(),
                manifest: self.manifest.clone(),
            },
        }
    }

    pub fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging();
        let context = CommandContext::from_overrides(&config.overrides, config.quiet)?;

        match self.command {
            Commands::Compile(cmd) => cmd.execute_with_context(&context),
            Commands::Clean(cmd) => cmd.execute_with_context(&context),
            Commands::Remove(cmd) => cmd.execute_with_context(&context),
            Commands::Find(cmd) => cmd.execute_with_context(&context),
        }
    }
}

//! Project configuration (`sprockets.toml`).
//!
//! The configuration file describes where sources live and where compiled
//! output goes. Command-line flags override every value.
//!
//! ```toml
//! # Directories searched for logical names, in order
//! load_paths = ["app/assets/javascripts", "app/assets/stylesheets", "vendor/assets"]
//!
//! # Output directory for digest-named files
//! output = "public/assets"
//!
//! # Optional explicit manifest index (file or directory); defaults to `output`
//! manifest = "public/assets/.sprockets-manifest.json"
//!
//! # Names and globs compiled by `sprockets compile` without arguments
//! precompile = ["application.js", "application.css", "*.png"]
//!
//! [clean]
//! keep = 2         # newest versions kept per logical path
//! max_age = 3600   # seconds an older version survives
//! ```
//!
//! Relative paths are resolved against the directory containing the file.
//! Without a file, the current directory is used and every value takes its
//! default.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::core::SprocketsError;

/// File name looked up from the current directory upwards.
pub const CONFIG_FILE_NAME: &str = "sprockets.toml";

/// Settings for `clean`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CleanConfig {
    /// Newest versions always kept per logical path
    #[serde(default = "default_keep")]
    pub keep: usize,
    /// Seconds an older version is kept regardless of `keep`
    #[serde(default = "default_max_age")]
    pub max_age: u64,
}

const fn default_keep() -> usize {
    2
}

const fn default_max_age() -> u64 {
    3600
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            keep: default_keep(),
            max_age: default_max_age(),
        }
    }
}

/// Contents of `sprockets.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Directories searched for sources
    #[serde(default)]
    pub load_paths: Vec<PathBuf>,
    /// Output directory for compiled files
    #[serde(default = "default_output")]
    pub output: PathBuf,
    /// Manifest index file or directory, when not `output`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<PathBuf>,
    /// Default compile targets
    #[serde(default)]
    pub precompile: Vec<String>,
    /// Retention policy
    #[serde(default)]
    pub clean: CleanConfig,
}

fn default_output() -> PathBuf {
    PathBuf::from("public/assets")
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            load_paths: Vec::new(),
            output: default_output(),
            manifest: None,
            precompile: Vec::new(),
            clean: CleanConfig::default(),
        }
    }
}

impl ProjectConfig {
    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`SprocketsError::ConfigError`] for unreadable files, invalid
    /// TOML and unknown keys.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = toml::from_str(&content).map_err(|e| SprocketsError::ConfigError {
            message: format!("{}: {}", path.display(), e.message()),
        })?;

        let base = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        config.resolve_relative_to(&base);
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Loads `explicit` when given, otherwise the nearest `sprockets.toml`
    /// above the current directory, otherwise defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let cwd = std::env::current_dir().context("Cannot determine current working directory")?;
        match find_config_from(cwd.clone()) {
            Some(path) => Self::load(&path),
            None => {
                debug!("No {} found; using defaults", CONFIG_FILE_NAME);
                let mut config = Self::default();
                config.resolve_relative_to(&cwd);
                Ok(config)
            }
        }
    }

    /// Joins every relative path onto `base`.
    pub fn resolve_relative_to(&mut self, base: &Path) {
        let absolutize = |path: &Path| {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                base.join(path)
            }
        };

        self.load_paths = self.load_paths.iter().map(|p| absolutize(p)).collect();
        self.output = absolutize(&self.output);
        self.manifest = self.manifest.as_deref().map(absolutize);
    }

    /// `clean.max_age` as a [`Duration`].
    #[must_use]
    pub const fn max_age(&self) -> Duration {
        Duration::from_secs(self.clean.max_age)
    }
}

/// Finds `sprockets.toml` in `current` or its ancestors.
#[must_use]
pub fn find_config_from(mut current: PathBuf) -> Option<PathBuf> {
    loop {
        let candidate = current.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

//! Sprockets - a directive-driven asset pipeline
//!
//! Source files declare their dependencies in a leading comment header
//! (`//= require foo`, `/*= require_tree ./lib */`). The pipeline resolves
//! those directives across an ordered list of load paths, concatenates the
//! results into a single asset and writes it under a content-addressed name
//! (`application-<digest>.js`). A JSON manifest in the output directory maps
//! logical names to their compiled versions so stale copies can be cleaned.
//!
//! # Architecture Overview
//!
//! - Logical paths (`application.js`) are resolved against load paths in order
//! - Directive headers form a dependency graph that is expanded depth-first
//! - Every source is included at most once per asset
//! - Compiled files are immutable; the manifest tracks which one is current
//!
//! # Core Modules
//!
//! - [`directive`] - Header parsing for `require`-style directives
//! - [`resolver`] - Depth-first expansion of directives into an ordered source list
//! - [`environment`] - Load paths, logical name lookup and source rendering
//! - [`asset`] - The built, digest-carrying asset
//! - [`manifest`] - Compile/find/remove/clean over an output directory
//! - [`pattern`] - Name, glob, regex and predicate filters for asset lookup
//!
//! ## Supporting Modules
//!
//! - [`cli`] - The `sprockets` command line
//! - [`config`] - `sprockets.toml` project configuration
//! - [`core`] - Error types and user-facing error rendering
//! - [`utils`] - Atomic writes and path helpers
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sprockets_cli::environment::{Environment, EnvironmentHandle};
//! use sprockets_cli::manifest::Manifest;
//!
//! # fn main() -> anyhow::Result<()> {
//! let environment: EnvironmentHandle = Arc::new(Environment::new(vec!["app/assets".into()])?);
//! let manifest = Manifest::new(Some(environment), "public/assets")?;
//!
//! for asset in manifest.compile(["application.js", "*.css"])? {
//!     println!("{} -> {}", asset.logical_path, asset.digest_path());
//! }
//! manifest.clean(2, std::time::Duration::from_secs(3600))?;
//! # Ok(())
//! # }
//! ```

pub mod asset;
pub mod cli;
pub mod config;
pub mod core;
pub mod directive;
pub mod environment;
pub mod manifest;
pub mod pattern;
pub mod resolver;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

//! Test utilities for the asset pipeline
//!
//! Helpers shared by unit tests and the integration suite: temporary asset
//! trees with controllable modification times, sample configuration files and
//! one-time logging setup.
//!
//! # Example
//!
//! ```rust,no_run
//! use sprockets_cli::test_utils::FixtureTree;
//!
//! let tree = FixtureTree::new()
//!     .file("application.js", "//= require project\n")
//!     .file("project.js", "var Project = {};\n");
//! assert!(tree.join("project.js").exists());
//! ```

pub mod fixtures;

pub use fixtures::{ConfigFixture, FixtureTree};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. With `level` set, that level is used;
/// otherwise `RUST_LOG` is honoured, and without either nothing is logged.
///
/// ```bash
/// RUST_LOG=sprockets_cli=trace cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

//! File system utilities for build outputs and manifest persistence.
//!
//! All writes go through [`atomic_write`], so readers never observe a
//! partially written asset or manifest index.
//!
//! ```rust,no_run
//! use sprockets_cli::utils::fs::{atomic_write, ensure_dir};
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! ensure_dir(Path::new("public/assets"))?;
//! atomic_write(Path::new("public/assets/manifest.json"), b"{}")?;
//! # Ok(())
//! # }
//! ```

pub mod atomic;
pub mod dirs;
pub mod paths;

pub use atomic::atomic_write;
pub use dirs::{ensure_dir, ensure_parent_dir};
pub use paths::{is_safe_path, normalize_path};

//! Filesystem utilities
//!
//! - [`fs`] - atomic writes, directory creation, lexical path normalization
//!   and load-path boundary checks

pub mod fs;

pub use fs::{atomic_write, ensure_dir, ensure_parent_dir, is_safe_path, normalize_path};

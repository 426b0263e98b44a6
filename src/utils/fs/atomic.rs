//! Atomic file write operations using a temp-and-rename strategy.
//!
//! This module provides safe, atomic file writing that prevents corruption
//! from interrupted writes. Both digest-named outputs and the manifest index
//! are persisted through it.

use crate::utils::fs::dirs::ensure_parent_dir;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically writes bytes to a file using a write-then-rename strategy.
///
/// 1. Writes content to a uniquely named temporary file in the target directory
/// 2. Syncs the temporary file to disk
/// 3. Renames the temporary file over the target path
///
/// The temporary file lives next to the target so the final rename never
/// crosses a filesystem boundary. If any step fails the temporary file is
/// removed and the target keeps its previous content.
///
/// # Examples
///
/// ```rust,no_run
/// use sprockets_cli::utils::fs::atomic_write;
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// atomic_write(Path::new("public/assets/application-3f2a.js"), b"var app = {};\n")?;
/// # Ok(())
/// # }
/// ```
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    ensure_parent_dir(path)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir).with_context(|| {
        format!(
            "Failed to create temp file in: {}\n\nCheck file permissions and that directory exists",
            dir.display()
        )
    })?;

    temp.write_all(content)
        .with_context(|| format!("Failed to write to temp file: {}", temp.path().display()))?;

    temp.as_file().sync_all().with_context(|| "Failed to sync file to disk")?;

    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;

    Ok(())
}

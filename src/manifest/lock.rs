//! Cross-process locking for manifest updates.
//!
//! Every read-modify-persist cycle on a manifest index holds an exclusive
//! advisory lock on `.sprockets-manifest.lock` in the index's directory. The
//! in-process `Mutex` on the manifest state serializes threads; this lock
//! serializes separate `sprockets` processes sharing an output directory.
//!
//! The lock file name does not depend on the index file name, so a legacy
//! index being migrated to its canonical name stays under the same lock.

use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::trace;

/// Name of the lock file created next to the manifest index.
pub const LOCK_FILE_NAME: &str = ".sprockets-manifest.lock";

/// Exclusive lock held for the lifetime of the value.
#[derive(Debug)]
pub struct ManifestLock {
    file: File,
    path: PathBuf,
}

impl ManifestLock {
    /// Blocks until the lock for `directory` is acquired.
    ///
    /// Creates `directory` when it does not exist yet.
    pub fn acquire(directory: &Path) -> Result<Self> {
        std::fs::create_dir_all(directory).map_err(|e| {
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                anyhow::anyhow!(
                    "Permission denied: cannot create manifest directory {}",
                    directory.display()
                )
            } else {
                anyhow::anyhow!("Failed to create directory {}: {}", directory.display(), e)
            }
        })?;

        let path = directory.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .with_context(|| format!("Failed to open lock file: {}", path.display()))?;

        file.lock_exclusive()
            .with_context(|| format!("Failed to acquire manifest lock: {}", path.display()))?;
        trace!("Acquired manifest lock {}", path.display());

        Ok(Self { file, path })
    }
}

impl Drop for ManifestLock {
    fn drop(&mut self) {
        #[allow(unstable_name_collisions)]
        if let Err(e) = self.file.unlock() {
            tracing::warn!("Failed to unlock {}: {}", self.path.display(), e);
        }
    }
}

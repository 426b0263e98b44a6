//! Reading and writing the manifest index.
//!
//! - Loading treats a missing, blank or malformed index as empty
//! - Saving writes through [`atomic_write`] and migrates legacy names first
//! - [`Manifest::transaction`] wraps a mutation in both locks

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::{Manifest, ManifestData, ManifestLock, ManifestState, generate_filename};
use crate::core::SprocketsError;
use crate::utils::atomic_write;

/// Reads the index at `path`.
///
/// Missing, blank and unparsable files yield an empty index. Other I/O errors
/// (permissions, a directory in the way) are returned.
pub(super) fn read_data(path: &Path) -> Result<ManifestData> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ManifestData::default()),
        Err(e) => {
            return Err(anyhow::Error::from(e)
                .context(format!("Failed to read manifest {}", path.display())));
        }
    };

    if content.trim().is_empty() {
        return Ok(ManifestData::default());
    }

    match serde_json::from_str(&content) {
        Ok(data) => Ok(data),
        Err(e) => {
            let error = SprocketsError::ManifestParseError {
                file: path.display().to_string(),
                reason: e.to_string(),
            };
            warn!("{error} ({e}); starting from an empty manifest");
            Ok(ManifestData::default())
        }
    }
}

impl Manifest {
    /// Runs `mutate` on a freshly loaded copy of the index and persists the
    /// result.
    ///
    /// Holds the state mutex and the on-disk [`ManifestLock`] throughout. If
    /// `mutate` fails nothing is saved and the in-memory index is unchanged.
    pub(super) fn transaction<T>(&self, mutate: impl FnOnce(&mut ManifestData) -> Result<T>) -> Result<T> {
        let mut state = self.lock_state();
        let _lock = ManifestLock::acquire(&index_directory(&state.filename))?;

        let mut data = read_data(&state.filename)?;
        let result = mutate(&mut data)?;

        save(&mut state, &data)?;
        state.data = data;
        Ok(result)
    }

    /// Re-reads the index from disk, discarding the in-memory copy.
    pub fn reload(&self) -> Result<()> {
        let mut state = self.lock_state();
        state.data = read_data(&state.filename)?;
        Ok(())
    }
}

fn save(state: &mut ManifestState, data: &ManifestData) -> Result<()> {
    let json = serde_json::to_string_pretty(data).map_err(SprocketsError::from)?;

    if state.legacy {
        let canonical = index_directory(&state.filename).join(generate_filename());
        if state.filename.exists() {
            std::fs::rename(&state.filename, &canonical).with_context(|| {
                format!(
                    "Failed to migrate legacy manifest {} to {}",
                    state.filename.display(),
                    canonical.display()
                )
            })?;
        }
        info!(
            "Migrated legacy manifest {} to {}",
            state.filename.display(),
            canonical.display()
        );
        state.filename = canonical;
        state.legacy = false;
    }

    atomic_write(&state.filename, json.as_bytes())
        .with_context(|| format!("Failed to save manifest {}", state.filename.display()))
}

fn index_directory(filename: &Path) -> PathBuf {
    filename
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_missing_blank_and_invalid() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("manifest.json");
        assert_eq!(read_data(&path).unwrap(), ManifestData::default());

        std::fs::write(&path, "   \n").unwrap();
        assert_eq!(read_data(&path).unwrap(), ManifestData::default());

        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(read_data(&path).unwrap(), ManifestData::default());
    }

    #[test]
    fn test_entries_without_digest_are_kept() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("manifest.json");
        std::fs::write(
            &path,
            r#"{"files":{"a-abc.js":{"logical_path":"a.js","mtime":"2011-12-13T21:47:08-06:00","size":3}},"assets":{"a.js":"a-abc.js"}}"#,
        )
        .unwrap();

        let data = read_data(&path).unwrap();
        assert_eq!(data.files.len(), 1);
        assert_eq!(data.assets["a.js"], "a-abc.js");
        let entry = &data.files["a-abc.js"];
        assert_eq!(entry.logical_path, "a.js");
        assert_eq!(entry.size, 3);
        assert!(entry.digest.is_empty());
    }

    #[test]
    fn test_legacy_manifest_migrated_on_save() {
        let temp = TempDir::new().unwrap();
        let legacy = temp.path().join("manifest.json");
        std::fs::write(
            &legacy,
            r#"{"files": {}, "assets": {"application.js": "application-abc.js"}}"#,
        )
        .unwrap();

        let manifest = Manifest::new(None, temp.path()).unwrap();
        assert_eq!(manifest.filename(), legacy);
        assert_eq!(manifest.assets().len(), 1);

        manifest.transaction(|_| Ok(())).unwrap();

        let migrated = manifest.filename();
        assert_ne!(migrated, legacy);
        assert!(!legacy.exists());
        assert!(migrated.exists());
        assert!(
            migrated
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with(".sprockets-manifest-")
        );

        let reopened = Manifest::new(None, temp.path()).unwrap();
        assert_eq!(reopened.filename(), migrated);
        assert_eq!(reopened.assets().get("application.js").unwrap(), "application-abc.js");
    }

    #[test]
    fn test_failed_transaction_saves_nothing() {
        let temp = TempDir::new().unwrap();
        let manifest = Manifest::new(None, temp.path()).unwrap();

        let result: Result<()> = manifest.transaction(|data| {
            data.assets.insert("a.js".into(), "a-00.js".into());
            Err(anyhow::anyhow!("boom"))
        });

        assert!(result.is_err());
        assert!(manifest.assets().is_empty());
        assert!(!manifest.filename().exists());
    }
}

//! Manifest store for compiled, digest-named assets.
//!
//! A [`Manifest`] owns an output directory of content-addressed files and a
//! JSON index describing them. The index has two maps:
//!
//! ```json
//! {
//!   "files": {
//!     "application-2e8e9a7c….js": {
//!       "logical_path": "application.js",
//!       "mtime": "2024-05-01T10:00:00Z",
//!       "size": 1342,
//!       "digest": "2e8e9a7c…"
//!     }
//!   },
//!   "assets": {
//!     "application.js": "application-2e8e9a7c….js"
//!   }
//! }
//! ```
//!
//! `files` keeps every version that is still on disk, keyed by digest path;
//! `assets` points each logical path at its most recently compiled version.
//! Every pointer target is a key of `files`.
//!
//! # Index Location
//!
//! The index file is chosen once, at construction:
//!
//! 1. an explicit `*.json` path (or any existing file) is used as-is
//! 2. otherwise, inside the directory, the first match of
//!    - `.sprockets-manifest-<32 hex>.json`
//!    - `manifest-<32 hex>.json` (legacy)
//!    - `manifest.json` (legacy)
//! 3. otherwise a new `.sprockets-manifest-<32 hex>.json` name, written on
//!    first save
//!
//! A legacy index is read normally and renamed to a fresh canonical name the
//! next time the manifest is saved.
//!
//! # Persistence
//!
//! Mutations ([`compile`](Manifest::compile), [`remove`](Manifest::remove),
//! [`clean`](Manifest::clean)) run as one transaction: the in-process mutex
//! and the on-disk [`ManifestLock`] are taken, the index is re-read, changed,
//! and written back atomically. A blank or unparsable index reads as empty.
//!
//! # Examples
//!
//! ```rust,no_run
//! use sprockets_cli::environment::Environment;
//! use sprockets_cli::manifest::Manifest;
//! use std::sync::Arc;
//!
//! # fn example() -> anyhow::Result<()> {
//! let env = Arc::new(Environment::new(vec!["app/assets".into()])?);
//! let manifest = Manifest::new(Some(env), "public/assets")?;
//!
//! manifest.compile(["application.js", "*.css"])?;
//! println!("{:?}", manifest.assets().get("application.js"));
//!
//! manifest.clean(2, std::time::Duration::from_secs(3600))?;
//! # Ok(())
//! # }
//! ```

pub mod lock;
mod manifest_io;
mod manifest_mutations;
mod manifest_queries;

pub use lock::ManifestLock;
pub use manifest_queries::{FindIter, FoundAssets};

use anyhow::Result;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::core::SprocketsError;
use crate::environment::EnvironmentHandle;

static CANONICAL_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\.sprockets-manifest-[0-9a-f]{32}\.json$").expect("manifest name regex is valid")
});

static LEGACY_DIGEST_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^manifest-[0-9a-f]{32}\.json$").expect("legacy manifest name regex is valid")
});

/// Fixed legacy index name.
pub const LEGACY_FIXED_NAME: &str = "manifest.json";

/// One compiled file in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Logical path the file was compiled from
    pub logical_path: String,
    /// Newest source modification time at compile
    #[serde(deserialize_with = "deserialize_mtime")]
    pub mtime: DateTime<Utc>,
    /// File size in bytes
    pub size: u64,
    /// Content digest. Empty when the index predates digest tracking.
    #[serde(default)]
    pub digest: String,
    /// Unknown keys, preserved on save
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Accepts RFC 3339 strings and integer epoch seconds.
fn deserialize_mtime<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawMtime {
        Text(String),
        Seconds(i64),
    }

    match RawMtime::deserialize(deserializer)? {
        RawMtime::Text(text) => DateTime::parse_from_rfc3339(&text)
            .map(|t| t.with_timezone(&Utc))
            .map_err(D::Error::custom),
        RawMtime::Seconds(seconds) => {
            DateTime::from_timestamp(seconds, 0).ok_or_else(|| D::Error::custom("mtime out of range"))
        }
    }
}

/// Serialized form of the index file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestData {
    /// Digest path → entry
    #[serde(default)]
    pub files: BTreeMap<String, ManifestEntry>,
    /// Logical path → current digest path
    #[serde(default)]
    pub assets: BTreeMap<String, String>,
}

#[derive(Debug)]
struct ManifestState {
    filename: PathBuf,
    /// The index was found under a legacy name and is renamed on save.
    legacy: bool,
    data: ManifestData,
}

/// Index of compiled assets plus the directory holding them.
pub struct Manifest {
    environment: Option<EnvironmentHandle>,
    directory: PathBuf,
    state: Mutex<ManifestState>,
}

impl std::fmt::Debug for Manifest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manifest")
            .field("directory", &self.directory)
            .field("filename", &self.filename())
            .field("has_environment", &self.environment.is_some())
            .finish()
    }
}

impl Manifest {
    /// Opens a manifest at `path`.
    ///
    /// `path` is the index file when it ends in `.json` or is an existing
    /// file; the output directory is then its parent. Otherwise `path` is the
    /// output directory and the index is discovered inside it.
    pub fn new(environment: Option<EnvironmentHandle>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if is_index_path(path) {
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
            Self::open(environment, directory, path.to_path_buf(), false)
        } else {
            let (filename, legacy) = discover_filename(path)?;
            Self::open(environment, path.to_path_buf(), filename, legacy)
        }
    }

    /// Opens a manifest whose index lives apart from the output directory.
    ///
    /// `filename` may itself be a directory, in which case the index is
    /// discovered inside it.
    pub fn with_locations(
        environment: Option<EnvironmentHandle>,
        directory: impl AsRef<Path>,
        filename: impl AsRef<Path>,
    ) -> Result<Self> {
        let filename = filename.as_ref();
        let (filename, legacy) = if is_index_path(filename) {
            (filename.to_path_buf(), false)
        } else {
            discover_filename(filename)?
        };
        Self::open(environment, directory.as_ref().to_path_buf(), filename, legacy)
    }

    fn open(
        environment: Option<EnvironmentHandle>,
        directory: PathBuf,
        filename: PathBuf,
        legacy: bool,
    ) -> Result<Self> {
        let data = manifest_io::read_data(&filename)?;
        debug!(
            "Opened manifest {} ({} file(s), {} asset(s))",
            filename.display(),
            data.files.len(),
            data.assets.len()
        );
        Ok(Self {
            environment,
            directory,
            state: Mutex::new(ManifestState {
                filename,
                legacy,
                data,
            }),
        })
    }

    /// Output directory for compiled files.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Current index file path.
    ///
    /// Changes after the first save when a legacy index was migrated.
    #[must_use]
    pub fn filename(&self) -> PathBuf {
        self.lock_state().filename.clone()
    }

    /// The environment, if one was given.
    #[must_use]
    pub fn environment(&self) -> Option<&EnvironmentHandle> {
        self.environment.as_ref()
    }

    /// Snapshot of the `files` map.
    #[must_use]
    pub fn files(&self) -> BTreeMap<String, ManifestEntry> {
        self.lock_state().data.files.clone()
    }

    /// Snapshot of the `assets` map.
    #[must_use]
    pub fn assets(&self) -> BTreeMap<String, String> {
        self.lock_state().data.assets.clone()
    }

    /// Snapshot of the whole index.
    #[must_use]
    pub fn data(&self) -> ManifestData {
        self.lock_state().data.clone()
    }

    fn lock_state(&self) -> MutexGuard<'_, ManifestState> {
        // A panic mid-transaction leaves the last saved data in place.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn require_environment(&self, operation: &str) -> Result<&EnvironmentHandle> {
        self.environment.as_ref().ok_or_else(|| {
            SprocketsError::pipeline(format!(
                "manifest {operation} requires an environment; this manifest was opened without one"
            ))
            .into()
        })
    }
}

/// True when `path` names an index file rather than a directory.
fn is_index_path(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json") || path.is_file()
}

/// Picks the index file inside `directory`. Returns the path and whether it
/// is a legacy name.
fn discover_filename(directory: &Path) -> Result<(PathBuf, bool)> {
    let mut names: Vec<String> = match std::fs::read_dir(directory) {
        Ok(entries) => entries
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => {
            return Err(anyhow::Error::from(e)
                .context(format!("Failed to read manifest directory {}", directory.display())));
        }
    };
    names.sort();

    if let Some(name) = names.iter().find(|n| CANONICAL_NAME.is_match(n)) {
        return Ok((directory.join(name), false));
    }
    if let Some(name) = names.iter().find(|n| LEGACY_DIGEST_NAME.is_match(n)) {
        debug!("Found legacy manifest {} in {}", name, directory.display());
        return Ok((directory.join(name), true));
    }
    if names.iter().any(|n| n == LEGACY_FIXED_NAME) {
        debug!("Found legacy manifest {} in {}", LEGACY_FIXED_NAME, directory.display());
        return Ok((directory.join(LEGACY_FIXED_NAME), true));
    }
    Ok((directory.join(generate_filename()), false))
}

/// A fresh canonical index name with a random 32-hex suffix.
fn generate_filename() -> String {
    format!(".sprockets-manifest-{}.json", uuid::Uuid::new_v4().simple())
}

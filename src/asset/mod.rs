//! Concatenated assets.
//!
//! [`ResolvedAsset::build`] turns a [`Resolution`] into the final asset:
//!
//! - **Body**: bodies of required records concatenated in resolution order.
//!   Included records are spliced into their includer at its header offset
//!   instead of being emitted on their own.
//! - **Digest**: SHA-256 over every record's path and rendered body, in
//!   order, dependency-only records included. Hex encoded.
//! - **Mtime**: newest modification time among all records.
//! - **Length**: byte length of the body.
//!
//! Content type and format extension come from the entry file.
//!
//! # Serialization
//!
//! Assets serialize to a plain record (see [`AssetRecord`]) carrying the
//! source bodies positionally next to their paths, so deserializing rebuilds
//! an equal asset without touching the filesystem.
//!
//! ```rust,no_run
//! use sprockets_cli::asset::ResolvedAsset;
//! # fn example(asset: &ResolvedAsset) -> anyhow::Result<()> {
//! let json = asset.to_json()?;
//! let restored = ResolvedAsset::from_json(&json)?;
//! assert_eq!(&restored, asset);
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::trace;

use crate::core::SprocketsError;
use crate::environment::split_logical;
use crate::resolver::{Resolution, SourceRecord, SourceRole};

/// A built asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AssetRecord", into = "AssetRecord")]
pub struct ResolvedAsset {
    /// Logical path of the entry file
    pub logical_path: String,
    /// Content type of the entry file
    pub content_type: String,
    /// Format extension of the entry file
    pub format_extension: String,
    /// Files whose text is part of the body, in resolution order
    pub source_paths: Vec<PathBuf>,
    /// Body segment contributed at each position of `source_paths`
    pub sources: Vec<String>,
    /// Files tracked for freshness only
    pub dependency_paths: Vec<PathBuf>,
    /// Concatenated body
    pub body: String,
    /// Newest modification time among all sources and dependencies
    pub mtime: DateTime<Utc>,
    /// Body length in bytes
    pub length: usize,
    /// Hex-encoded SHA-256 content digest
    pub digest: String,
    /// Files referenced by directives, compiled alongside this asset
    pub links: Vec<PathBuf>,
}

impl ResolvedAsset {
    /// Builds an asset from an ordered resolution.
    ///
    /// # Errors
    ///
    /// Returns [`SprocketsError::Pipeline`] when the resolution has no record
    /// for its entry file.
    pub fn build(logical_path: String, resolution: &Resolution) -> Result<Self> {
        let entry = resolution.entry_record().ok_or_else(|| {
            SprocketsError::pipeline(format!(
                "resolution of {} contains no entry record",
                resolution.entry.display()
            ))
        })?;

        let contributing: HashMap<&Path, &SourceRecord> = resolution
            .records
            .iter()
            .filter(|r| r.role.contributes_body())
            .map(|r| (r.path.as_path(), r))
            .collect();

        let mut source_paths = Vec::new();
        let mut sources = Vec::new();
        let mut dependency_paths = Vec::new();
        let mut hasher = Sha256::new();
        let mut mtime = DateTime::<Utc>::from(entry.mtime);

        for record in &resolution.records {
            hasher.update(record.path.to_string_lossy().as_bytes());
            hasher.update([0u8]);
            hasher.update(record.body.as_bytes());
            hasher.update([0u8]);

            mtime = mtime.max(DateTime::<Utc>::from(record.mtime));

            match record.role {
                SourceRole::Required => {
                    source_paths.push(record.path.clone());
                    sources.push(assemble(record, &contributing));
                }
                SourceRole::Included => {
                    source_paths.push(record.path.clone());
                    sources.push(String::new());
                }
                SourceRole::Dependency => dependency_paths.push(record.path.clone()),
            }
        }

        let body = sources.concat();
        let digest = hex::encode(hasher.finalize());
        trace!("Built {} ({} bytes, digest {})", logical_path, body.len(), digest);

        Ok(Self {
            logical_path,
            content_type: entry.content_type.clone(),
            format_extension: entry.format_extension.clone(),
            source_paths,
            sources,
            dependency_paths,
            length: body.len(),
            body,
            mtime,
            digest,
            links: resolution.links.clone(),
        })
    }

    /// Output path qualified with the digest, e.g. `application-<hex>.js`.
    #[must_use]
    pub fn digest_path(&self) -> String {
        let (stem, extension) = split_logical(&self.logical_path, &self.format_extension);
        format!("{stem}-{}{extension}", self.digest)
    }

    /// True when any source or dependency file changed after [`mtime`](Self::mtime)
    /// or can no longer be read.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.source_paths
            .iter()
            .chain(&self.dependency_paths)
            .any(|path| match std::fs::metadata(path).and_then(|m| m.modified()) {
                Ok(modified) => DateTime::<Utc>::from(modified) > self.mtime,
                Err(_) => true,
            })
    }

    /// Iterates the body segment by segment. The chunks concatenate to
    /// [`body`](Self::body).
    pub fn each_chunk(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(String::as_str).filter(|chunk| !chunk.is_empty())
    }

    /// Serializes the asset to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SprocketsError::JsonError`] when serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self).map_err(SprocketsError::from)?)
    }

    /// Restores an asset from [`to_json`](Self::to_json) output.
    ///
    /// # Errors
    ///
    /// Returns [`SprocketsError::JsonError`] when `json` is malformed or misses a
    /// required field.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json).map_err(SprocketsError::from)?)
    }
}

impl std::fmt::Display for ResolvedAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.body)
    }
}

/// Body of a required record with its includes spliced in at the header offset.
fn assemble(record: &SourceRecord, contributing: &HashMap<&Path, &SourceRecord>) -> String {
    if record.includes.is_empty() {
        return record.body.clone();
    }

    let at = record.header_end.min(record.body.len());
    let mut body = String::with_capacity(record.body.len());
    body.push_str(&record.body[..at]);
    for path in &record.includes {
        if let Some(included) = contributing.get(path.as_path()) {
            body.push_str(&assemble(included, contributing));
        }
    }
    body.push_str(&record.body[at..]);
    body
}

/// Plain-data form of a [`ResolvedAsset`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Logical path
    pub logical_path: String,
    /// Content type
    pub content_type: String,
    /// Format extension
    pub format_extension: String,
    /// Body-contributing files
    pub source_paths: Vec<PathBuf>,
    /// Body segments, one per source path
    pub source: Vec<String>,
    /// Freshness-only files
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependency_paths: Vec<PathBuf>,
    /// Newest source modification time
    pub mtime: DateTime<Utc>,
    /// Body length in bytes
    pub length: usize,
    /// Content digest
    pub digest: String,
    /// Linked files
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<PathBuf>,
}

impl From<ResolvedAsset> for AssetRecord {
    fn from(asset: ResolvedAsset) -> Self {
        Self {
            logical_path: asset.logical_path,
            content_type: asset.content_type,
            format_extension: asset.format_extension,
            source_paths: asset.source_paths,
            source: asset.sources,
            dependency_paths: asset.dependency_paths,
            mtime: asset.mtime,
            length: asset.length,
            digest: asset.digest,
            links: asset.links,
        }
    }
}

impl TryFrom<AssetRecord> for ResolvedAsset {
    type Error = SprocketsError;

    fn try_from(record: AssetRecord) -> std::result::Result<Self, Self::Error> {
        if record.source.len() != record.source_paths.len() {
            return Err(SprocketsError::pipeline(format!(
                "asset record for '{}' has {} source bodies for {} source paths",
                record.logical_path,
                record.source.len(),
                record.source_paths.len()
            )));
        }

        Ok(Self {
            body: record.source.concat(),
            logical_path: record.logical_path,
            content_type: record.content_type,
            format_extension: record.format_extension,
            source_paths: record.source_paths,
            sources: record.source,
            dependency_paths: record.dependency_paths,
            mtime: record.mtime,
            length: record.length,
            digest: record.digest,
            links: record.links,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{AssetEnvironment, Environment};
    use crate::test_utils::FixtureTree;
    use std::time::{Duration, SystemTime};

    fn build(tree: &FixtureTree, name: &str) -> ResolvedAsset {
        let env = Environment::new(vec![tree.path().to_path_buf()]).unwrap();
        env.find_asset(name).unwrap().unwrap()
    }

    #[test]
    fn test_concatenation_order() {
        let tree = FixtureTree::new()
            .file("application.js", "//= require project\n//= require users\nfocus();\n")
            .file("project.js", "var Project = {};\n")
            .file("users.js", "var Users = {};\n");

        let asset = build(&tree, "application.js");
        assert_eq!(asset.body, "var Project = {};\nvar Users = {};\nfocus();\n");
        assert_eq!(asset.source_paths.len(), 3);
        assert_eq!(asset.content_type, "application/javascript");
        assert_eq!(asset.format_extension, ".js");
    }

    #[test]
    fn test_include_after_header() {
        let tree = FixtureTree::new()
            .file("included_header.js", "# My Application\n#= include project\n\nhello()\n")
            .file("project.js", "var Project = {};\n");

        let asset = build(&tree, "included_header.js");
        assert_eq!(asset.body, "# My Application\nvar Project = {};\n\nhello()\n");
    }

    #[test]
    fn test_length_in_bytes() {
        let tree = FixtureTree::new().file("unicode.js", "var s = \"é\";\n");

        let asset = build(&tree, "unicode.js");
        assert_eq!(asset.length, asset.body.len());
        assert_ne!(asset.length, asset.body.chars().count());
    }

    #[test]
    fn test_mtime_is_newest_source() {
        let tree = FixtureTree::new()
            .file("a.js", "//= require b\n")
            .file("b.js", "b();\n");
        let newer = SystemTime::UNIX_EPOCH + Duration::from_secs(2_000_000_000);
        tree.set_mtime("b.js", newer);
        tree.set_mtime("a.js", newer - Duration::from_secs(60));

        let asset = build(&tree, "a.js");
        assert_eq!(asset.mtime, DateTime::<Utc>::from(newer));
    }

    #[test]
    fn test_digest_changes_with_content() {
        let tree = FixtureTree::new().file("a.js", "one();\n");
        let first = build(&tree, "a.js");
        assert_eq!(first.digest.len(), 64);

        tree.write("a.js", "two();\n");
        let second = build(&tree, "a.js");
        assert_ne!(first.digest, second.digest);
        assert_eq!(second.digest, build(&tree, "a.js").digest);
    }

    #[test]
    fn test_depend_on_changes_digest_not_body() {
        let tree = FixtureTree::new()
            .file("a.js", "//= depend_on config.json\na();\n")
            .file("config.json", "{\"v\": 1}\n");
        let first = build(&tree, "a.js");
        assert_eq!(first.body, "a();\n");
        assert_eq!(first.dependency_paths.len(), 1);

        tree.write("config.json", "{\"v\": 2}\n");
        let second = build(&tree, "a.js");
        assert_eq!(second.body, first.body);
        assert_ne!(second.digest, first.digest);
    }

    #[test]
    fn test_stale_after_modification() {
        let tree = FixtureTree::new().file("a.js", "a();\n");
        let past = SystemTime::now() - Duration::from_secs(600);
        tree.set_mtime("a.js", past);

        let asset = build(&tree, "a.js");
        assert!(!asset.is_stale());

        tree.set_mtime("a.js", SystemTime::now());
        assert!(asset.is_stale());
    }

    #[test]
    fn test_stale_when_source_deleted() {
        let tree = FixtureTree::new().file("a.js", "//= require b\n").file("b.js", "b();\n");
        let asset = build(&tree, "a.js");

        std::fs::remove_file(tree.path().join("b.js")).unwrap();
        assert!(asset.is_stale());
    }

    #[test]
    fn test_each_chunk_concatenates_to_body() {
        let tree = FixtureTree::new()
            .file("a.js", "//= require b\na();\n")
            .file("b.js", "b();\n");

        let asset = build(&tree, "a.js");
        assert_eq!(asset.each_chunk().collect::<String>(), asset.body);
        assert_eq!(asset.each_chunk().count(), 2);
    }

    #[test]
    fn test_digest_path() {
        let tree = FixtureTree::new().file("mobile/a.js.coffee", "a();\n");

        let asset = build(&tree, "mobile/a.js");
        assert_eq!(asset.digest_path(), format!("mobile/a-{}.js", asset.digest));
    }

    #[test]
    fn test_json_round_trip() {
        let tree = FixtureTree::new()
            .file("a.js", "// header\n//= include b\n//= require c\na();\n")
            .file("b.js", "b();\n")
            .file("c.js", "c();\n");
        let asset = build(&tree, "a.js");

        let json = asset.to_json().unwrap();
        assert!(json.contains("\"content_type\": \"application/javascript\""));
        assert!(json.contains(&asset.digest));

        let restored = ResolvedAsset::from_json(&json).unwrap();
        assert_eq!(restored, asset);
        assert_eq!(restored.to_string(), asset.body);
    }

    #[test]
    fn test_from_json_rejects_mismatched_sources() {
        let json = r#"{
            "logical_path": "a.js",
            "content_type": "application/javascript",
            "format_extension": ".js",
            "source_paths": ["/tmp/a.js", "/tmp/b.js"],
            "source": ["a();\n"],
            "mtime": "2011-01-01T00:00:00Z",
            "length": 5,
            "digest": "00"
        }"#;

        assert!(ResolvedAsset::from_json(json).is_err());
    }
}

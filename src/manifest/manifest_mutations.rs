//! Operations that change the manifest: compile, remove and clean.

use anyhow::{Context, Result};
use chrono::{TimeDelta, Utc};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use super::{Manifest, ManifestData, ManifestEntry};
use crate::asset::ResolvedAsset;
use crate::core::SprocketsError;
use crate::environment::AssetEnvironment;
use crate::pattern::AssetFilter;
use crate::utils::{atomic_write, is_safe_path};

impl Manifest {
    /// Compiles every asset matching `targets`, plus everything they link to.
    ///
    /// Each asset is written to `directory/<digest path>` unless a file with
    /// that name already exists, recorded in `files`, and made the current
    /// version of its logical path. The index is saved once at the end.
    ///
    /// Returns the compiled assets in compile order.
    ///
    /// # Errors
    ///
    /// - [`SprocketsError::Pipeline`] when the manifest has no environment
    /// - [`SprocketsError::FileNotFound`] when an exact name matches nothing
    /// - any resolution error of a matched asset or its links
    pub fn compile<I, F>(&self, targets: I) -> Result<Vec<ResolvedAsset>>
    where
        I: IntoIterator<Item = F>,
        F: Into<AssetFilter>,
    {
        let environment = self.require_environment("compile")?.as_ref();
        let filters: Vec<AssetFilter> = targets.into_iter().map(Into::into).collect();

        let mut seen = HashSet::new();
        let mut assets = Vec::new();
        for filter in &filters {
            let mut matched = 0usize;
            for asset in self.find(filter.clone())?.iter() {
                let asset = asset.with_context(|| format!("Failed to compile '{filter}'"))?;
                matched += 1;
                collect_with_links(environment, asset, &mut seen, &mut assets)?;
            }

            if matched == 0 {
                if let Some(name) = filter.literal() {
                    return Err(SprocketsError::file_not_found(name, "no asset matches this name").into());
                }
                debug!("Pattern '{}' matched no assets", filter);
            }
        }

        self.transaction(|data| {
            for asset in &assets {
                self.record(environment, asset, data)?;
            }
            Ok(())
        })?;

        Ok(assets)
    }

    /// Writes one asset and updates the index entries for it.
    fn record(&self, environment: &dyn AssetEnvironment, asset: &ResolvedAsset, data: &mut ManifestData) -> Result<()> {
        let digest_path = environment.digest_path_for(asset);
        let target = self.directory.join(&digest_path);

        if target.exists() {
            debug!("Skipping {} (already compiled)", digest_path);
        } else {
            atomic_write(&target, asset.body.as_bytes())
                .with_context(|| format!("Failed to write compiled asset {}", target.display()))?;
            info!("Writing {}", target.display());
        }

        data.files.insert(
            digest_path.clone(),
            ManifestEntry {
                logical_path: asset.logical_path.clone(),
                mtime: asset.mtime,
                size: asset.length as u64,
                digest: asset.digest.clone(),
                extra: BTreeMap::new(),
            },
        );
        data.assets.insert(asset.logical_path.clone(), digest_path);
        Ok(())
    }

    /// Deletes a compiled file and its index entry.
    ///
    /// Clears the logical path's pointer if it pointed at `digest_path`.
    /// Returns whether the file or its entry existed.
    ///
    /// # Errors
    ///
    /// Returns [`SprocketsError::Pipeline`] when `digest_path` escapes the
    /// output directory.
    pub fn remove(&self, digest_path: &str) -> Result<bool> {
        self.transaction(|data| remove_entry(&self.directory, data, digest_path))
    }

    /// Removes old versions.
    ///
    /// For every logical path, the `keep` newest versions (by mtime) and the
    /// current version are kept. Older versions survive while younger than
    /// `max_age`. Versions stamped in the future count as age zero. Returns
    /// the removed digest paths.
    ///
    /// # Errors
    ///
    /// Returns an error when the index cannot be locked or saved, or when a
    /// file cannot be deleted.
    pub fn clean(&self, keep: usize, max_age: Duration) -> Result<Vec<String>> {
        let max_age = TimeDelta::from_std(max_age).unwrap_or(TimeDelta::MAX);

        self.transaction(|data| {
            let now = Utc::now();
            let mut versions: BTreeMap<&str, Vec<(&str, &ManifestEntry)>> = BTreeMap::new();
            for (digest_path, entry) in &data.files {
                versions
                    .entry(entry.logical_path.as_str())
                    .or_default()
                    .push((digest_path.as_str(), entry));
            }

            let mut doomed = Vec::new();
            for (logical_path, mut entries) in versions {
                let current = data.assets.get(logical_path).map(String::as_str);
                entries.sort_by(|(a_path, a), (b_path, b)| {
                    b.mtime
                        .cmp(&a.mtime)
                        .then_with(|| (current == Some(*b_path)).cmp(&(current == Some(*a_path))))
                });

                for (index, (digest_path, entry)) in entries.into_iter().enumerate() {
                    if index < keep || current == Some(digest_path) {
                        continue;
                    }
                    if now.signed_duration_since(entry.mtime).max(TimeDelta::zero()) < max_age {
                        continue;
                    }
                    doomed.push(digest_path.to_string());
                }
            }

            for digest_path in &doomed {
                remove_entry(&self.directory, data, digest_path)?;
            }
            if !doomed.is_empty() {
                info!("Cleaned {} old asset version(s)", doomed.len());
            }
            Ok(doomed)
        })
    }
}

/// Builds the transitive closure of `asset` over its links, skipping logical
/// paths already collected.
fn collect_with_links(
    environment: &dyn AssetEnvironment,
    asset: ResolvedAsset,
    seen: &mut HashSet<String>,
    assets: &mut Vec<ResolvedAsset>,
) -> Result<()> {
    let mut pending = vec![asset];
    while let Some(asset) = pending.pop() {
        if !seen.insert(asset.logical_path.clone()) {
            continue;
        }
        for link in &asset.links {
            let logical_path = environment.logical_path_for(link)?;
            if seen.contains(&logical_path) {
                continue;
            }
            let linked = environment
                .build_asset(link)
                .with_context(|| format!("Failed to compile {} linked from {}", link.display(), asset.logical_path))?;
            pending.push(linked);
        }
        assets.push(asset);
    }
    Ok(())
}

fn remove_entry(directory: &Path, data: &mut ManifestData, digest_path: &str) -> Result<bool> {
    if digest_path.is_empty() || !is_safe_path(directory, Path::new(digest_path)) {
        return Err(SprocketsError::pipeline(format!(
            "'{digest_path}' is not inside the manifest directory {}",
            directory.display()
        ))
        .into());
    }

    let target = directory.join(digest_path);
    let removed_file = match std::fs::remove_file(&target) {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            return Err(anyhow::Error::from(e).context(format!("Failed to remove {}", target.display())));
        }
    };

    let removed_entry = data.files.remove(digest_path).is_some();
    data.assets.retain(|_, current| current != digest_path);

    if removed_file || removed_entry {
        info!("Removed {}", digest_path);
    }
    Ok(removed_file || removed_entry)
}

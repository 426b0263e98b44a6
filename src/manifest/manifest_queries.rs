//! Read-only queries: finding assets through the environment.

use anyhow::Result;
use std::collections::HashSet;
use std::sync::Arc;

use super::Manifest;
use crate::asset::ResolvedAsset;
use crate::environment::{EnvironmentHandle, LogicalEntry};
use crate::pattern::AssetFilter;

impl Manifest {
    /// Finds assets matching `filter`.
    ///
    /// The result is lazy: nothing is built until it is iterated, and it can
    /// be iterated any number of times.
    ///
    /// # Errors
    ///
    /// Returns [`SprocketsError::Pipeline`](crate::core::SprocketsError::Pipeline)
    /// when the manifest has no environment.
    pub fn find(&self, filter: impl Into<AssetFilter>) -> Result<FoundAssets> {
        self.find_all([filter])
    }

    /// Finds assets matching any of `filters`, each asset once.
    pub fn find_all<I, F>(&self, filters: I) -> Result<FoundAssets>
    where
        I: IntoIterator<Item = F>,
        F: Into<AssetFilter>,
    {
        let environment = Arc::clone(self.require_environment("find")?);
        Ok(FoundAssets {
            environment,
            filters: filters.into_iter().map(Into::into).collect(),
        })
    }
}

/// Lazy, restartable result of [`Manifest::find`].
#[derive(Clone)]
pub struct FoundAssets {
    environment: EnvironmentHandle,
    filters: Vec<AssetFilter>,
}

impl std::fmt::Debug for FoundAssets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FoundAssets").field("filters", &self.filters).finish_non_exhaustive()
    }
}

enum Candidate {
    Name(String),
    Entry(LogicalEntry),
}

impl FoundAssets {
    /// Starts a new pass over the matching assets.
    #[must_use]
    pub fn iter(&self) -> FindIter<'_> {
        FindIter {
            found: self,
            pending: None,
            seen: HashSet::new(),
        }
    }

    /// Builds every match, stopping at the first error.
    pub fn to_vec(&self) -> Result<Vec<ResolvedAsset>> {
        self.iter().collect()
    }

    /// Exact names resolve directly; patterns are tested against every
    /// logical path, which is listed once per pass.
    fn candidates(&self) -> Result<Vec<Candidate>> {
        let mut catalog: Option<Vec<LogicalEntry>> = None;
        let mut candidates = Vec::new();

        for filter in &self.filters {
            if let Some(name) = filter.literal() {
                candidates.push(Candidate::Name(name.to_string()));
                continue;
            }
            if catalog.is_none() {
                catalog = Some(self.environment.logical_paths()?);
            }
            candidates.extend(
                catalog
                    .iter()
                    .flatten()
                    .filter(|entry| filter.matches(&entry.logical_path, &entry.path))
                    .cloned()
                    .map(Candidate::Entry),
            );
        }

        Ok(candidates)
    }
}

impl<'a> IntoIterator for &'a FoundAssets {
    type Item = Result<ResolvedAsset>;
    type IntoIter = FindIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One pass over a [`FoundAssets`]. Each asset is built when reached.
pub struct FindIter<'a> {
    found: &'a FoundAssets,
    pending: Option<std::vec::IntoIter<Candidate>>,
    seen: HashSet<String>,
}

impl Iterator for FindIter<'_> {
    type Item = Result<ResolvedAsset>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pending.is_none() {
            match self.found.candidates() {
                Ok(candidates) => self.pending = Some(candidates.into_iter()),
                Err(e) => {
                    self.pending = Some(Vec::new().into_iter());
                    return Some(Err(e));
                }
            }
        }

        let environment = self.found.environment.as_ref();
        let pending = self.pending.as_mut()?;
        for candidate in pending.by_ref() {
            let built = match candidate {
                Candidate::Name(name) => match environment.find_asset(&name) {
                    Ok(Some(asset)) => Ok(asset),
                    Ok(None) => continue,
                    Err(e) => Err(e),
                },
                Candidate::Entry(entry) => {
                    if self.seen.contains(&entry.logical_path) {
                        continue;
                    }
                    environment.build_asset(&entry.path)
                }
            };

            match built {
                Ok(asset) => {
                    if self.seen.insert(asset.logical_path.clone()) {
                        return Some(Ok(asset));
                    }
                }
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}

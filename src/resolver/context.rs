//! Per-resolution bookkeeping.
//!
//! A [`ResolverContext`] lives for exactly one top-level resolution. It records
//! which files already contributed to the asset so that diamonds and cycles in
//! the directive graph are visited once, and it keeps the chain of files being
//! expanded for error messages.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Visited sets and traversal stack for one resolution.
#[derive(Debug, Default)]
pub struct ResolverContext {
    /// Files whose bodies are part of the asset (required, included, self).
    required: HashSet<PathBuf>,
    /// Files reached only through `depend_on`/`depend_on_asset`.
    tracked: HashSet<PathBuf>,
    /// Files currently being expanded, outermost first.
    stack: Vec<PathBuf>,
    /// Content type of the entry file, fixed by the first file visited.
    content_type: Option<String>,
}

impl ResolverContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `path` as contributing to the asset.
    ///
    /// Returns `false` when it was already marked. A file that was only
    /// tracked so far is promoted; the caller drops its tracking record.
    pub fn mark_required(&mut self, path: &Path) -> bool {
        if self.required.contains(path) {
            return false;
        }
        self.tracked.remove(path);
        self.required.insert(path.to_path_buf());
        true
    }

    /// Marks `path` as a freshness-only dependency.
    ///
    /// Returns `false` when the file is already required or tracked.
    pub fn mark_tracked(&mut self, path: &Path) -> bool {
        if self.required.contains(path) || self.tracked.contains(path) {
            return false;
        }
        self.tracked.insert(path.to_path_buf());
        true
    }

    /// True when `path` is already part of the asset body.
    #[must_use]
    pub fn is_required(&self, path: &Path) -> bool {
        self.required.contains(path)
    }

    /// Content type every contributing file must match.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Fixes the entry content type. Later calls are ignored.
    pub fn set_content_type(&mut self, content_type: &str) {
        if self.content_type.is_none() {
            self.content_type = Some(content_type.to_string());
        }
    }

    pub(crate) fn push(&mut self, path: &Path) {
        self.stack.push(path.to_path_buf());
    }

    pub(crate) fn pop(&mut self) {
        self.stack.pop();
    }

    /// Human-readable chain of files being expanded, e.g. `a.js -> b.js`.
    #[must_use]
    pub fn chain(&self) -> String {
        self.stack
            .iter()
            .map(|p| p.file_name().map_or_else(|| p.display().to_string(), |n| n.to_string_lossy().into_owned()))
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

//! Asset environment: load paths, lookup and asset construction.
//!
//! The [`Environment`] is the handle the manifest talks to. It owns the
//! ordered list of load paths and a [`Renderer`], maps logical names and
//! relative directive arguments to files ([`LogicalResolver`]), and builds
//! [`ResolvedAsset`]s by running the dependency resolver and the asset builder.
//!
//! # Lookup
//!
//! A name is looked up in every load path in order. Within one load path the
//! candidates for `name` are:
//!
//! 1. `root/name` itself
//! 2. a sibling file `name.<more extensions>` (`application.js` finds
//!    `application.js.coffee`), lowest file name first
//! 3. the directory index `root/<name without ext>/index<ext>` or
//!    `index<ext>.<more extensions>`
//!
//! Names without a registered extension try `name + format_extension` first.
//! Absolute paths are accepted when they lie inside a load path. No lookup may
//! leave the load paths.

pub mod logical;
pub mod render;

pub use logical::{logical_path_of, split_logical, to_slash};
pub use render::{
    DEFAULT_CONTENT_TYPE, PassthroughRenderer, RenderedFile, Renderer, format_extension_of, mime_type_for,
};

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::asset::ResolvedAsset;
use crate::core::SprocketsError;
use crate::resolver::{DependencyResolver, LogicalResolver};
use crate::utils::normalize_path;

/// A file under the load paths together with its logical path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalEntry {
    /// Logical path (e.g. `coffee.js`)
    pub logical_path: String,
    /// Absolute file path
    pub path: PathBuf,
}

/// Operations the manifest needs from an environment.
pub trait AssetEnvironment: Send + Sync {
    /// Builds the asset addressed by a logical name or absolute path.
    ///
    /// Returns `Ok(None)` when nothing matches the name.
    fn find_asset(&self, name: &str) -> Result<Option<ResolvedAsset>>;

    /// Builds the asset whose entry file is `path`.
    fn build_asset(&self, path: &Path) -> Result<ResolvedAsset>;

    /// Every file under the load paths, index-collapsed and de-duplicated by
    /// logical path.
    fn logical_paths(&self) -> Result<Vec<LogicalEntry>>;

    /// Logical path of an absolute file path inside the load paths.
    fn logical_path_for(&self, path: &Path) -> Result<String>;

    /// Digest-qualified output path for `asset`, e.g. `application-<hex>.js`.
    fn digest_path_for(&self, asset: &ResolvedAsset) -> String {
        asset.digest_path()
    }
}

/// Shared handle to an environment.
pub type EnvironmentHandle = Arc<dyn AssetEnvironment>;

/// Filesystem-backed environment over an ordered list of load paths.
pub struct Environment {
    load_paths: Vec<PathBuf>,
    renderer: Box<dyn Renderer>,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment").field("load_paths", &self.load_paths).finish_non_exhaustive()
    }
}

impl Environment {
    /// Creates an environment that reads files unchanged.
    pub fn new(load_paths: Vec<PathBuf>) -> Result<Self> {
        Self::with_renderer(load_paths, Box::new(PassthroughRenderer))
    }

    /// Creates an environment with a custom render service.
    ///
    /// Load paths are made absolute and canonicalized when they exist, so
    /// that every path handed out shares the same prefix.
    pub fn with_renderer(load_paths: Vec<PathBuf>, renderer: Box<dyn Renderer>) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to determine current directory")?;
        let load_paths = load_paths
            .into_iter()
            .map(|path| {
                let absolute = if path.is_absolute() { path } else { cwd.join(path) };
                std::fs::canonicalize(&absolute).unwrap_or_else(|_| normalize_path(&absolute))
            })
            .collect::<Vec<_>>();

        debug!("Environment load paths: {:?}", load_paths);
        Ok(Self {
            load_paths,
            renderer,
        })
    }

    /// Configured load paths, in lookup order.
    #[must_use]
    pub fn load_paths(&self) -> &[PathBuf] {
        &self.load_paths
    }

    /// The render service.
    #[must_use]
    pub fn renderer(&self) -> &dyn Renderer {
        self.renderer.as_ref()
    }

    /// The most specific load path containing `path`.
    fn root_for(&self, path: &Path) -> Option<&Path> {
        self.load_paths
            .iter()
            .filter(|root| path.starts_with(root))
            .max_by_key(|root| root.components().count())
            .map(PathBuf::as_path)
    }

    fn lookup_in(&self, root: &Path, name: &str, format_extension: Option<&str>) -> Option<PathBuf> {
        let mut candidates = Vec::with_capacity(2);
        if let Some(ext) = format_extension
            && format_extension_of(Path::new(name)).is_none()
        {
            candidates.push(format!("{name}{ext}"));
        }
        candidates.push(name.to_string());

        candidates.iter().find_map(|candidate| find_candidate(root, candidate))
    }

    fn not_found(&self, name: &str) -> SprocketsError {
        let searched = self
            .load_paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        SprocketsError::file_not_found(name, format!("not found under load paths [{searched}]"))
    }

    fn relative_target(&self, from: &Path, token: &str) -> Result<(PathBuf, &Path)> {
        let base = from.parent().unwrap_or(from);
        let target = normalize_path(&base.join(token));
        let root = self.root_for(&target).ok_or_else(|| {
            SprocketsError::file_not_found(
                token,
                format!("{} is outside the load paths", target.display()),
            )
        })?;
        Ok((target, root))
    }
}

/// First file matching `candidate` inside `root`.
fn find_candidate(root: &Path, candidate: &str) -> Option<PathBuf> {
    let target = normalize_path(&root.join(candidate));
    if !target.starts_with(root) || target == root {
        return None;
    }
    if target.is_file() {
        return Some(target);
    }

    let parent = target.parent()?;
    let file_name = target.file_name()?.to_string_lossy().into_owned();
    if let Some(found) = first_with_prefix(parent, &format!("{file_name}.")) {
        return Some(found);
    }

    let (directory, index_name) = match format_extension_of(&target) {
        Some(ext) => {
            let stem = file_name.strip_suffix(ext).unwrap_or(&file_name);
            (parent.join(stem), format!("index{ext}"))
        }
        None => (target.clone(), "index".to_string()),
    };
    let index = directory.join(&index_name);
    if index.is_file() {
        return Some(index);
    }
    first_with_prefix(&directory, &format!("{index_name}."))
}

/// Lowest-named regular file in `directory` whose name starts with `prefix`.
fn first_with_prefix(directory: &Path, prefix: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(directory).ok()?;
    let mut matches: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(prefix))
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    matches.sort();
    matches.into_iter().next()
}

impl LogicalResolver for Environment {
    fn resolve_logical_path(&self, name: &str, format_extension: Option<&str>) -> Result<PathBuf> {
        let path = Path::new(name);
        if path.is_absolute() {
            let normalized = normalize_path(path);
            let root = self.root_for(&normalized).ok_or_else(|| {
                SprocketsError::file_not_found(name, "absolute path is outside the load paths")
            })?;
            let relative = to_slash(normalized.strip_prefix(root).unwrap_or(&normalized));
            return self
                .lookup_in(root, &relative, format_extension)
                .ok_or_else(|| self.not_found(name).into());
        }

        for root in &self.load_paths {
            if let Some(found) = self.lookup_in(root, name, format_extension) {
                trace!("Resolved '{}' to {}", name, found.display());
                return Ok(found);
            }
        }
        Err(self.not_found(name).into())
    }

    fn resolve_relative(&self, from: &Path, token: &str, format_extension: Option<&str>) -> Result<PathBuf> {
        let (target, root) = self.relative_target(from, token)?;
        let relative = to_slash(target.strip_prefix(root).unwrap_or(&target));
        self.lookup_in(root, &relative, format_extension).ok_or_else(|| {
            SprocketsError::file_not_found(
                token,
                format!("no file matches relative to {}", from.display()),
            )
            .into()
        })
    }

    fn resolve_directory(&self, from: &Path, token: &str) -> Result<PathBuf> {
        let (target, _) = self.relative_target(from, token)?;
        if target.exists() {
            Ok(target)
        } else {
            Err(SprocketsError::file_not_found(token, format!("{} does not exist", target.display())).into())
        }
    }
}

impl AssetEnvironment for Environment {
    fn find_asset(&self, name: &str) -> Result<Option<ResolvedAsset>> {
        let path = match self.resolve_logical_path(name, None) {
            Ok(path) => path,
            Err(err) if matches!(err.downcast_ref::<SprocketsError>(), Some(SprocketsError::FileNotFound { .. })) => {
                debug!("No asset matches '{}'", name);
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        self.build_asset(&path).map(Some)
    }

    fn build_asset(&self, path: &Path) -> Result<ResolvedAsset> {
        let path = normalize_path(path);
        let logical_path = self.logical_path_for(&path)?;
        let resolution = DependencyResolver::new(self, self.renderer()).resolve(&path)?;
        ResolvedAsset::build(logical_path, &resolution)
            .with_context(|| format!("Failed to build asset {}", path.display()))
    }

    fn logical_paths(&self) -> Result<Vec<LogicalEntry>> {
        let mut entries: Vec<LogicalEntry> = Vec::new();
        let mut positions: HashMap<String, (usize, usize)> = HashMap::new();

        for (root_index, root) in self.load_paths.iter().enumerate() {
            if !root.is_dir() {
                continue;
            }
            let walker = WalkDir::new(root)
                .min_depth(1)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|entry| !entry.file_name().to_string_lossy().starts_with('.'));

            for entry in walker {
                let entry = entry.with_context(|| format!("Failed to walk load path {}", root.display()))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
                let logical_path = logical_path_of(relative);
                let is_index = is_index_file(relative);

                match positions.get(&logical_path).copied() {
                    None => {
                        positions.insert(logical_path.clone(), (entries.len(), root_index));
                        entries.push(LogicalEntry {
                            logical_path,
                            path: entry.into_path(),
                        });
                    }
                    // An explicit file beats a directory index in the same load path.
                    Some((position, owner)) if owner == root_index && !is_index => {
                        let current = &entries[position].path;
                        if is_index_file(current.strip_prefix(root).unwrap_or(current)) {
                            entries[position].path = entry.into_path();
                        }
                    }
                    Some(_) => {}
                }
            }
        }

        entries.sort_by(|a, b| a.logical_path.cmp(&b.logical_path));
        Ok(entries)
    }

    fn logical_path_for(&self, path: &Path) -> Result<String> {
        let normalized = normalize_path(path);
        let root = self.root_for(&normalized).ok_or_else(|| {
            SprocketsError::file_not_found(path.display().to_string(), "file is outside the load paths")
        })?;
        let relative = normalized.strip_prefix(root).unwrap_or(&normalized);
        Ok(logical_path_of(relative))
    }
}

fn is_index_file(relative: &Path) -> bool {
    relative.parent().is_some_and(|p| !p.as_os_str().is_empty())
        && relative
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with("index."))
}

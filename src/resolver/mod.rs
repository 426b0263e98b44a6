//! Dependency resolution for source files.
//!
//! Given an entry file, the [`DependencyResolver`] walks the directive graph
//! depth-first and produces the ordered list of [`SourceRecord`]s that make up
//! the asset. It knows nothing about concatenation or digests; that is the
//! [`asset`](crate::asset) module's job.
//!
//! # Traversal
//!
//! For each file the resolver renders it, parses its header with
//! [`directive::parse`], then processes directives in order:
//!
//! | Directive           | Effect                                                        |
//! |---------------------|---------------------------------------------------------------|
//! | `require`           | recurse into the target; its records come before this file    |
//! | `include`           | recurse, then splice the target body after this file's header |
//! | `require_tree`      | `require` every requirable file under a directory, sorted     |
//! | `require_directory` | same, immediate children only                                 |
//! | `require_self`      | place this file's own record here instead of last             |
//! | `depend_on`         | track the file and its tree for freshness, no body            |
//! | `depend_on_asset`   | same as `depend_on`                                           |
//!
//! A file is marked visited before its directives are processed, so cycles
//! terminate and a file reached along several paths contributes once, at its
//! first position.
//!
//! # Content Types
//!
//! Every file that contributes a body must declare the entry file's content
//! type; a mismatch fails the whole resolution with
//! [`SprocketsError::ContentTypeMismatch`]. Directory directives silently skip
//! files of another content type instead. Dependency-only records are exempt.
//!
//! # Links
//!
//! Every target named by a directive is recorded in [`Resolution::links`].
//! The manifest compiles links as assets of their own.

pub mod context;

pub use context::ResolverContext;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::core::SprocketsError;
use crate::directive::{self, Directive, DirectiveKind, is_relative_token};
use crate::environment::{Renderer, to_slash};

/// Maps directive arguments to files inside the load paths.
///
/// All returned paths are absolute and lie inside a load path. Arguments that
/// escape every load path or name nothing fail with
/// [`SprocketsError::FileNotFound`].
pub trait LogicalResolver: Send + Sync {
    /// Resolve a logical name such as `jquery` or `lib/util.js`.
    ///
    /// `format_extension` (e.g. `.js`) is tried first when `name` has no
    /// extension of its own.
    fn resolve_logical_path(&self, name: &str, format_extension: Option<&str>) -> Result<PathBuf>;

    /// Resolve a relative token (`./foo`, `../bar`) against the directory of `from`.
    fn resolve_relative(&self, from: &Path, token: &str, format_extension: Option<&str>) -> Result<PathBuf>;

    /// Resolve a relative directory token for `require_tree`/`require_directory`.
    ///
    /// The target must exist; whether it is a directory is checked by the caller.
    fn resolve_directory(&self, from: &Path, token: &str) -> Result<PathBuf>;
}

/// How a record takes part in the asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceRole {
    /// Body is emitted as its own segment.
    Required,
    /// Body is spliced into the file that included it.
    Included,
    /// Tracked for freshness and digest only.
    Dependency,
}

impl SourceRole {
    /// True for records whose text ends up in the asset body.
    #[must_use]
    pub const fn contributes_body(self) -> bool {
        !matches!(self, Self::Dependency)
    }
}

/// One visited file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    /// Absolute path of the file
    pub path: PathBuf,
    /// Rendered text with directive lines removed
    pub body: String,
    /// Declared content type
    pub content_type: String,
    /// Format extension (e.g. `.js`)
    pub format_extension: String,
    /// File modification time at render
    pub mtime: SystemTime,
    /// Offset in `body` where included bodies are spliced
    pub header_end: usize,
    /// Files included by this one, in directive order
    pub includes: Vec<PathBuf>,
    /// How the record contributes to the asset
    pub role: SourceRole,
}

/// Ordered output of one resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The entry file
    pub entry: PathBuf,
    /// Visited files in emission order
    pub records: Vec<SourceRecord>,
    /// Files referenced by directives, deduplicated, excluding the entry
    pub links: Vec<PathBuf>,
}

impl Resolution {
    fn new(entry: &Path) -> Self {
        Self {
            entry: entry.to_path_buf(),
            records: Vec::new(),
            links: Vec::new(),
        }
    }

    /// The record of the entry file.
    #[must_use]
    pub fn entry_record(&self) -> Option<&SourceRecord> {
        self.records.iter().find(|r| r.path == self.entry && r.role.contributes_body())
    }

    /// Paths of every record in emission order.
    pub fn source_paths(&self) -> impl Iterator<Item = &Path> {
        self.records.iter().map(|r| r.path.as_path())
    }

    fn add_link(&mut self, path: &Path) {
        if path != self.entry && !self.links.iter().any(|l| l == path) {
            self.links.push(path.to_path_buf());
        }
    }
}

/// Walks the directive graph of an entry file.
pub struct DependencyResolver<'a> {
    resolver: &'a dyn LogicalResolver,
    renderer: &'a dyn Renderer,
}

impl<'a> DependencyResolver<'a> {
    /// Creates a resolver over the given lookup and render services.
    pub fn new(resolver: &'a dyn LogicalResolver, renderer: &'a dyn Renderer) -> Self {
        Self { resolver, renderer }
    }

    /// Resolves `entry` with a fresh [`ResolverContext`].
    ///
    /// # Errors
    ///
    /// - [`SprocketsError::FileNotFound`] for unresolvable or escaping arguments
    /// - [`SprocketsError::ContentTypeMismatch`] when a contributing file has
    ///   another content type than `entry`
    /// - [`SprocketsError::ArgumentError`] for malformed directives
    pub fn resolve(&self, entry: &Path) -> Result<Resolution> {
        let mut context = ResolverContext::new();
        self.resolve_with(entry, &mut context)
    }

    /// Resolves `entry` using a caller-provided context.
    ///
    /// Files already required in `context` are skipped, including `entry`.
    pub fn resolve_with(&self, entry: &Path, context: &mut ResolverContext) -> Result<Resolution> {
        debug!("Resolving dependencies of {}", entry.display());
        let mut resolution = Resolution::new(entry);
        if context.mark_required(entry) {
            self.expand(entry, SourceRole::Required, context, &mut resolution)?;
        }
        debug!(
            "Resolved {} to {} source(s) and {} link(s)",
            entry.display(),
            resolution.records.len(),
            resolution.links.len()
        );
        Ok(resolution)
    }

    fn expand(
        &self,
        path: &Path,
        role: SourceRole,
        context: &mut ResolverContext,
        resolution: &mut Resolution,
    ) -> Result<()> {
        context.push(path);
        let result = self.expand_file(path, role, context, resolution);
        context.pop();
        result
    }

    fn expand_file(
        &self,
        path: &Path,
        role: SourceRole,
        context: &mut ResolverContext,
        resolution: &mut Resolution,
    ) -> Result<()> {
        trace!("Expanding {} ({:?}) via {}", path.display(), role, context.chain());
        let rendered = self
            .renderer
            .render(path)
            .with_context(|| format!("Failed to render {}", path.display()))?;

        context.set_content_type(&rendered.content_type);
        if role.contributes_body() {
            check_content_type(path, &rendered.content_type, context)?;
        }

        let processed = directive::parse(&rendered.text)
            .with_context(|| format!("Invalid directive in {}", path.display()))?;

        let mut pending = Some(SourceRecord {
            path: path.to_path_buf(),
            body: processed.body,
            content_type: rendered.content_type.clone(),
            format_extension: rendered.format_extension.clone(),
            mtime: rendered.mtime,
            header_end: processed.header_end,
            includes: Vec::new(),
            role,
        });
        let mut includes = Vec::new();

        // Anything reached from a dependency-only file is dependency-only too.
        let child_role = |wanted: SourceRole| {
            if role.contributes_body() {
                wanted
            } else {
                SourceRole::Dependency
            }
        };

        for directive in &processed.directives {
            match directive.kind {
                DirectiveKind::RequireSelf => {
                    if let Some(record) = pending.take() {
                        resolution.records.push(record);
                    }
                }
                DirectiveKind::Require => {
                    let target = self.resolve_target(path, &rendered.format_extension, directive)?;
                    resolution.add_link(&target);
                    self.require(&target, child_role(SourceRole::Required), context, resolution)?;
                }
                DirectiveKind::Include => {
                    let target = self.resolve_target(path, &rendered.format_extension, directive)?;
                    resolution.add_link(&target);
                    if self.require(&target, child_role(SourceRole::Included), context, resolution)? {
                        includes.push(target);
                    }
                }
                DirectiveKind::RequireTree | DirectiveKind::RequireDirectory => {
                    for target in self.directory_members(path, &rendered.content_type, directive)? {
                        resolution.add_link(&target);
                        self.require(&target, child_role(SourceRole::Required), context, resolution)?;
                    }
                }
                DirectiveKind::DependOn | DirectiveKind::DependOnAsset => {
                    let target = self.resolve_target(path, &rendered.format_extension, directive)?;
                    resolution.add_link(&target);
                    self.track(&target, context, resolution)?;
                }
            }
        }

        match pending {
            Some(mut record) => {
                record.includes = includes;
                resolution.records.push(record);
            }
            None => {
                if let Some(record) =
                    resolution.records.iter_mut().find(|r| r.path == path && r.role == role)
                {
                    record.includes = includes;
                }
            }
        }

        Ok(())
    }

    /// Visits `target` as a body contributor. Returns `false` if it was
    /// already part of the asset.
    fn require(
        &self,
        target: &Path,
        role: SourceRole,
        context: &mut ResolverContext,
        resolution: &mut Resolution,
    ) -> Result<bool> {
        if role == SourceRole::Dependency {
            self.track(target, context, resolution)?;
            return Ok(false);
        }
        if !context.mark_required(target) {
            trace!("Skipping already visited {}", target.display());
            return Ok(false);
        }
        resolution
            .records
            .retain(|r| !(r.path == target && r.role == SourceRole::Dependency));
        self.expand(target, role, context, resolution)?;
        Ok(true)
    }

    /// Visits `target` and its tree for freshness only.
    fn track(&self, target: &Path, context: &mut ResolverContext, resolution: &mut Resolution) -> Result<()> {
        if !context.mark_tracked(target) {
            return Ok(());
        }
        self.expand(target, SourceRole::Dependency, context, resolution)
    }

    fn resolve_target(&self, from: &Path, format_extension: &str, directive: &Directive) -> Result<PathBuf> {
        let argument = directive.argument.as_deref().ok_or_else(|| {
            SprocketsError::argument(directive.kind.name(), format!("line {}: missing argument", directive.line))
        })?;
        let extension = (!format_extension.is_empty()).then_some(format_extension);

        let target = if is_relative_token(argument) {
            self.resolver.resolve_relative(from, argument, extension)
        } else {
            self.resolver.resolve_logical_path(argument, extension)
        };

        target.with_context(|| {
            format!(
                "{} '{}' on line {} of {}",
                directive.kind,
                argument,
                directive.line,
                from.display()
            )
        })
    }

    /// Requirable files of a `require_tree`/`require_directory` target, sorted
    /// by their slash-joined path relative to the target, so `a.js` precedes
    /// `a/z.js`. Hidden entries and other content types are skipped.
    fn directory_members(&self, from: &Path, content_type: &str, directive: &Directive) -> Result<Vec<PathBuf>> {
        let token = directive.argument.as_deref().unwrap_or(".");
        let directory = self.resolver.resolve_directory(from, token).with_context(|| {
            format!("{} '{}' on line {} of {}", directive.kind, token, directive.line, from.display())
        })?;
        if !directory.is_dir() {
            return Err(SprocketsError::argument(
                directive.kind.name(),
                format!(
                    "line {} of {}: '{}' is not a directory",
                    directive.line,
                    from.display(),
                    token
                ),
            )
            .into());
        }

        let max_depth = match directive.kind {
            DirectiveKind::RequireDirectory => 1,
            _ => usize::MAX,
        };

        let mut members = Vec::new();
        let walker = WalkDir::new(&directory)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !entry.file_name().to_string_lossy().starts_with('.'));

        for entry in walker {
            let entry = entry.with_context(|| format!("Failed to walk {}", directory.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if self.renderer.content_type_of(entry.path()) != content_type {
                trace!("Skipping {} (not {})", entry.path().display(), content_type);
                continue;
            }
            members.push(entry.into_path());
        }

        members.sort_by_cached_key(|member| to_slash(member.strip_prefix(&directory).unwrap_or(member)));
        Ok(members)
    }
}

fn check_content_type(path: &Path, actual: &str, context: &ResolverContext) -> Result<()> {
    match context.content_type() {
        Some(expected) if expected != actual => Err(SprocketsError::ContentTypeMismatch {
            path: path.display().to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
        .into()),
        _ => Ok(()),
    }
}

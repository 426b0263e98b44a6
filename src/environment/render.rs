//! Render service boundary.
//!
//! Turning a file's raw bytes into final text (CoffeeScript, ERB, Sass and
//! friends) is outside this crate. The pipeline only needs the rendered text,
//! its declared content type and format extension, and the file's
//! modification time. [`Renderer`] is that boundary; [`PassthroughRenderer`]
//! is the implementation used when no transformation chain is configured.

use anyhow::{Context, Result};
use std::path::Path;
use std::time::SystemTime;

use crate::core::SprocketsError;

/// Content type used for files with no registered format extension.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Registered format extensions and their content types.
const MIME_TYPES: &[(&str, &str)] = &[
    (".js", "application/javascript"),
    (".css", "text/css"),
    (".html", "text/html"),
    (".json", "application/json"),
    (".svg", "image/svg+xml"),
    (".txt", "text/plain"),
    (".xml", "application/xml"),
];

/// Looks up the content type registered for a format extension (with dot).
#[must_use]
pub fn mime_type_for(extension: &str) -> Option<&'static str> {
    MIME_TYPES.iter().find(|(ext, _)| *ext == extension).map(|(_, mime)| *mime)
}

/// Splits a file name into its base name and extension chain.
///
/// `application.js.coffee` becomes `("application", [".js", ".coffee"])`.
/// A leading dot (hidden file) is part of the base name.
#[must_use]
pub fn split_extensions(file_name: &str) -> (&str, Vec<&str>) {
    let start = usize::from(file_name.starts_with('.'));
    match file_name[start..].find('.') {
        Some(pos) => {
            let base_end = start + pos;
            let rest = &file_name[base_end..];
            let mut extensions = Vec::new();
            let mut offset = 0;
            for (i, _) in rest.match_indices('.').skip(1) {
                extensions.push(&rest[offset..i]);
                offset = i;
            }
            extensions.push(&rest[offset..]);
            (&file_name[..base_end], extensions)
        }
        None => (file_name, Vec::new()),
    }
}

/// The first extension of the chain that has a registered content type.
///
/// `unknownexts.min.js` yields `.js`; `application.js.coffee` yields `.js`.
#[must_use]
pub fn format_extension_of(path: &Path) -> Option<&'static str> {
    let file_name = path.file_name()?.to_str()?;
    let (_, extensions) = split_extensions(file_name);
    extensions.iter().find_map(|ext| {
        MIME_TYPES.iter().find(|(registered, _)| registered == ext).map(|(registered, _)| *registered)
    })
}

/// Output of the render step for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    /// Final text after rendering
    pub text: String,
    /// Declared content type (e.g. `application/javascript`)
    pub content_type: String,
    /// Format extension with leading dot (e.g. `.js`), empty when unknown
    pub format_extension: String,
    /// Last modification time of the underlying file
    pub mtime: SystemTime,
}

/// Renders a source file into final text.
///
/// Implementations must be deterministic for a given on-disk content.
pub trait Renderer: Send + Sync {
    /// Render the file at `path`.
    fn render(&self, path: &Path) -> Result<RenderedFile>;

    /// The content type `path` would render to, without reading it.
    ///
    /// Used to decide which files of a directory are requirable.
    fn content_type_of(&self, path: &Path) -> String {
        format_extension_of(path)
            .and_then(mime_type_for)
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string()
    }
}

/// Reads files as UTF-8 text without transforming them.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughRenderer;

impl Renderer for PassthroughRenderer {
    fn render(&self, path: &Path) -> Result<RenderedFile> {
        let bytes = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                anyhow::Error::from(SprocketsError::file_not_found(
                    path.display().to_string(),
                    "file disappeared before it could be read",
                ))
            } else {
                anyhow::Error::from(e)
            }
        })?;

        let text = String::from_utf8(bytes).map_err(|_| SprocketsError::Pipeline {
            message: format!("{} is not valid UTF-8 text", path.display()),
        })?;

        let mtime = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .with_context(|| format!("Failed to read modification time of {}", path.display()))?;

        let format_extension = format_extension_of(path).unwrap_or_default();

        Ok(RenderedFile {
            text,
            content_type: self.content_type_of(path),
            format_extension: format_extension.to_string(),
            mtime,
        })
    }
}

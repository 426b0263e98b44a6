//! Test fixtures for creating sample asset trees and configuration files.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::TempDir;

/// A temporary directory populated with source files.
///
/// Builder methods panic on I/O failure; fixtures are for tests only.
#[derive(Debug)]
pub struct FixtureTree {
    dir: TempDir,
}

impl Default for FixtureTree {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create fixture directory"),
        }
    }

    /// A small application tree used across the pipeline tests.
    ///
    /// ```text
    /// application.js      requires project, users; ends with focus()
    /// project.js
    /// users.js
    /// included_header.js  includes project after a header comment
    /// coffee.js, coffee/index.js, coffee/foo.js
    /// gallery.css, gallery-link.js, explore-link.js
    /// mobile/a.js, mobile/b.js, mobile/c.css
    /// ```
    pub fn sample_assets() -> Self {
        Self::new()
            .file(
                "application.js",
                "// Application\n//= require project\n//= require users\n\nfocus();\n",
            )
            .file("project.js", "var Project = {\n  find: function(id) {}\n};\n")
            .file("users.js", "var Users = {\n  find: function(id) {}\n};\n")
            .file("included_header.js", "# My Application\n#= include project\n\nhello()\n")
            .file("coffee.js", "var coffee = 'explicit';\n")
            .file("coffee/index.js", "var coffee = 'index';\n")
            .file("coffee/foo.js", "var foo = 1;\n")
            .file("gallery.css", "body { color: red; }\n")
            .file("gallery-link.js", "//= depend_on gallery.css\nvar gallery = true;\n")
            .file("explore-link.js", "//= require gallery-link\nvar explore = true;\n")
            .file("mobile/a.js", "var a;\n")
            .file("mobile/b.js", "var b;\n")
            .file("mobile/c.css", "a { }\n")
    }

    /// Adds a file, creating parent directories.
    #[must_use]
    pub fn file(self, relative: &str, content: &str) -> Self {
        self.write(relative, content);
        self
    }

    /// Writes (or overwrites) a file in the tree.
    pub fn write(&self, relative: &str, content: &str) {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create fixture parent directory");
        }
        fs::write(&path, content).expect("failed to write fixture file");
    }

    /// Sets the modification time of a file in the tree.
    pub fn set_mtime(&self, relative: &str, mtime: SystemTime) {
        let file = File::options()
            .write(true)
            .open(self.dir.path().join(relative))
            .expect("failed to open fixture file");
        file.set_modified(mtime).expect("failed to set fixture mtime");
    }

    /// Root of the tree.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of a file in the tree.
    pub fn join(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }
}

/// Sample `sprockets.toml` contents.
#[derive(Clone, Debug)]
pub struct ConfigFixture {
    pub content: String,
}

impl ConfigFixture {
    /// Load path `app/assets`, output `public/assets`.
    pub fn basic() -> Self {
        Self {
            content: r#"
load_paths = ["app/assets"]
output = "public/assets"
precompile = ["application.js"]

[clean]
keep = 2
max_age = 3600
"#
            .trim()
            .to_string(),
        }
    }

    /// Not valid TOML.
    pub fn invalid_syntax() -> Self {
        Self {
            content: "load_paths = [\"app/assets\"\n".to_string(),
        }
    }

    /// Writes the fixture as `sprockets.toml` in `dir`.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join("sprockets.toml");
        fs::write(&path, &self.content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

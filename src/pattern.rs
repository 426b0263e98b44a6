//! Asset filters for `find` and `compile`.
//!
//! Every way of selecting assets is normalized into one [`AssetFilter`]: a
//! predicate over `(logical path, absolute file path)`. The adapters are:
//!
//! | Input                          | Matches when                                   |
//! |--------------------------------|------------------------------------------------|
//! | exact name (`application.js`)  | the logical path or the file path equals it    |
//! | glob (`mobile/*.js`)           | the logical path matches the glob              |
//! | [`Regex`]                      | the regex finds a match in the logical path    |
//! | closure over the logical path  | the closure returns `true`                     |
//! | closure over both              | the closure returns `true`                     |
//!
//! # Glob Syntax
//!
//! Globs use the [`glob`] crate with `require_literal_separator`, so `*` never
//! crosses a `/`:
//!
//! - `*` matches within one path component
//! - `**` matches across components
//! - `?` and `[a-z]` match single characters
//!
//! # Examples
//!
//! ```rust,no_run
//! use sprockets_cli::pattern::AssetFilter;
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! let glob = AssetFilter::glob("mobile/*.js")?;
//! assert!(glob.matches("mobile/a.js", Path::new("/app/mobile/a.js")));
//! assert!(!glob.matches("mobile/deep/b.js", Path::new("/app/mobile/deep/b.js")));
//!
//! let from_str: AssetFilter = "application.js".into();
//! assert_eq!(from_str.literal(), Some("application.js"));
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use glob::{MatchOptions, Pattern};
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::trace;

use crate::core::SprocketsError;

type Predicate = dyn Fn(&str, &Path) -> bool + Send + Sync;

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A predicate selecting assets by logical path and file path.
#[derive(Clone)]
pub struct AssetFilter {
    description: String,
    literal: Option<String>,
    predicate: Arc<Predicate>,
}

impl fmt::Debug for AssetFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetFilter")
            .field("description", &self.description)
            .field("literal", &self.literal)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for AssetFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

impl AssetFilter {
    /// Matches one logical name or absolute file path exactly.
    pub fn exact(name: impl Into<String>) -> Self {
        let name = name.into();
        let expected = name.clone();
        Self {
            description: name.clone(),
            literal: Some(name),
            predicate: Arc::new(move |logical: &str, path: &Path| {
                logical == expected || path == Path::new(&expected)
            }),
        }
    }

    /// Matches logical paths against a glob.
    ///
    /// # Errors
    ///
    /// Returns [`SprocketsError::InvalidPattern`] for malformed globs.
    pub fn glob(pattern: &str) -> Result<Self> {
        let compiled = Pattern::new(pattern).map_err(|e| SprocketsError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            description: pattern.to_string(),
            literal: None,
            predicate: Arc::new(move |logical: &str, _: &Path| {
                compiled.matches_with(logical, GLOB_OPTIONS)
            }),
        })
    }

    /// Compiles `pattern` and matches logical paths against it.
    ///
    /// # Errors
    ///
    /// Returns [`SprocketsError::InvalidPattern`] for malformed expressions.
    pub fn regex(pattern: &str) -> Result<Self> {
        let compiled = Regex::new(pattern).map_err(|e| SprocketsError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::from(compiled))
    }

    /// Matches when `predicate(logical_path)` holds.
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            description: "<predicate>".to_string(),
            literal: None,
            predicate: Arc::new(move |logical: &str, _: &Path| predicate(logical)),
        }
    }

    /// Matches when `predicate(logical_path, file_path)` holds.
    pub fn predicate_with_path<F>(predicate: F) -> Self
    where
        F: Fn(&str, &Path) -> bool + Send + Sync + 'static,
    {
        Self {
            description: "<predicate>".to_string(),
            literal: None,
            predicate: Arc::new(predicate),
        }
    }

    /// Parses a user-supplied string: a glob when it contains glob
    /// metacharacters, an exact name otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`SprocketsError::InvalidPattern`] for malformed globs.
    pub fn parse(input: &str) -> Result<Self> {
        if is_glob(input) {
            Self::glob(input)
        } else {
            Ok(Self::exact(input))
        }
    }

    /// Tests an asset.
    #[must_use]
    pub fn matches(&self, logical_path: &str, path: &Path) -> bool {
        let matched = (self.predicate)(logical_path, path);
        if matched {
            trace!("Filter '{}' matched {}", self.description, logical_path);
        }
        matched
    }

    /// The exact name for filters built by [`exact`](Self::exact).
    ///
    /// Lets callers look the asset up directly instead of scanning every
    /// logical path.
    #[must_use]
    pub fn literal(&self) -> Option<&str> {
        self.literal.as_deref()
    }
}

/// True when `input` contains glob metacharacters.
#[must_use]
pub fn is_glob(input: &str) -> bool {
    input.contains(['*', '?', '['])
}

impl From<&str> for AssetFilter {
    /// Exact name, or a glob when `input` contains metacharacters and compiles.
    fn from(input: &str) -> Self {
        Self::parse(input).unwrap_or_else(|_| Self::exact(input))
    }
}

impl From<String> for AssetFilter {
    fn from(input: String) -> Self {
        Self::from(input.as_str())
    }
}

impl From<&String> for AssetFilter {
    fn from(input: &String) -> Self {
        Self::from(input.as_str())
    }
}

impl From<&Path> for AssetFilter {
    fn from(path: &Path) -> Self {
        Self::exact(path.to_string_lossy().into_owned())
    }
}

impl From<PathBuf> for AssetFilter {
    fn from(path: PathBuf) -> Self {
        Self::from(path.as_path())
    }
}

impl From<Regex> for AssetFilter {
    fn from(regex: Regex) -> Self {
        Self {
            description: format!("/{}/", regex.as_str()),
            literal: None,
            predicate: Arc::new(move |logical: &str, _: &Path| regex.is_match(logical)),
        }
    }
}

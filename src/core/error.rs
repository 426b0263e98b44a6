//! Error handling for the asset pipeline
//!
//! This module provides the typed error taxonomy of the pipeline and the
//! user-friendly error reporting used by the CLI. The error system follows two
//! principles:
//! 1. **Strongly-typed errors** so callers can react to specific failures
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Error Categories
//!
//! - **Resolution**: [`SprocketsError::FileNotFound`] when a directive argument
//!   escapes the load paths or names a file that does not exist
//! - **Composition**: [`SprocketsError::ContentTypeMismatch`] when a dependency
//!   belongs to a different content family than the asset requiring it
//! - **Directive usage**: [`SprocketsError::ArgumentError`] for structurally
//!   invalid directive arguments (e.g. `require_tree` with a logical path)
//! - **Pipeline**: [`SprocketsError::Pipeline`] for manifest operations without
//!   a usable environment and other precondition violations
//!
//! Functions in this crate return [`anyhow::Result`] and attach context as the
//! error travels up. The typed variant stays reachable through
//! [`anyhow::Error::downcast_ref`]:
//!
//! ```rust,no_run
//! use sprockets_cli::core::SprocketsError;
//!
//! fn classify(err: &anyhow::Error) -> &'static str {
//!     match err.downcast_ref::<SprocketsError>() {
//!         Some(SprocketsError::FileNotFound { .. }) => "missing",
//!         Some(SprocketsError::ContentTypeMismatch { .. }) => "mismatch",
//!         Some(_) => "pipeline",
//!         None => "unknown",
//!     }
//! }
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for pipeline operations.
///
/// Each variant names one failure mode of resolving, building or persisting
/// assets. None of them are retried internally; they surface synchronously to
/// the caller of `resolve`, `build` or `compile`.
#[derive(Error, Debug)]
pub enum SprocketsError {
    /// A directive argument could not be mapped to a file inside the load paths.
    ///
    /// Raised both for arguments that do not exist and for relative arguments
    /// that climb above every configured load path.
    #[error("couldn't find file '{path}'")]
    FileNotFound {
        /// The logical name, relative token or absolute path that failed to resolve
        path: String,
        /// Why resolution failed
        reason: String,
    },

    /// A dependency's content type differs from the asset requiring it.
    #[error("{path} is '{actual}', not '{expected}'")]
    ContentTypeMismatch {
        /// Absolute path of the offending dependency
        path: String,
        /// Content type of the entry asset
        expected: String,
        /// Content type declared for the dependency
        actual: String,
    },

    /// A directive was used with an argument its kind cannot accept.
    #[error("invalid argument for '{directive}': {reason}")]
    ArgumentError {
        /// Directive name as written in the source (e.g. `require_tree`)
        directive: String,
        /// What was wrong with the argument
        reason: String,
    },

    /// Generic pipeline failure (missing environment, violated precondition).
    #[error("{message}")]
    Pipeline {
        /// Description of the failure
        message: String,
    },

    /// The manifest index on disk could not be parsed.
    ///
    /// Loading downgrades this to an empty manifest; the variant exists so the
    /// downgrade can be logged with a precise reason.
    #[error("Invalid manifest file syntax in {file}")]
    ManifestParseError {
        /// Path to the manifest file that failed to parse
        file: String,
        /// Parser message
        reason: String,
    },

    /// A `find`/`compile` filter could not be compiled.
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The pattern as given by the caller
        pattern: String,
        /// Compiler message from the glob or regex engine
        reason: String,
    },

    /// Project configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

impl SprocketsError {
    /// Shorthand for a [`SprocketsError::Pipeline`] error.
    pub fn pipeline(message: impl Into<String>) -> Self {
        Self::Pipeline {
            message: message.into(),
        }
    }

    /// Shorthand for a [`SprocketsError::FileNotFound`] error.
    pub fn file_not_found(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FileNotFound {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`SprocketsError::ArgumentError`] error.
    pub fn argument(directive: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ArgumentError {
            directive: directive.into(),
            reason: reason.into(),
        }
    }
}

impl Clone for SprocketsError {
    fn clone(&self) -> Self {
        match self {
            Self::FileNotFound {
                path,
                reason,
            } => Self::FileNotFound {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::ContentTypeMismatch {
                path,
                expected,
                actual,
            } => Self::ContentTypeMismatch {
                path: path.clone(),
                expected: expected.clone(),
                actual: actual.clone(),
            },
            Self::ArgumentError {
                directive,
                reason,
            } => Self::ArgumentError {
                directive: directive.clone(),
                reason: reason.clone(),
            },
            Self::Pipeline {
                message,
            } => Self::Pipeline {
                message: message.clone(),
            },
            Self::ManifestParseError {
                file,
                reason,
            } => Self::ManifestParseError {
                file: file.clone(),
                reason: reason.clone(),
            },
            Self::InvalidPattern {
                pattern,
                reason,
            } => Self::InvalidPattern {
                pattern: pattern.clone(),
                reason: reason.clone(),
            },
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            // io::Error and serde_json::Error are not Clone; keep kind and message
            Self::IoError(e) => Self::IoError(std::io::Error::new(e.kind(), e.to_string())),
            Self::JsonError(e) => Self::Other {
                message: format!("JSON error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error wrapper carrying a user-facing suggestion and details.
///
/// This is what the CLI prints. Build one with [`ErrorContext::new`] and the
/// `with_*` builder methods, or convert an arbitrary [`anyhow::Error`] with
/// [`user_friendly_error`].
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying pipeline error
    pub error: SprocketsError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: SprocketsError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    ///
    /// - Error message: red and bold
    /// - Details: yellow
    /// - Suggestion: green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions
///
/// Recognizes [`SprocketsError`] anywhere in the context chain,
/// [`std::io::Error`] and [`toml::de::Error`]; everything else is reported
/// with its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(pipeline_error) = error.downcast_ref::<SprocketsError>() {
        let context = create_error_context(pipeline_error.clone());
        // Keep the outer context messages, they name the asset being built
        let chain = format_chain(&error);
        return match (chain, &context.details) {
            (Some(chain), None) => context.with_details(chain),
            _ => context,
        };
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(SprocketsError::Other {
                    message: error.to_string(),
                })
                .with_suggestion("Check write permissions on the output directory and manifest file")
                .with_details("The pipeline could not read a source file or write a build output");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(SprocketsError::Other {
                    message: error.to_string(),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(SprocketsError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax in sprockets.toml. Verify quotes, brackets, and indentation");
    }

    let mut message = error.to_string();
    if let Some(chain) = format_chain(&error) {
        message.push_str("\n\n");
        message.push_str(&chain);
    }

    ErrorContext::new(SprocketsError::Other {
        message,
    })
}

fn format_chain(error: &anyhow::Error) -> Option<String> {
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if chain.is_empty() {
        return None;
    }

    let mut message = String::from("Caused by:");
    for (i, cause) in chain.iter().enumerate() {
        message.push_str(&format!("\n  {}: {}", i + 1, cause));
    }
    Some(message)
}

fn create_error_context(error: SprocketsError) -> ErrorContext {
    match &error {
        SprocketsError::FileNotFound {
            reason, ..
        } => {
            let reason = reason.clone();
            ErrorContext::new(error)
                .with_suggestion("Check the directive argument and the configured load paths (--load-path / load_paths)")
                .with_details(reason)
        }

        SprocketsError::ContentTypeMismatch {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Only require files of the same content type; use depend_on for cross-type freshness tracking")
            .with_details("Directive composition is only valid within one content family (script with script, stylesheet with stylesheet)"),

        SprocketsError::ArgumentError {
            directive, ..
        } if directive == "require_tree" || directive == "require_directory" => {
            ErrorContext::new(error)
                .with_suggestion("Use a relative directory argument such as '.' or './components'")
        }

        SprocketsError::Pipeline {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Configure at least one load path so the manifest has an environment to compile from"),

        SprocketsError::ConfigError {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check sprockets.toml for unknown keys or invalid values"),

        _ => ErrorContext::new(error),
    }
}

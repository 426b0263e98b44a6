//! Core types shared across the pipeline
//!
//! This module holds the error taxonomy used by every other module:
//! - [`SprocketsError`] - enumerated failure modes of resolve, build and compile
//! - [`ErrorContext`] - user-facing wrapper with details and suggestions
//! - [`user_friendly_error`] - convert any [`anyhow::Error`] for CLI display

pub mod error;

pub use error::{ErrorContext, SprocketsError, user_friendly_error};

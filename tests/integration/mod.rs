//! Integration test suite for sprockets
//!
//! End-to-end tests over real directory trees: directive resolution through
//! the public library API, manifest persistence across instances, and the
//! `sprockets` binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **pipeline**: Resolution, concatenation and digests through [`Environment`]
//! - **manifest**: Compile, find, remove and clean against an output directory
//! - **cli**: The `sprockets` binary driven by `sprockets.toml` and flags
//!
//! [`Environment`]: sprockets_cli::environment::Environment

mod cli;
mod common;
mod manifest;
mod pipeline;

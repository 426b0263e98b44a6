//! Shared helpers for integration tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use assert_cmd::Command;
use sprockets_cli::environment::{Environment, EnvironmentHandle};
use sprockets_cli::manifest::Manifest;
use sprockets_cli::test_utils::{ConfigFixture, FixtureTree, init_test_logging};

/// A project directory with sources under `app/assets` and output under
/// `public/assets`.
pub struct TestProject {
    pub tree: FixtureTree,
}

impl TestProject {
    /// Empty project with the basic `sprockets.toml`.
    pub fn new() -> Self {
        init_test_logging(None);
        let tree = FixtureTree::new();
        ConfigFixture::basic().write_to(tree.path()).unwrap();
        Self { tree }
    }

    /// Adds a source file under `app/assets`.
    pub fn source(self, relative: &str, content: &str) -> Self {
        self.write_source(relative, content);
        self
    }

    pub fn write_source(&self, relative: &str, content: &str) {
        self.tree.write(&format!("app/assets/{relative}"), content);
    }

    pub fn path(&self) -> &Path {
        self.tree.path()
    }

    pub fn load_path(&self) -> PathBuf {
        self.tree.join("app/assets")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.tree.join("public/assets")
    }

    /// Opens a manifest over the project, as the CLI would.
    pub fn manifest(&self) -> Manifest {
        let environment: EnvironmentHandle = Arc::new(Environment::new(vec![self.load_path()]).unwrap());
        Manifest::new(Some(environment), self.output_dir()).unwrap()
    }

    /// The binary, running inside the project directory.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("sprockets").unwrap();
        cmd.current_dir(self.path()).env_remove("RUST_LOG").env("NO_COLOR", "1");
        cmd
    }
}

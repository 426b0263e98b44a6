//! Manifest operations against a real output directory.

use std::fs;
use std::time::{Duration, SystemTime};

use regex::Regex;
use sprockets_cli::core::SprocketsError;

use crate::common::TestProject;

fn sample_project() -> TestProject {
    TestProject::new()
        .source("application.js", "//= require project\n//= require users\napp();\n")
        .source("project.js", "project();\n")
        .source("users.js", "users();\n")
        .source("gallery.css", "body {}\n")
        .source("mobile/c.css", "a {}\n")
}

#[test]
fn test_compile_materializes_linked_assets() {
    let project = sample_project();
    let manifest = project.manifest();

    let assets = manifest.compile(["application.js"]).unwrap();
    let mut names: Vec<&str> = assets.iter().map(|a| a.logical_path.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, ["application.js", "project.js", "users.js"]);

    let index = manifest.assets();
    let files = manifest.files();
    assert_eq!(index.len(), 3);
    for asset in &assets {
        let digest_path = &index[&asset.logical_path];
        assert_eq!(digest_path, &asset.digest_path());
        let written = fs::read_to_string(project.output_dir().join(digest_path)).unwrap();
        assert_eq!(written, asset.body);

        let entry = &files[digest_path];
        assert_eq!(entry.logical_path, asset.logical_path);
        assert_eq!(entry.size, asset.length as u64);
        assert_eq!(entry.digest, asset.digest);
    }
}

#[test]
fn test_index_persists_across_instances() {
    let project = sample_project();
    let first = project.manifest();
    first.compile(["application.js"]).unwrap();

    let file_name = first.filename().file_name().unwrap().to_string_lossy().into_owned();
    let canonical = Regex::new(r"^\.sprockets-manifest-[0-9a-f]{32}\.json$").unwrap();
    assert!(canonical.is_match(&file_name), "unexpected index name {file_name}");

    let second = project.manifest();
    assert_eq!(second.filename(), first.filename());
    assert_eq!(second.data(), first.data());
}

#[test]
fn test_instances_sharing_a_directory_merge_updates() {
    let project = sample_project();
    let first = project.manifest();
    first.compile(["gallery.css"]).unwrap();
    let second = project.manifest();
    assert_eq!(second.filename(), first.filename());

    first.compile(["mobile/c.css"]).unwrap();
    assert!(!second.assets().contains_key("mobile/c.css"));
    second.reload().unwrap();
    assert!(second.assets().contains_key("mobile/c.css"));

    // Each write re-reads the index under the lock, so neither update is lost
    second.compile(["users.js"]).unwrap();
    first.compile(["project.js"]).unwrap();
    let merged = project.manifest().assets();
    assert!(merged.contains_key("gallery.css"));
    assert!(merged.contains_key("mobile/c.css"));
    assert!(merged.contains_key("users.js"));
    assert!(merged.contains_key("project.js"));
}

#[test]
fn test_recompile_unchanged_is_idempotent() {
    let project = sample_project();
    let manifest = project.manifest();

    manifest.compile(["application.js"]).unwrap();
    let before = manifest.data();
    manifest.compile(["application.js"]).unwrap();

    assert_eq!(manifest.data(), before);
    assert_eq!(manifest.files().len(), 3);
}

#[test]
fn test_changed_source_adds_a_version_and_clean_drops_the_old_one() {
    let project = sample_project();
    let manifest = project.manifest();
    let old = manifest.compile(["application.js"]).unwrap();
    let old_path = old.iter().find(|a| a.logical_path == "application.js").unwrap().digest_path();

    project.write_source("application.js", "//= require project\n//= require users\napp(2);\n");
    project
        .tree
        .set_mtime("app/assets/application.js", SystemTime::now() + Duration::from_secs(5));
    manifest.compile(["application.js"]).unwrap();

    let current = manifest.assets()["application.js"].clone();
    assert_ne!(current, old_path);
    assert_eq!(manifest.files().len(), 4);

    let removed = manifest.clean(1, Duration::ZERO).unwrap();
    assert_eq!(removed, vec![old_path.clone()]);
    assert!(!project.output_dir().join(&old_path).exists());
    assert!(project.output_dir().join(&current).exists());
    assert_eq!(manifest.files().len(), 3);
}

#[test]
fn test_clean_keeps_young_versions() {
    let project = sample_project();
    let manifest = project.manifest();
    manifest.compile(["application.js"]).unwrap();
    project.write_source("application.js", "app(2);\n");
    manifest.compile(["application.js"]).unwrap();

    let removed = manifest.clean(0, Duration::from_secs(3600)).unwrap();
    assert!(removed.is_empty());
    assert_eq!(manifest.files().len(), 4);
}

#[test]
fn test_clean_treats_future_mtimes_as_age_zero() {
    let project = sample_project();
    let manifest = project.manifest();
    manifest.compile(["application.js"]).unwrap();

    for n in 1..=3u64 {
        project.write_source("application.js", &format!("app({n});\n"));
        project
            .tree
            .set_mtime("app/assets/application.js", SystemTime::now() + Duration::from_secs(n));
        manifest.compile(["application.js"]).unwrap();
    }
    let versions = |manifest: &sprockets_cli::manifest::Manifest| {
        manifest
            .files()
            .values()
            .filter(|entry| entry.logical_path == "application.js")
            .count()
    };
    assert_eq!(versions(&manifest), 4);

    let removed = manifest.clean(1, Duration::ZERO).unwrap();
    assert_eq!(removed.len(), 3);
    assert_eq!(versions(&manifest), 1);
    let current = manifest.assets()["application.js"].clone();
    assert!(manifest.files().contains_key(&current));
    assert!(project.output_dir().join(&current).exists());
}

#[test]
fn test_remove_clears_file_and_pointer() {
    let project = sample_project();
    let manifest = project.manifest();
    manifest.compile(["users.js"]).unwrap();
    let digest_path = manifest.assets()["users.js"].clone();

    assert!(manifest.remove(&digest_path).unwrap());
    assert!(!project.output_dir().join(&digest_path).exists());
    assert!(!manifest.assets().contains_key("users.js"));
    assert!(!manifest.files().contains_key(&digest_path));

    assert!(!manifest.remove(&digest_path).unwrap());
}

#[test]
fn test_remove_rejects_paths_outside_output() {
    let project = sample_project();
    let manifest = project.manifest();

    let err = manifest.remove("../sprockets.toml").unwrap_err();
    assert!(matches!(err.downcast_ref::<SprocketsError>(), Some(SprocketsError::Pipeline { .. })));
    assert!(project.path().join("sprockets.toml").exists());
}

#[test]
fn test_compile_glob_and_missing_name() {
    let project = sample_project();
    let manifest = project.manifest();

    let assets = manifest.compile(["*.css"]).unwrap();
    let names: Vec<&str> = assets.iter().map(|a| a.logical_path.as_str()).collect();
    assert_eq!(names, ["gallery.css"]);

    let assets = manifest.compile(["**/*.css"]).unwrap();
    assert!(assets.iter().any(|a| a.logical_path == "mobile/c.css"));

    let err = manifest.compile(["missing.js"]).unwrap_err();
    assert!(matches!(err.downcast_ref::<SprocketsError>(), Some(SprocketsError::FileNotFound { .. })));
}

#[test]
fn test_find_does_not_write() {
    let project = sample_project();
    let manifest = project.manifest();

    let found = manifest.find("*.js").unwrap().to_vec().unwrap();
    assert_eq!(found.len(), 3);
    assert!(manifest.assets().is_empty());
    assert!(!project.output_dir().join("application.js").exists());
}

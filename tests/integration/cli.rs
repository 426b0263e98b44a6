//! The `sprockets` binary end to end.

use predicates::prelude::*;
use sprockets_cli::test_utils::ConfigFixture;

use crate::common::TestProject;

fn project() -> TestProject {
    TestProject::new()
        .source("application.js", "//= require lib\napp();\n")
        .source("lib.js", "lib();\n")
        .source("site.css", "body {}\n")
}

#[test]
fn test_compile_uses_precompile_from_config() {
    let project = project();

    project
        .cmd()
        .arg("compile")
        .assert()
        .success()
        .stdout(predicate::str::contains("application.js -> application-"))
        .stdout(predicate::str::contains("Compiled"));

    let manifest = project.manifest();
    let index = manifest.assets();
    assert!(index.contains_key("application.js"));
    assert!(index.contains_key("lib.js"));
    assert!(!index.contains_key("site.css"));
    assert!(project.output_dir().join(&index["application.js"]).exists());
}

#[test]
fn test_compile_named_assets_with_load_path_override() {
    let project = project();
    project.tree.write("other/extra.css", "p {}\n");

    project
        .cmd()
        .args(["-I", "other", "compile", "extra.css"])
        .assert()
        .success()
        .stdout(predicate::str::contains("extra.css -> extra-"));
}

#[test]
fn test_quiet_compile_prints_nothing() {
    let project = project();

    project
        .cmd()
        .args(["--quiet", "compile", "site.css"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_compile_missing_asset_fails() {
    let project = project();

    project
        .cmd()
        .args(["compile", "nope.js"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.js"));
}

#[test]
fn test_compile_reports_resolution_errors() {
    let project = project();
    project.write_source("broken.js", "//= require missing_dependency\n");

    project
        .cmd()
        .args(["compile", "broken.js"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing_dependency"));
}

#[test]
fn test_invalid_config_fails() {
    let project = project();
    ConfigFixture::invalid_syntax().write_to(project.path()).unwrap();

    project.cmd().arg("compile").assert().failure();
}

#[test]
fn test_find_lists_and_prints_json() {
    let project = project();

    project
        .cmd()
        .args(["find", "*.js"])
        .assert()
        .success()
        .stdout(predicate::str::contains("application.js\t"))
        .stdout(predicate::str::contains("lib.js\t"))
        .stdout(predicate::str::contains("site.css").not());

    let output = project.cmd().args(["find", "site.css", "--json"]).output().unwrap();
    assert!(output.status.success());
    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(records[0]["logical_path"], "site.css");
    assert_eq!(records[0]["content_type"], "text/css");
    assert_eq!(records[0]["source"][0], "body {}\n");
}

#[test]
fn test_find_regex() {
    let project = project();

    project
        .cmd()
        .args(["find", "--regex", r"^li.*\.js$"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lib.js"))
        .stdout(predicate::str::contains("application.js").not());
}

#[test]
fn test_remove_and_clean() {
    let project = project();
    project.cmd().args(["compile", "site.css"]).assert().success();
    let digest_path = project.manifest().assets()["site.css"].clone();

    project
        .cmd()
        .args(["remove", &digest_path])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed"));
    assert!(!project.output_dir().join(&digest_path).exists());

    project
        .cmd()
        .args(["remove", &digest_path])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to remove"));

    project
        .cmd()
        .args(["clean", "--keep", "1", "--max-age", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 0 old version(s)"));
}

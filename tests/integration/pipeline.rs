//! Directive resolution and asset building through the public API.

use sprockets_cli::asset::ResolvedAsset;
use sprockets_cli::core::SprocketsError;
use sprockets_cli::environment::{AssetEnvironment, Environment};
use sprockets_cli::test_utils::{FixtureTree, init_test_logging};

fn environment(tree: &FixtureTree) -> Environment {
    init_test_logging(None);
    Environment::new(vec![tree.path().to_path_buf()]).unwrap()
}

fn find(tree: &FixtureTree, name: &str) -> ResolvedAsset {
    environment(tree).find_asset(name).unwrap().unwrap_or_else(|| panic!("{name} not found"))
}

fn error_kind(err: &anyhow::Error) -> Option<&SprocketsError> {
    err.chain().find_map(|cause| cause.downcast_ref::<SprocketsError>())
}

/// Requires concatenate in directive order with the requiring file last.
#[test]
fn test_sample_application() {
    let tree = FixtureTree::sample_assets();
    let asset = find(&tree, "application.js");

    assert_eq!(
        asset.body,
        "var Project = {\n  find: function(id) {}\n};\n\
         var Users = {\n  find: function(id) {}\n};\n\
         // Application\n\nfocus();\n"
    );
    assert_eq!(asset.source_paths.len(), 3);
    assert!(asset.source_paths[0].ends_with("project.js"));
    assert!(asset.source_paths[2].ends_with("application.js"));
    assert_eq!(asset.length, asset.body.len());
}

#[test]
fn test_require_tree_is_recursive_and_sorted() {
    let tree = FixtureTree::new()
        .file("all.js", "//= require_tree ./lib\n")
        .file("lib/b.js", "b();\n")
        .file("lib/a.js", "a();\n")
        .file("lib/sub/c.js", "c();\n")
        .file("lib/style.css", "p {}\n")
        .file("lib/.hidden.js", "hidden();\n");

    let asset = find(&tree, "all.js");
    assert_eq!(asset.body, "a();\nb();\nc();\n");
    assert_eq!(asset.links.len(), 3);
}

#[test]
fn test_require_tree_orders_by_full_relative_path() {
    let tree = FixtureTree::new()
        .file("all.js", "//= require_tree ./lib\n")
        .file("lib/a/z.js", "z();\n")
        .file("lib/a.js", "a();\n")
        .file("lib/a-b.js", "ab();\n");

    assert_eq!(find(&tree, "all.js").body, "ab();\na();\nz();\n");
}

#[test]
fn test_require_directory_is_shallow() {
    let tree = FixtureTree::new()
        .file("top.js", "//= require_directory ./lib\n")
        .file("lib/a.js", "a();\n")
        .file("lib/sub/c.js", "c();\n");

    assert_eq!(find(&tree, "top.js").body, "a();\n");
}

#[test]
fn test_require_tree_of_a_file_is_an_argument_error() {
    let tree = FixtureTree::new()
        .file("bad.js", "//= require_tree ./other.js\n")
        .file("other.js", "other();\n");

    let err = environment(&tree).find_asset("bad.js").unwrap_err();
    assert!(matches!(error_kind(&err), Some(SprocketsError::ArgumentError { directive, .. }) if directive == "require_tree"));
}

#[test]
fn test_circular_requires_include_each_file_once() {
    let tree = FixtureTree::new()
        .file("a.js", "//= require b\na();\n")
        .file("b.js", "//= require a\nb();\n");

    assert_eq!(find(&tree, "a.js").body, "b();\na();\n");
    assert_eq!(find(&tree, "b.js").body, "a();\nb();\n");
}

#[test]
fn test_require_self_places_own_body() {
    let tree = FixtureTree::new()
        .file("main.js", "//= require_self\n//= require extra\nmain();\n")
        .file("extra.js", "extra();\n");

    assert_eq!(find(&tree, "main.js").body, "main();\nextra();\n");
}

#[test]
fn test_relative_require() {
    let tree = FixtureTree::new()
        .file("admin/main.js", "//= require ./helpers/util\nadmin();\n")
        .file("admin/helpers/util.js", "util();\n")
        .file("helpers/util.js", "wrong();\n");

    assert_eq!(find(&tree, "admin/main.js").body, "util();\nadmin();\n");
}

#[test]
fn test_content_type_mismatch() {
    let tree = FixtureTree::new()
        .file("app.js", "//= require style.css\napp();\n")
        .file("style.css", "p {}\n");

    let err = environment(&tree).find_asset("app.js").unwrap_err();
    assert!(matches!(error_kind(&err), Some(SprocketsError::ContentTypeMismatch { .. })));
}

#[test]
fn test_missing_require_names_the_file() {
    let tree = FixtureTree::new().file("app.js", "//= require nowhere\napp();\n");

    let err = environment(&tree).find_asset("app.js").unwrap_err();
    assert!(matches!(error_kind(&err), Some(SprocketsError::FileNotFound { .. })));
    assert!(format!("{err:#}").contains("nowhere"));
}

#[test]
fn test_earlier_load_path_wins() {
    let vendor = FixtureTree::new().file("jquery.js", "vendor();\n");
    let app = FixtureTree::new()
        .file("jquery.js", "app();\n")
        .file("main.js", "//= require jquery\nmain();\n");

    let env = Environment::new(vec![vendor.path().to_path_buf(), app.path().to_path_buf()]).unwrap();
    let asset = env.find_asset("main.js").unwrap().unwrap();
    assert_eq!(asset.body, "vendor();\nmain();\n");
}

#[test]
fn test_depend_on_tracks_without_concatenating() {
    let tree = FixtureTree::sample_assets();
    let asset = find(&tree, "explore-link.js");

    assert_eq!(asset.body, "var gallery = true;\nvar explore = true;\n");
    assert_eq!(asset.dependency_paths.len(), 1);
    assert!(asset.dependency_paths[0].ends_with("gallery.css"));

    let before = asset.digest.clone();
    tree.write("gallery.css", "body { color: blue; }\n");
    let after = find(&tree, "explore-link.js");
    assert_eq!(after.body, asset.body);
    assert_ne!(after.digest, before);
}

#[test]
fn test_digest_is_stable_across_environments() {
    let tree = FixtureTree::sample_assets();
    let first = find(&tree, "application.js");
    let second = find(&tree, "application.js");

    assert_eq!(first.digest, second.digest);
    assert_eq!(first.digest_path(), format!("application-{}.js", first.digest));
}

#[test]
fn test_logical_paths_collapse_index_files() {
    let tree = FixtureTree::sample_assets();
    let entries = environment(&tree).logical_paths().unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.logical_path.as_str()).collect();

    assert!(names.contains(&"coffee.js"));
    assert!(names.contains(&"mobile/c.css"));
    assert_eq!(names.iter().filter(|n| **n == "coffee.js").count(), 1);
    let coffee = entries.iter().find(|e| e.logical_path == "coffee.js").unwrap();
    assert!(coffee.path.ends_with("coffee.js"));
    assert!(names.windows(2).all(|pair| pair[0] <= pair[1]));
}

//! Fixture-driven transform tests
//!
//! Each directory under `tests/fixtures/<group>/<case>` holds a `source.json`
//! document, the `spec.json` transform specification and the expected
//! `target.json`. Targets are compared as parsed JSON values.

use reshape_core::{Error, Transformer, TransformerConfig};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

fn load_json(path: &Path) -> Value {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("cannot read fixture {}: {e}", path.display()));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("invalid JSON in {}: {e}", path.display()))
}

struct Fixture {
    source: Value,
    spec: Value,
    target: Value,
}

fn load_fixture(case: &str) -> Fixture {
    let dir = fixtures_root().join(case);
    Fixture {
        source: load_json(&dir.join("source.json")),
        spec: load_json(&dir.join("spec.json")),
        target: load_json(&dir.join("target.json")),
    }
}

fn run_fixture(transformer: &Transformer, case: &str) {
    let fixture = load_fixture(case);
    let actual = transformer
        .transform(&fixture.source, &fixture.spec)
        .unwrap_or_else(|e| panic!("fixture '{case}' failed: {e}"));
    assert_eq!(
        actual,
        fixture.target,
        "fixture '{case}' produced:\n{}",
        serde_json::to_string_pretty(&actual).unwrap()
    );
}

#[test]
fn test_nested_object() {
    run_fixture(&Transformer::default(), "objects/nested_object");
}

#[test]
fn test_nested_array_of_objects() {
    run_fixture(&Transformer::default(), "arrays/nested_array_of_objects");
}

#[test]
fn test_array_merge() {
    run_fixture(&Transformer::default(), "arrays/array_merge");
}

#[test]
fn test_json_path() {
    run_fixture(&Transformer::default(), "paths/json_path");
}

#[test]
fn test_functions_and_constraints() {
    run_fixture(&Transformer::default(), "expressions/functions");
}

#[test]
fn test_lua_plugins() {
    let config =
        TransformerConfig::default().with_plugin_folder(fixtures_root().join("plugins/bundles"));
    run_fixture(&Transformer::new(config), "plugins/catalog");
}

#[test]
fn test_transformer_is_reusable_across_fixtures() {
    let transformer = Transformer::default();
    for case in ["objects/nested_object", "paths/json_path", "objects/nested_object"] {
        run_fixture(&transformer, case);
    }
}

#[test]
fn test_output_key_order_follows_spec() {
    let fixture = load_fixture("paths/json_path");
    let actual = Transformer::default()
        .transform(&fixture.source, &fixture.spec)
        .unwrap();
    let keys: Vec<&str> = actual.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["first", "byAuthor", "missing", "shop", "renamed"]);
}

#[test]
fn test_strict_paths_reject_fixture_with_dangling_path() {
    // `store|books|9|title` applies `title` to a missing element
    let fixture = load_fixture("paths/json_path");
    let transformer = Transformer::new(TransformerConfig::default().with_fail_on_unresolved_path(true));
    let err = transformer.transform(&fixture.source, &fixture.spec).unwrap_err();

    match &err {
        Error::Transform { field, .. } => assert_eq!(field, "missing"),
        other => panic!("expected a located error, got {other:?}"),
    }
    assert!(matches!(err.cause(), Error::PathResolution { .. }));
}

#[test]
fn test_plugin_constraint_violation() {
    let fixture = load_fixture("plugins/catalog");
    let mut spec = fixture.spec.clone();
    spec["products"]["$structure"][0]["name"]["$constraints"][0]["$max_len"]["max"] = 5.into();

    let config =
        TransformerConfig::default().with_plugin_folder(fixtures_root().join("plugins/bundles"));
    let err = Transformer::new(config)
        .transform(&fixture.source, &spec)
        .unwrap_err();
    assert!(matches!(
        err.cause(),
        Error::ConstraintViolation { field, constraint } if field == "name" && constraint == "max_len"
    ));
}

#[test]
fn test_plugins_unavailable_without_bundles() {
    // the default plugin folder holds no bundles for these names
    let fixture = load_fixture("plugins/catalog");
    let dir = tempfile::tempdir().unwrap();
    let transformer = Transformer::new(TransformerConfig::default().with_plugin_folder(dir.path()));
    let err = transformer.transform(&fixture.source, &fixture.spec).unwrap_err();
    assert!(matches!(err.cause(), Error::PluginLoad { .. }));
}

//! Manifest and layout checks: all workspace crates use
//! `version.workspace = true`, the workspace version matches the compiled
//! package version, no dependency is declared twice, and every library
//! source file carries a module doc.

use std::path::Path;

fn workspace_root() -> &'static Path {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
}

fn manifest(path: &Path) -> toml::Value {
    let content = std::fs::read_to_string(path.join("Cargo.toml")).unwrap();
    content.parse().unwrap()
}

#[test]
fn all_crates_use_workspace_version() {
    let root = manifest(workspace_root());
    let members = root["workspace"]["members"].as_array().unwrap();
    assert!(!members.is_empty());

    for member in members {
        let member = member.as_str().unwrap();
        let doc = manifest(&workspace_root().join(member));
        let inherits = doc["package"]["version"]
            .as_table()
            .and_then(|t| t.get("workspace"))
            .and_then(|v| v.as_bool());
        assert_eq!(
            inherits,
            Some(true),
            "{} should use version.workspace = true",
            member
        );
    }
}

#[test]
fn workspace_version_matches_cargo_pkg() {
    let root = manifest(workspace_root());
    let ws_version = root["workspace"]["package"]["version"].as_str().unwrap();
    assert_eq!(ws_version, env!("CARGO_PKG_VERSION"));
}

#[test]
fn no_crate_repeats_a_dependency_as_dev_dependency() {
    let root = manifest(workspace_root());
    for member in root["workspace"]["members"].as_array().unwrap() {
        let member = member.as_str().unwrap();
        let doc = manifest(&workspace_root().join(member));
        let (Some(deps), Some(dev)) = (
            doc.get("dependencies").and_then(|d| d.as_table()),
            doc.get("dev-dependencies").and_then(|d| d.as_table()),
        ) else {
            continue;
        };
        for name in dev.keys() {
            assert!(
                !deps.contains_key(name),
                "{} lists {} in both [dependencies] and [dev-dependencies]",
                member,
                name
            );
        }
    }
}

#[test]
fn every_source_file_has_module_docs() {
    let src = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
    for entry in std::fs::read_dir(&src).unwrap() {
        let path = entry.unwrap().path();
        if path.extension().and_then(|e| e.to_str()) != Some("rs") {
            continue;
        }
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(
            content.starts_with("//!"),
            "{} should open with a //! module doc",
            path.display()
        );
    }
}

use super::config::{ProjectConfig, load_config, load_project_config, parse_project_config, resolve_project_path};
use std::fs;
use std::path::PathBuf;

#[test]
fn test_parses_a_full_project_file() {
    let config = parse_project_config(
        r#"{
            "sources": ["src/main.kite"],
            "classpath": ["lib"],
            "outDir": "build",
            "moduleName": "app",
            "repl": { "embedded": true, "prompt": "> " }
        }"#,
    )
    .expect("project parses");
    assert_eq!(config.sources, vec![PathBuf::from("src/main.kite")]);
    assert_eq!(config.classpath, vec![PathBuf::from("lib")]);
    assert_eq!(config.out_dir, Some(PathBuf::from("build")));
    assert_eq!(config.module_name.as_deref(), Some("app"));
    assert_eq!(config.repl.embedded, Some(true));
    assert_eq!(config.repl.prompt.as_deref(), Some("> "));
}

#[test]
fn test_empty_object_is_the_default() {
    assert_eq!(parse_project_config("{}").expect("parses"), ProjectConfig::default());
}

#[test]
fn test_boolean_strings() {
    for (text, expected) in [("\"true\"", true), ("\"YES\"", true), ("\"1\"", true), ("\"off\"", false), ("false", false)] {
        let config = parse_project_config(&format!(r#"{{ "repl": {{ "embedded": {text} }} }}"#))
            .unwrap_or_else(|error| panic!("{text} should parse: {error:#}"));
        assert_eq!(config.repl.embedded, Some(expected), "{text}");
    }

    let error = parse_project_config(r#"{ "repl": { "embedded": "maybe" } }"#).expect_err("rejected");
    assert!(format!("{error:#}").contains("invalid boolean value: 'maybe'"), "{error:#}");
}

#[test]
fn test_unknown_fields_are_rejected() {
    assert!(parse_project_config(r#"{ "sourcez": [] }"#).is_err());
}

#[test]
fn test_relative_paths_follow_the_project_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("kite.json");
    fs::write(&path, r#"{ "sources": ["a.kite", "/abs/b.kite"], "classpath": ["lib"], "outDir": "out" }"#)
        .expect("write project");

    let config = load_project_config(&path).expect("project loads");
    assert_eq!(config.sources, vec![dir.path().join("a.kite"), PathBuf::from("/abs/b.kite")]);
    assert_eq!(config.classpath, vec![dir.path().join("lib")]);
    assert_eq!(config.out_dir, Some(dir.path().join("out")));
}

#[test]
fn test_project_discovery() {
    let dir = tempfile::tempdir().expect("temp dir");
    assert_eq!(resolve_project_path(dir.path(), None).expect("no project is fine"), None);
    assert_eq!(load_config(dir.path(), None).expect("defaults"), ProjectConfig::default());

    let error = resolve_project_path(dir.path(), Some("missing.json".as_ref())).expect_err("missing file");
    assert!(error.to_string().contains("project file not found"), "{error}");

    let path = dir.path().join("kite.json");
    fs::write(&path, r#"{ "moduleName": "found" }"#).expect("write project");
    assert_eq!(resolve_project_path(dir.path(), None).expect("found"), Some(path.clone()));
    assert_eq!(resolve_project_path(dir.path(), Some(dir.path())).expect("directory"), Some(path));
    assert_eq!(load_config(dir.path(), None).expect("loads").module_name.as_deref(), Some("found"));
}

#[test]
fn test_broken_project_files_name_the_path() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("kite.json");
    fs::write(&path, "{ not json").expect("write project");
    let error = load_project_config(&path).expect_err("invalid JSON");
    assert!(error.to_string().contains(&path.display().to_string()), "{error}");
}

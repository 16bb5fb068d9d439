//! Unit tests for CLI commands

use crate::cli::{execute, Cli, Commands};
use clap::Parser;
use std::io::Write;

fn table_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn run(args: &[&str]) -> anyhow::Result<String> {
    let cli = Cli::try_parse_from(args)?;
    let mut out = Vec::new();
    execute(&cli, &mut out)?;
    Ok(String::from_utf8(out).unwrap())
}

const ROUTES: &str = r#"
routes:
  - { method: GET, path: /users/:id, handler: get_user }
  - { method: POST, path: /users/:id, handler: update_user }
  - { method: GET, path: /docs/, handler: docs }
"#;

#[test]
fn test_match_command_defaults_to_get() {
    let cli = Cli::try_parse_from(["brrtrie", "match", "--routes", "r.yaml", "/users/1"]).unwrap();
    match cli.command {
        Commands::Match {
            routes,
            method,
            path,
            json,
        } => {
            assert_eq!(routes.to_string_lossy(), "r.yaml");
            assert_eq!(method, "GET");
            assert_eq!(path, "/users/1");
            assert!(!json);
        }
        _ => panic!("Expected Match command"),
    }
}

#[test]
fn test_all_commands_parse() {
    for cmd in ["check", "dump", "watch"] {
        let cli = Cli::try_parse_from(["brrtrie", cmd, "--routes", "r.yaml"]);
        assert!(cli.is_ok(), "{cmd} should parse");
    }
    assert!(Cli::try_parse_from(["brrtrie", "match", "--routes", "r.yaml"]).is_err());
}

#[test]
fn test_check_reports_count() {
    let file = table_file(ROUTES);
    let path = file.path().to_str().unwrap();
    let out = run(&["brrtrie", "check", "--routes", path]).unwrap();
    assert!(out.starts_with("ok: 3 routes"), "{out}");
}

#[test]
fn test_match_outputs() {
    let file = table_file(ROUTES);
    let path = file.path().to_str().unwrap();

    let out = run(&["brrtrie", "match", "--routes", path, "/users/42"]).unwrap();
    assert!(out.contains("-> get_user (/users/:id)"), "{out}");
    assert!(out.contains("id = 42"), "{out}");

    let out = run(&["brrtrie", "match", "--routes", path, "-m", "delete", "/users/42"]).unwrap();
    assert!(out.contains("method not allowed (allow: GET, POST)"), "{out}");

    let out = run(&["brrtrie", "match", "--routes", path, "/docs"]).unwrap();
    assert!(out.contains("not found"), "{out}");
    assert!(out.contains("redirect: /docs/"), "{out}");
}

#[test]
fn test_match_json() {
    let file = table_file(ROUTES);
    let path = file.path().to_str().unwrap();
    let out = run(&["brrtrie", "match", "--routes", path, "/Users/7", "--json"]).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(doc["matched"], false);
    assert_eq!(doc["redirect"], "/users/7");
    assert!(doc["handler"].is_null());
}

#[test]
fn test_check_fails_on_conflict() {
    let file = table_file(
        "routes:\n  - { method: GET, path: /a/:x, handler: one }\n  - { method: GET, path: '/a/*rest', handler: two }\n",
    );
    let path = file.path().to_str().unwrap();
    let err = run(&["brrtrie", "check", "--routes", path]).unwrap_err();
    assert!(format!("{err:#}").contains("route #1"), "{err:#}");
}

#[test]
fn test_dump_lists_routes_and_tree() {
    let file = table_file(ROUTES);
    let path = file.path().to_str().unwrap();
    let out = run(&["brrtrie", "dump", "--routes", path]).unwrap();
    assert!(out.contains("[routes] count=3"));
    assert!(out.contains("[route] POST /users/:id"));
    assert!(out.contains("[tree]"));
    assert!(out.contains(":id"));
}

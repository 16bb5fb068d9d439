use brrtrie::table::{RouteTable, TableFormat};
use brrtrie::RouteError;
use http::Method;

mod common;
use common::temp_files::{create_temp_table, create_temp_yaml};

const PET_STORE_YAML: &str = r#"
router:
  redirect_trailing_slash: false
routes:
  - { method: GET, path: /pets, handler: list_pets }
  - { method: POST, path: /pets, handler: add_pet }
  - { method: GET, path: "/pets/{id:[0-9]+}", handler: get_pet }
  - { method: delete, path: "/pets/{id:[0-9]+}", handler: delete_pet }
  - { method: ANY, path: /assets/*file, handler: assets }
"#;

const PET_STORE_TOML: &str = r#"
[router]
slow_match_threshold_us = 250

[[routes]]
method = "GET"
path = "/pets"
handler = "list_pets"

[[routes]]
method = "GET"
path = "/pets/:id"
handler = "get_pet"
"#;

const PET_STORE_JSON: &str = r#"{
  "routes": [
    { "method": "GET", "path": "/pets/:id/photo.png", "handler": "photo" },
    { "method": "PUT", "path": "/pets/:id/photo.png", "handler": "upload" }
  ]
}"#;

#[test]
fn test_load_yaml_table() {
    let file = create_temp_yaml(PET_STORE_YAML);
    let table = RouteTable::load(&file.path).unwrap();
    assert_eq!(table.routes.len(), 5);
    assert!(!table.router.redirect_trailing_slash);

    let cache = table.build_cache().unwrap();
    assert_eq!(cache.len(), 5);
    assert!(!cache.config().redirect_trailing_slash);

    let m = cache.match_route(&Method::GET, "/pets/12");
    assert_eq!(m.handler().map(String::as_str), Some("get_pet"));
    assert_eq!(m.get_path_param("id"), Some("12"));

    let m = cache.match_route(&Method::DELETE, "/pets/12");
    assert_eq!(m.handler().map(String::as_str), Some("delete_pet"));
    assert!(!cache.match_route(&Method::GET, "/pets/rex").is_match());

    let m = cache.match_route(&Method::TRACE, "/assets/css/site.css");
    assert_eq!(m.get_path_param("file"), Some("css/site.css"));
}

#[test]
fn test_load_yaml_table_with_incompatible_wildcards_fails() {
    let file = create_temp_yaml(
        r#"
routes:
  - { method: GET, path: "/pets/{id:[0-9]+}", handler: get_pet }
  - { method: DELETE, path: /pets/:id, handler: delete_pet }
"#,
    );
    let table = RouteTable::load(&file.path).unwrap();
    let err = table.build_cache().unwrap_err();
    let route_err = err.downcast_ref::<RouteError>().unwrap();
    assert!(matches!(route_err, RouteError::PatternConflict { .. }));
    assert!(format!("{err:#}").contains("route #1"), "{err:#}");
}

#[test]
fn test_load_toml_table() {
    let file = create_temp_table(PET_STORE_TOML, "toml");
    let table = RouteTable::load(&file.path).unwrap();
    assert_eq!(table.router.slow_match_threshold_us, 250);
    assert!(table.router.redirect_fixed_path);

    let cache = table.build_cache().unwrap();
    let m = cache.match_route(&Method::GET, "/pets/rex");
    assert_eq!(m.handler().map(String::as_str), Some("get_pet"));
}

#[test]
fn test_load_json_table() {
    let file = create_temp_table(PET_STORE_JSON, "json");
    let cache = RouteTable::load(&file.path).unwrap().build_cache().unwrap();

    let m = cache.match_route(&Method::PUT, "/pets/rex/photo.png");
    assert_eq!(m.handler().map(String::as_str), Some("upload"));
    assert_eq!(m.get_path_param("id"), Some("rex"));

    let m = cache.match_route(&Method::POST, "/pets/rex/photo.png");
    assert!(m.method_not_allowed);
    assert_eq!(m.allowed, vec![Method::GET, Method::PUT]);
}

#[test]
fn test_unknown_extension_is_rejected() {
    let file = create_temp_table(PET_STORE_YAML, "txt");
    let err = RouteTable::load(&file.path).unwrap_err();
    assert!(err.to_string().contains("unsupported route table extension"), "{err}");
}

#[test]
fn test_missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = RouteTable::load(dir.path().join("absent.yaml")).unwrap_err();
    assert!(err.to_string().contains("failed to read route table"), "{err}");
}

#[test]
fn test_format_from_extension() {
    use std::path::Path;
    assert_eq!(TableFormat::from_path(Path::new("a.YML")).unwrap(), TableFormat::Yaml);
    assert_eq!(TableFormat::from_path(Path::new("a.toml")).unwrap(), TableFormat::Toml);
    assert_eq!(TableFormat::from_path(Path::new("a.json")).unwrap(), TableFormat::Json);
    assert!(TableFormat::from_path(Path::new("routes")).is_err());
}

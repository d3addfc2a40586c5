use dbdrift::dsl::{DefinitionLoader, DefinitionValidator};
use dbdrift::{assign_object_id_tags, DbDriftError};
use std::fs;
use std::path::Path;

fn fixtures_path() -> &'static Path {
    Path::new("tests/fixtures")
}

#[test]
fn test_load_definitions_dir() {
    let loader = DefinitionLoader::new();
    let definitions = loader.load_dir(fixtures_path().join("definitions")).unwrap();

    assert_eq!(definitions.len(), 6);
    assert_eq!(definitions.resource_types(), vec!["database", "role", "schema", "table"]);

    let ids: Vec<String> = definitions.definitions().map(|d| d.node_id()).collect();
    assert_eq!(
        ids,
        vec![
            "database::analytics",
            "role::loader",
            "role::analyst",
            "schema::raw",
            "schema::marts",
            "table::orders",
        ]
    );
}

#[test]
fn test_load_definition_details() {
    let loader = DefinitionLoader::new();
    let definitions = loader.load_dir(fixtures_path().join("definitions")).unwrap();

    let marts = definitions.get("schema::marts").unwrap();
    assert_eq!(marts.dependency_ids(), vec!["database::analytics", "role::analyst"]);
    assert_eq!(marts.object_id_tag(), Some("f0b3e9d8-marts"));
    assert!(marts.file_name().ends_with("schema.yml"));

    let orders = definitions.get("table::orders").unwrap();
    assert!(orders.has_key("wait_time"));
    assert_eq!(definitions.of_type("role").count(), 2);
}

#[test]
fn test_fixture_definitions_are_valid() {
    let loader = DefinitionLoader::new();
    let definitions = loader.load_dir(fixtures_path().join("definitions")).unwrap();

    let result = DefinitionValidator::validate(&definitions);
    assert!(result.is_valid(), "{:?}", result.errors);
    assert!(!result.has_warnings(), "{:?}", result.warnings);
}

#[test]
fn test_validate_reports_cycle() {
    let loader = DefinitionLoader::new();
    let definitions = loader.load_dir(fixtures_path().join("invalid/cycle")).unwrap();

    let result = DefinitionValidator::validate(&definitions);
    let cycle: Vec<&str> = result
        .errors
        .iter()
        .filter(|e| e.code == "E005")
        .map(|e| e.resource.as_str())
        .collect();
    assert_eq!(cycle, vec!["A::a", "B::b"]);
}

#[test]
fn test_validate_reports_missing_depends_on() {
    let loader = DefinitionLoader::new();
    let definitions = loader.load_dir(fixtures_path().join("invalid/missing_depends_on")).unwrap();

    let result = DefinitionValidator::validate(&definitions);
    assert!(!result.is_valid());
    assert_eq!(result.errors[0].code, "E001");
    assert_eq!(result.errors[0].resource, "database::analytics");
}

#[test]
fn test_missing_directory() {
    let loader = DefinitionLoader::new();
    let result = loader.load_dir(fixtures_path().join("does_not_exist"));
    assert!(matches!(result, Err(DbDriftError::YamlFileNotFound(_))));
}

#[test]
fn test_fixture_tags_are_already_assigned() {
    let loader = DefinitionLoader::new();
    let definitions = loader.load_dir(fixtures_path().join("definitions")).unwrap();

    let assignment = assign_object_id_tags(&definitions).unwrap();
    assert!(assignment.is_unchanged());
}

#[test]
fn test_tag_write_back() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("role.yml"),
        "role:\n  - name: loader\n    object_id_tag:\n    depends_on:\n  - name: analyst\n    object_id_tag: keep-me\n    depends_on:\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("database.yml"),
        "database:\n  - name: analytics\n    object_id_tag: ''\n    depends_on:\n      role: [loader]\n",
    )
    .unwrap();

    let loader = DefinitionLoader::new();
    let definitions = loader.load_dir(dir.path()).unwrap();
    let assignment = assign_object_id_tags(&definitions).unwrap();
    assert_eq!(assignment.edits.len(), 2);

    let written = loader.apply_tag_edits(&assignment.edits).unwrap();
    assert_eq!(written.len(), 2);

    let reloaded = loader.load_dir(dir.path()).unwrap();
    assert_eq!(reloaded, assignment.definitions);
    assert_eq!(reloaded.get("role::analyst").unwrap().object_id_tag(), Some("keep-me"));
    assert!(assign_object_id_tags(&reloaded).unwrap().is_unchanged());
}

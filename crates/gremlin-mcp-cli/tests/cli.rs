use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const PEOPLE: &str = r#"{
    "vertices": [
        {"id": 1, "label": "person", "properties": {"status": "active", "age": 31}},
        {"id": 2, "label": "person", "properties": {"status": "inactive", "age": 42}},
        {"id": 3, "label": "person", "properties": {"status": "active", "age": 27}},
        {"id": 4, "label": "company", "properties": {"name": "acme"}}
    ],
    "edges": [
        {"label": "worksAt", "from": 1, "to": 4},
        {"label": "worksAt", "from": 2, "to": 4},
        {"label": "worksAt", "from": 3, "to": 4}
    ]
}"#;

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

/// The binary with a private config directory and no inherited graph settings.
fn gremlin_mcp(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("gremlin-mcp").unwrap();
    cmd.env("XDG_CONFIG_HOME", home)
        .env("HOME", home)
        .env_remove("RUST_LOG")
        .env_remove("LOG_LEVEL")
        .env_remove("GREMLIN_ENDPOINT")
        .env_remove("GREMLIN_ENUM_PROPERTY_BLACKLIST")
        .env_remove("GREMLIN_SCHEMA_BATCH_SIZE");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    gremlin_mcp(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("schema"))
        .stdout(predicate::str::contains("serve"));
}

#[test]
fn test_schema_text_from_graph_file() {
    let dir = TempDir::new().unwrap();
    let graph = write(&dir, "people.json", PEOPLE);

    gremlin_mcp(dir.path())
        .arg("schema")
        .arg("--graph-file")
        .arg(&graph)
        .assert()
        .success()
        .stdout(predicate::str::contains("person (3)"))
        .stdout(predicate::str::contains("(person)-[worksAt]->(company)"))
        .stdout(predicate::str::contains("status: string enum[\"active\", \"inactive\"]"));
}

#[test]
fn test_schema_json_from_graph_file() {
    let dir = TempDir::new().unwrap();
    let graph = write(&dir, "people.json", PEOPLE);

    let output = gremlin_mcp(dir.path())
        .args(["schema", "--json", "--graph-file"])
        .arg(&graph)
        .output()
        .unwrap();
    assert!(output.status.success());

    let schema: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(schema["metadata"]["node_count"], 2);
    assert_eq!(
        schema["relationship_patterns"],
        serde_json::json!([{"left_node": "person", "right_node": "company", "relation": "worksAt"}])
    );
}

#[test]
fn test_schema_flags_reach_the_engine() {
    let dir = TempDir::new().unwrap();
    let graph = write(&dir, "people.json", PEOPLE);

    gremlin_mcp(dir.path())
        .args(["schema", "--enum-blacklist", "status", "--graph-file"])
        .arg(&graph)
        .assert()
        .success()
        .stdout(predicate::str::contains("status: unknown"));
}

#[test]
fn test_status_from_graph_file() {
    let dir = TempDir::new().unwrap();
    let graph = write(&dir, "people.json", PEOPLE);

    gremlin_mcp(dir.path())
        .arg("status")
        .arg("--graph-file")
        .arg(&graph)
        .assert()
        .success()
        .stdout(predicate::str::contains("Vertices:      4"))
        .stdout(predicate::str::contains("Edges:         3"));
}

#[test]
fn test_status_unreachable_server_fails() {
    let dir = TempDir::new().unwrap();
    gremlin_mcp(dir.path())
        .args(["status", "--endpoint", "127.0.0.1:1"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Connected:     no"));
}

#[test]
fn test_import_validate_only() {
    let dir = TempDir::new().unwrap();
    let graph = write(&dir, "empty.json", "{}");
    let csv = write(&dir, "people.csv", "id,label,name\n1,person,ann\n2,person,bob\n");

    gremlin_mcp(dir.path())
        .arg("import")
        .arg(&csv)
        .arg("--validate-only")
        .arg("--graph-file")
        .arg(&graph)
        .assert()
        .success()
        .stdout(predicate::str::contains("Valid: 2 vertices, 0 edges in 1 batches"));
}

#[test]
fn test_import_rejects_bad_csv() {
    let dir = TempDir::new().unwrap();
    let graph = write(&dir, "empty.json", "{}");
    let csv = write(&dir, "bad.csv", "id,name\n1,ann\n");

    gremlin_mcp(dir.path())
        .arg("import")
        .arg(&csv)
        .arg("--graph-file")
        .arg(&graph)
        .assert()
        .failure()
        .stderr(predicate::str::contains("label"));
}

#[test]
fn test_raw_query_needs_a_server() {
    let dir = TempDir::new().unwrap();
    let graph = write(&dir, "people.json", PEOPLE);

    gremlin_mcp(dir.path())
        .args(["query", "g.V().count()", "--graph-file"])
        .arg(&graph)
        .assert()
        .failure()
        .stderr(predicate::str::contains("in-memory graph"));
}

#[test]
fn test_config_init_show_and_force() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("gremlin.toml");

    gremlin_mcp(dir.path())
        .arg("config")
        .arg("init")
        .arg("--config")
        .arg(&config)
        .assert()
        .success();
    assert!(config.exists());

    gremlin_mcp(dir.path())
        .arg("config")
        .arg("init")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    gremlin_mcp(dir.path())
        .args(["config", "show", "--endpoint", "db:8182", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("endpoint = \"db:8182\""))
        .stdout(predicate::str::contains("[schema]"));
}

#[test]
fn test_config_path_uses_config_dir() {
    let dir = TempDir::new().unwrap();
    gremlin_mcp(dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gremlin-mcp"))
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_completions() {
    let dir = TempDir::new().unwrap();
    gremlin_mcp(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gremlin-mcp"));
}

//! Integration tests for configuration and backend selection via CLI.

mod common;

use common::TestEnv;
use predicates::prelude::*;

#[test]
fn test_config_show_defaults() {
    let env = TestEnv::new();

    let config = env.json(&["config", "show"]);
    assert_eq!(config["backend"]["value"], "sqlite");
    assert_eq!(config["backend"]["source"], "default");
    assert_eq!(config["output_format"]["value"], "json");
    assert_eq!(config["log_level"]["value"], "warn");
    assert_eq!(config["data_dir"]["source"], "env:TF_DATA_DIR");
    assert_eq!(
        config["data_dir"]["value"],
        env.data_path().display().to_string()
    );
}

#[test]
fn test_config_show_from_file_and_cli() {
    let env = TestEnv::new();
    env.write_config("backend \"memory\"\nlog-level \"info\"\n");

    let config = env.json(&["config", "show"]);
    assert_eq!(config["backend"]["value"], "memory");
    assert!(config["backend"]["source"].as_str().unwrap().starts_with("file:"));
    assert_eq!(config["log_level"]["value"], "info");

    let config = env.json(&["config", "show", "--backend", "sqlite", "--data-dir", "/tmp/elsewhere"]);
    assert_eq!(config["backend"]["value"], "sqlite");
    assert_eq!(config["backend"]["source"], "cli");
    assert_eq!(config["data_dir"]["value"], "/tmp/elsewhere");
}

#[test]
fn test_config_output_format_human() {
    let env = TestEnv::new();
    env.write_config("output-format \"human\"\n");

    env.tf()
        .args(["task", "create", "Readable", "-P", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#1 Readable (To Do)"));
}

#[test]
fn test_config_invalid_file() {
    let env = TestEnv::new();
    env.write_config("backend \"postgres\"\n");

    env.tf()
        .args(["task", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown backend: postgres"));
}

#[test]
fn test_unknown_backend_flag() {
    let env = TestEnv::new();

    env.tf()
        .args(["task", "list", "--backend", "redis"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown backend: redis"));
}

#[test]
fn test_memory_backend_does_not_persist() {
    let env = TestEnv::new();

    env.tf()
        .args(["task", "create", "Ephemeral", "-P", "1", "--backend", "memory"])
        .assert()
        .success();

    assert_eq!(env.json(&["task", "list", "--backend", "memory"])["count"], 0);
    assert!(!env.data_path().join("tasks.db").exists());
}

#[test]
fn test_memory_backend_seeded_from_fixture() {
    let env = TestEnv::new();
    let seed = env.config_dir.path().join("tasks.json");
    std::fs::write(
        &seed,
        r#"[
            {"Id": 1, "name": "Legacy", "project_id": {"Id": 3}, "completed": true},
            {"Id": 4, "title": "Follow-up", "project_id": 3, "blocked_by": "1", "status": "In Progress"}
        ]"#,
    )
    .unwrap();
    env.write_config("backend \"memory\"\nseed-file \"tasks.json\"\n");

    let list = env.json(&["task", "list", "--project", "3"]);
    assert_eq!(list["count"], 2);
    assert_eq!(list["tasks"][0]["title"], "Legacy");
    assert_eq!(list["tasks"][0]["status"], "Done");
    assert_eq!(list["tasks"][1]["blocked_by"], serde_json::json!([1]));

    // New ids continue after the seeded high-water mark
    let task = env.json(&["task", "create", "Next", "-P", "3"]);
    assert_eq!(task["id"], 5);

    assert_eq!(env.json(&["blocked", "--unsatisfied"])["count"], 0);
}

#[test]
fn test_memory_seed_with_stale_links_and_bad_records() {
    let env = TestEnv::new();
    let seed = env.config_dir.path().join("tasks.json");
    std::fs::write(
        &seed,
        r#"[
            {"id": 3, "title": "Waits on a deleted task", "project_id": 1, "blocked_by": "5"},
            {"id": 4, "title": "No project"}
        ]"#,
    )
    .unwrap();
    env.write_config("backend \"memory\"\nseed-file \"tasks.json\"\n");

    let list = env.json(&["task", "list"]);
    assert_eq!(list["count"], 1);
    assert_eq!(list["tasks"][0]["id"], 3);

    // Id 5 is still referenced by task 3, so it is never handed out
    let task = env.json(&["task", "create", "Next", "-P", "1"]);
    assert_eq!(task["id"], 6);
}

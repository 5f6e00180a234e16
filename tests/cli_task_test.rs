//! Integration tests for task commands via CLI.
//!
//! These tests verify that task commands work correctly through the CLI:
//! - `tf task create/subtask/show/list/update/status/toggle/delete` all work
//! - State persists across invocations in the SQLite database
//! - JSON and human-readable output formats are correct
//! - Rejected writes report errors and leave the collection unchanged

mod common;

use common::TestEnv;
use predicates::prelude::*;

// === Create ===

#[test]
fn test_task_create_json() {
    let env = TestEnv::new();

    env.tf()
        .args(["task", "create", "My first task", "-P", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"id\":1"))
        .stdout(predicate::str::contains("\"title\":\"My first task\""))
        .stdout(predicate::str::contains("\"status\":\"To Do\""))
        .stdout(predicate::str::contains("\"completed\":false"));
}

#[test]
fn test_task_create_human() {
    let env = TestEnv::new();

    env.tf()
        .args(["task", "create", "Write report", "-P", "1", "-p", "high", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#1 Write report (To Do) !High"));
}

#[test]
fn test_task_create_persists_in_data_dir() {
    let env = TestEnv::new();
    env.create("A", &[]);
    env.create("B", &[]);

    assert!(env.data_path().join("tasks.db").exists());
    let list = env.json(&["task", "list"]);
    assert_eq!(list["count"], 2);
    assert_eq!(list["tasks"][1]["title"], "B");
}

#[test]
fn test_task_create_done_status() {
    let env = TestEnv::new();
    let task = env.json(&["task", "create", "Shipped", "-P", "1", "--status", "done"]);

    assert_eq!(task["completed"], true);
    assert_eq!(task["status_history"].as_array().unwrap().len(), 1);
}

#[test]
fn test_task_create_invalid_dependency() {
    let env = TestEnv::new();
    env.create("A", &[]);

    env.tf()
        .args(["task", "create", "B", "-P", "1", "--blocked-by", "9999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid dependency id(s): 9999"));

    assert_eq!(env.json(&["task", "list"])["count"], 1);
}

#[test]
fn test_task_create_invalid_priority() {
    let env = TestEnv::new();

    env.tf()
        .args(["task", "create", "A", "-P", "1", "-p", "urgent"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"error\""))
        .stderr(predicate::str::contains("Invalid priority: urgent"));
}

#[test]
fn test_error_human_format() {
    let env = TestEnv::new();

    env.tf()
        .args(["task", "show", "42", "-H"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("Error: Task not found: 42"));
}

// === Subtasks ===

#[test]
fn test_subtask_inherits_project() {
    let env = TestEnv::new();
    let parent = env.json(&["task", "create", "Parent", "-P", "7"]);
    let parent_id = parent["id"].as_u64().unwrap().to_string();

    let sub = env.json(&["task", "subtask", &parent_id, "Child"]);
    assert_eq!(sub["project_id"], 7);
    assert_eq!(sub["parent_id"], 1);

    let subs = env.json(&["task", "list", "--parent", &parent_id]);
    assert_eq!(subs["count"], 1);
    let mains = env.json(&["task", "list", "--main"]);
    assert_eq!(mains["count"], 1);
}

#[test]
fn test_subtask_missing_parent() {
    let env = TestEnv::new();

    env.tf()
        .args(["task", "subtask", "5", "Orphan"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Task not found: 5"));
}

#[test]
fn test_task_create_missing_parent() {
    let env = TestEnv::new();

    env.tf()
        .args(["task", "create", "Orphan", "-P", "1", "--parent", "42"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid parent id: 42"));

    assert_eq!(env.json(&["task", "list"])["count"], 0);
}

// === Show ===

#[test]
fn test_task_show_details() {
    let env = TestEnv::new();
    let a = env.create("A", &[]);
    let b = env.create("B", &["--blocked-by", &a.to_string()]);

    let shown = env.json(&["task", "show", &b.to_string()]);
    assert_eq!(shown["blocked_by"], serde_json::json!([a]));
    assert_eq!(shown["is_blocked"], true);
    assert_eq!(shown["has_unsatisfied_dependencies"], true);
    assert_eq!(shown["depth"], 0);

    env.tf()
        .args(["task", "show", &a.to_string(), "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Blocks: #2"))
        .stdout(predicate::str::contains("History:"));
}

// === Update ===

#[test]
fn test_task_update_fields() {
    let env = TestEnv::new();
    let id = env.create("Draft", &[]).to_string();

    let task = env.json(&[
        "task",
        "update",
        &id,
        "--title",
        "Final",
        "--priority",
        "critical",
        "--due",
        "2026-12-24",
    ]);
    assert_eq!(task["title"], "Final");
    assert_eq!(task["priority"], "Critical");
    assert!(task["due_date"].as_str().unwrap().starts_with("2026-12-24"));
    assert_eq!(task["status_history"].as_array().unwrap().len(), 1);

    let task = env.json(&["task", "update", &id, "--clear-due"]);
    assert!(task.get("due_date").is_none());
}

#[test]
fn test_task_update_status_appends_only_on_change() {
    let env = TestEnv::new();
    let id = env.create("A", &[]).to_string();

    let task = env.json(&["task", "update", &id, "--status", "review"]);
    assert_eq!(task["status_history"].as_array().unwrap().len(), 2);

    let task = env.json(&["task", "update", &id, "--status", "review"]);
    assert_eq!(task["status_history"].as_array().unwrap().len(), 2);
}

#[test]
fn test_task_update_completed_flag_folds_into_status() {
    let env = TestEnv::new();
    let id = env.create("A", &[]).to_string();

    let task = env.json(&["task", "update", &id, "--completed", "true"]);
    assert_eq!(task["status"], "Done");
    assert_eq!(task["completed"], true);
}

#[test]
fn test_task_update_cycle_rejected() {
    let env = TestEnv::new();
    let a = env.create("A", &[]).to_string();
    env.create("B", &["--blocked-by", &a]);

    env.tf()
        .args(["task", "update", &a, "--blocked-by", "2", "--title", "Changed"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("circular dependency detected"));

    let shown = env.json(&["task", "show", &a]);
    assert_eq!(shown["title"], "A");
    assert!(shown.get("blocked_by").is_none());
}

#[test]
fn test_task_update_nothing_to_change() {
    let env = TestEnv::new();
    let id = env.create("A", &[]).to_string();

    env.tf()
        .args(["task", "update", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No fields to update"));
}

#[test]
fn test_task_update_parent_cycle_rejected() {
    let env = TestEnv::new();
    let a = env.create("A", &[]).to_string();
    let sub = env.json(&["task", "subtask", &a, "Sub"]);
    let sub_id = sub["id"].as_u64().unwrap().to_string();

    env.tf()
        .args(["task", "update", &a, "--parent", &sub_id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("circular hierarchy detected"));
}

// === Status and toggle ===

#[test]
fn test_task_status_always_records_history() {
    let env = TestEnv::new();
    let id = env.create("A", &[]).to_string();

    let task = env.json(&["task", "status", &id, "done"]);
    assert_eq!(task["completed"], true);
    assert_eq!(task["status_history"].as_array().unwrap().len(), 2);

    let task = env.json(&["task", "status", &id, "Done"]);
    assert_eq!(task["status_history"].as_array().unwrap().len(), 3);
}

#[test]
fn test_task_status_invalid() {
    let env = TestEnv::new();
    let id = env.create("A", &[]).to_string();

    env.tf()
        .args(["task", "status", &id, "blocked"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid status: blocked"));
}

#[test]
fn test_task_toggle_twice() {
    let env = TestEnv::new();
    let id = env.create("A", &[]).to_string();
    env.json(&["task", "status", &id, "in_progress"]);

    let task = env.json(&["task", "toggle", &id]);
    assert_eq!(task["status"], "Done");

    let task = env.json(&["task", "toggle", &id]);
    assert_eq!(task["status"], "To Do");
    assert_eq!(task["completed"], false);
    assert_eq!(task["status_history"].as_array().unwrap().len(), 4);
}

#[test]
fn test_task_advance_walks_the_board() {
    let env = TestEnv::new();
    let id = env.create("A", &[]).to_string();

    let statuses: Vec<String> = (0..4)
        .map(|_| env.json(&["task", "advance", &id])["status"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(statuses, vec!["In Progress", "Review", "Done", "To Do"]);

    let task = env.json(&["task", "show", &id]);
    assert_eq!(task["completed"], false);
    assert_eq!(task["status_history"].as_array().unwrap().len(), 5);
}

// === Delete ===

#[test]
fn test_task_delete_does_not_cascade_or_reuse_ids() {
    let env = TestEnv::new();
    let a = env.create("A", &[]).to_string();
    env.json(&["task", "subtask", &a, "Sub"]);
    env.create("B", &["--blocked-by", &a]);

    env.tf()
        .args(["task", "delete", &a])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"deleted\":true"));

    let list = env.json(&["task", "list"]);
    assert_eq!(list["count"], 2);
    assert_eq!(list["tasks"][0]["parent_id"], 1);
    assert_eq!(list["tasks"][1]["blocked_by"], serde_json::json!([1]));

    // Id 1 is gone for good
    assert_eq!(env.create("C", &[]), 4);

    env.tf()
        .args(["task", "delete", &a])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Task not found: 1"));
}

// === Depth and candidates ===

#[test]
fn test_task_depth() {
    let env = TestEnv::new();
    let a = env.create("A", &[]).to_string();
    let sub = env.json(&["task", "subtask", &a, "Sub"])["id"].as_u64().unwrap();
    let leaf = env.json(&["task", "subtask", &sub.to_string(), "Leaf"])["id"]
        .as_u64()
        .unwrap();

    let depth = env.json(&["task", "depth", &leaf.to_string()]);
    assert_eq!(depth["depth"], 2);

    env.tf()
        .args(["task", "depth", "99"])
        .assert()
        .failure();
}

#[test]
fn test_task_candidates() {
    let env = TestEnv::new();
    let a = env.create("A", &[]).to_string();
    env.json(&["task", "subtask", &a, "Sub"]);
    env.create("B", &[]);

    let candidates = env.json(&["task", "candidates", &a]);
    assert_eq!(candidates["count"], 1);
    assert_eq!(candidates["tasks"][0]["title"], "B");

    let all = env.json(&["task", "candidates"]);
    assert_eq!(all["count"], 3);
}

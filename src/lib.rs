//! Taskflow - a task dependency graph and status workflow engine.
//!
//! This library provides the core of a project/task tracker:
//! - [`storage::TaskStore`] owns the task collection and is the only writer
//! - [`models::graph`] validates `blocked_by` links and answers hierarchy queries
//! - [`models::workflow`] keeps `status`, `completed` and the status history consistent
//!
//! Persistence is pluggable through [`storage::StorageBackend`]; the store behaves
//! identically over the in-memory and SQLite backends.

pub mod cli;
pub mod commands;
pub mod config;
pub mod models;
pub mod storage;


/// Library-level error type for taskflow operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Task not found: {0}")]
    NotFound(u64),

    #[error("invalid dependency id(s): {}", join_ids(.0))]
    InvalidReference(Vec<u64>),

    #[error("invalid parent id: {0}")]
    InvalidParent(u64),

    #[error("circular dependency detected: task {task_id} cannot be blocked by task {dependency}")]
    CircularDependency { task_id: u64, dependency: u64 },

    #[error("circular hierarchy detected: task {parent_id} cannot be the parent of task {task_id}")]
    CircularHierarchy { task_id: u64, parent_id: u64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Config error: {0}")]
    Config(String),
}

fn join_ids(ids: &[u64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for taskflow operations.
pub type Result<T> = std::result::Result<T, Error>;

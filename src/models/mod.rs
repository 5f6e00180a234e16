//! Data models for taskflow.
//!
//! This module defines the core data structures:
//! - `Task` - The single entity: a work item with status, priority, hierarchy and dependencies
//! - `TaskStatus` - The four workflow states
//! - `StatusChange` - One entry of a task's append-only status history
//! - `NewTask` / `TaskPatch` - Inputs for creating and partially updating tasks
//!
//! The rules that operate on these types live in [`graph`] (dependencies and
//! hierarchy) and [`workflow`] (status transitions).

pub mod graph;
pub mod workflow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Task status in the workflow.
///
/// Serialized with the display labels used by every consumer ("To Do", "In Progress",
/// "Review", "Done"); the snake_case spellings are accepted on input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "To Do", alias = "todo", alias = "to_do")]
    ToDo,
    #[serde(rename = "In Progress", alias = "in_progress")]
    InProgress,
    #[serde(rename = "Review", alias = "review")]
    Review,
    #[serde(rename = "Done", alias = "done")]
    Done,
}

impl TaskStatus {
    /// All statuses in workflow (board column) order.
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::ToDo,
        TaskStatus::InProgress,
        TaskStatus::Review,
        TaskStatus::Done,
    ];

    /// Display label.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::ToDo => "To Do",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Review => "Review",
            TaskStatus::Done => "Done",
        }
    }

    /// The suggested forward step used by quick-status buttons.
    ///
    /// `Done` wraps back to `To Do`. This is a suggestion only; any status may
    /// move to any other.
    pub fn next(&self) -> TaskStatus {
        match self {
            TaskStatus::ToDo => TaskStatus::InProgress,
            TaskStatus::InProgress => TaskStatus::Review,
            TaskStatus::Review => TaskStatus::Done,
            TaskStatus::Done => TaskStatus::ToDo,
        }
    }

    pub fn is_done(&self) -> bool {
        *self == TaskStatus::Done
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect();
        match normalized.as_str() {
            "todo" => Ok(TaskStatus::ToDo),
            "inprogress" => Ok(TaskStatus::InProgress),
            "review" => Ok(TaskStatus::Review),
            "done" => Ok(TaskStatus::Done),
            _ => Err(Error::InvalidInput(format!("Invalid status: {}", s))),
        }
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    #[serde(alias = "low")]
    Low,
    #[default]
    #[serde(alias = "medium")]
    Medium,
    #[serde(alias = "high")]
    High,
    #[serde(alias = "critical")]
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Critical => "Critical",
        }
    }

    /// Sort rank, most urgent first (Critical = 0).
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Critical => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            _ => Err(Error::InvalidInput(format!("Invalid priority: {}", s))),
        }
    }
}

/// One audit record in a task's status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: TaskStatus,
    pub timestamp: DateTime<Utc>,
}

impl StatusChange {
    pub fn new(status: TaskStatus, timestamp: DateTime<Utc>) -> Self {
        Self { status, timestamp }
    }
}

/// A work item tracked by taskflow.
///
/// `completed` mirrors `status == Done` and `status_history` always ends with the
/// current status; both are maintained by [`workflow`] and never set directly by
/// the store's callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned identifier, never reused
    pub id: u64,

    /// Owning project (opaque foreign key)
    pub project_id: u64,

    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub priority: Priority,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,

    /// Parent task for subtasks; `None` for main tasks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<u64>,

    /// Tasks that must be done before this one; never `Some(vec![])`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_by: Option<Vec<u64>>,

    pub status: TaskStatus,

    /// Legacy completion flag, true iff `status == Done`
    pub completed: bool,

    pub status_history: Vec<StatusChange>,

    pub last_updated: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Whether this task is a subtask (has a parent).
    pub fn is_subtask(&self) -> bool {
        self.parent_id.is_some()
    }

    /// The dependency ids as a slice (empty when there are none).
    pub fn dependencies(&self) -> &[u64] {
        self.blocked_by.as_deref().unwrap_or(&[])
    }
}

/// Input for creating a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub project_id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub parent_id: Option<u64>,
    #[serde(default)]
    pub blocked_by: Option<Vec<u64>>,
    /// Initial status; defaults to `To Do`
    #[serde(default)]
    pub status: Option<TaskStatus>,
}

impl NewTask {
    pub fn new(project_id: u64, title: impl Into<String>) -> Self {
        Self {
            project_id,
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_due_date(mut self, due: DateTime<Utc>) -> Self {
        self.due_date = Some(due);
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_blocked_by(mut self, ids: Vec<u64>) -> Self {
        self.blocked_by = Some(ids);
        self
    }

    pub fn with_parent(mut self, parent_id: u64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Partial update. A field left as `None` is untouched; for nullable fields the
/// inner `Option` distinguishes "set" from "clear".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub project_id: Option<u64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub parent_id: Option<Option<u64>>,
    pub blocked_by: Option<Option<Vec<u64>>>,
    pub status: Option<TaskStatus>,
    /// Legacy flag; folded into a status change, never stored independently
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn project(mut self, project_id: u64) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn due_date(mut self, due: Option<DateTime<Utc>>) -> Self {
        self.due_date = Some(due);
        self
    }

    pub fn parent(mut self, parent_id: Option<u64>) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn blocked_by(mut self, ids: Option<Vec<u64>>) -> Self {
        self.blocked_by = Some(ids);
        self
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    /// True if the patch touches nothing.
    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }
}

/// Normalize a dependency list: an empty list becomes `None`.
pub fn normalize_blocked_by(ids: Option<Vec<u64>>) -> Option<Vec<u64>> {
    ids.filter(|v| !v.is_empty())
}

/// Parse a user-supplied due date: RFC 3339 or a bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_due_date(s: &str) -> crate::Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| Error::InvalidInput(format!("Invalid due date: {}", s)))
}

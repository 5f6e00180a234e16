//! Raw record shape and its translation to and from [`Task`].
//!
//! Backends speak in [`Record`]s: an integer id plus fields addressed by string
//! key, the way a generic hosted record API does. The shapes found in the wild
//! are loose (lookups stored as `{"Id": n}` or a bare id, `blocked_by` as a
//! comma-separated string, the history as a JSON-encoded string), so
//! [`task_from_record`] is the single place that turns them into a canonical
//! `Task`. Nothing outside the storage module sees a `Record`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::{
    Priority, StatusChange, Task, TaskStatus, normalize_blocked_by, parse_due_date, workflow,
};
use crate::{Error, Result};

/// Field keys used in task records.
pub mod fields {
    pub const NAME: &str = "name";
    pub const PROJECT_ID: &str = "project_id";
    pub const TITLE: &str = "title";
    pub const DESCRIPTION: &str = "description";
    pub const PRIORITY: &str = "priority";
    pub const DUE_DATE: &str = "due_date";
    pub const COMPLETED: &str = "completed";
    pub const CREATED_AT: &str = "created_at";
    pub const BLOCKED_BY: &str = "blocked_by";
    pub const STATUS: &str = "status";
    pub const STATUS_HISTORY: &str = "status_history";
    pub const LAST_UPDATED: &str = "last_updated";
    pub const PARENT_ID: &str = "parent_id";
    /// System timestamps some backends maintain on their own
    pub const CREATED_ON: &str = "created_on";
    pub const MODIFIED_ON: &str = "modified_on";
}

/// A backend record: integer id plus string-keyed fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: u64,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            fields: Map::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|v| !v.is_null())
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.fields.insert(key.to_string(), value.into());
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    fn get_time(&self, key: &str) -> Option<DateTime<Utc>> {
        self.get_str(key).and_then(|s| parse_due_date(s).ok())
    }
}

/// Resolve a lookup field: a bare number, a numeric string, or an object
/// carrying `Id`/`id`.
pub fn lookup_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Object(obj) => obj.get("Id").or_else(|| obj.get("id")).and_then(lookup_id),
        _ => None,
    }
}

/// Parse a stored dependency list.
///
/// Accepts `"3, 5,7"` or `[3, 5, 7]`; pieces that are not ids are dropped and an
/// empty result becomes `None`.
pub fn parse_blocked_by(value: &Value) -> Option<Vec<u64>> {
    let ids = match value {
        Value::String(s) => s.split(',').filter_map(|p| p.trim().parse().ok()).collect(),
        Value::Array(items) => items.iter().filter_map(lookup_id).collect(),
        Value::Number(_) => lookup_id(value).into_iter().collect(),
        _ => Vec::new(),
    };
    normalize_blocked_by(Some(ids))
}

/// Parse a stored status history entry by entry.
///
/// The history may be a JSON array or a string holding one. Entries that do
/// not parse are dropped on their own; the rest keep their order.
fn parse_history(value: &Value) -> Vec<StatusChange> {
    let entries = match value {
        Value::String(s) => serde_json::from_str::<Vec<Value>>(s),
        other => serde_json::from_value::<Vec<Value>>(other.clone()),
    };
    let entries = match entries {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(error = %e, "discarding unreadable status history");
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            serde_json::from_value(entry)
                .inspect_err(|e| {
                    tracing::warn!(
                        index,
                        error = %e,
                        "dropping unreadable status history entry"
                    )
                })
                .ok()
        })
        .collect()
}

/// Translate a raw record into a canonical [`Task`].
///
/// Missing fields fall back to: empty description, `Medium` priority, a status
/// derived from `completed`, `title` from `name`, `last_updated` from
/// `modified_on`/`created_at`. The result always satisfies the workflow
/// invariants; legacy records are repaired on the way in.
pub fn task_from_record(record: &Record) -> Result<Task> {
    use fields::*;

    let project_id = record.get(PROJECT_ID).and_then(lookup_id).ok_or_else(|| {
        Error::InvalidInput(format!("record {} has no project id", record.id))
    })?;

    let title = record
        .get_str(TITLE)
        .filter(|s| !s.is_empty())
        .or_else(|| record.get_str(NAME))
        .unwrap_or_default()
        .to_string();

    let priority = record
        .get_str(PRIORITY)
        .and_then(|s| s.parse::<Priority>().ok())
        .unwrap_or_default();

    let completed = record.get(COMPLETED).and_then(Value::as_bool).unwrap_or(false);

    let status = record
        .get_str(STATUS)
        .and_then(|s| s.parse::<TaskStatus>().ok())
        .unwrap_or(if completed {
            TaskStatus::Done
        } else {
            TaskStatus::ToDo
        });

    let created_at = record
        .get_time(CREATED_AT)
        .or_else(|| record.get_time(CREATED_ON))
        .unwrap_or_else(Utc::now);

    let last_updated = record
        .get_time(LAST_UPDATED)
        .or_else(|| record.get_time(MODIFIED_ON))
        .unwrap_or(created_at);

    let mut task = Task {
        id: record.id,
        project_id,
        title,
        description: record.get_str(DESCRIPTION).unwrap_or_default().to_string(),
        priority,
        due_date: record.get_time(DUE_DATE),
        parent_id: record.get(PARENT_ID).and_then(lookup_id),
        blocked_by: record.get(BLOCKED_BY).and_then(parse_blocked_by),
        status,
        completed,
        status_history: record.get(STATUS_HISTORY).map(parse_history).unwrap_or_default(),
        last_updated,
        created_at,
    };

    if workflow::repair(&mut task, last_updated) {
        tracing::debug!(task_id = task.id, "repaired legacy workflow fields");
    }

    Ok(task)
}

/// Translate a [`Task`] into the record shape backends store.
pub fn record_from_task(task: &Task) -> Result<Record> {
    use fields::*;

    let mut record = Record::new(task.id);
    record.set(NAME, task.title.clone());
    record.set(PROJECT_ID, task.project_id);
    record.set(TITLE, task.title.clone());
    record.set(DESCRIPTION, task.description.clone());
    record.set(PRIORITY, task.priority.as_str());
    record.set(DUE_DATE, task.due_date.map(|d| d.to_rfc3339()));
    record.set(COMPLETED, task.completed);
    record.set(CREATED_AT, task.created_at.to_rfc3339());
    record.set(
        BLOCKED_BY,
        task.blocked_by.as_ref().map(|ids| {
            ids.iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(",")
        }),
    );
    record.set(STATUS, task.status.as_str());
    record.set(STATUS_HISTORY, serde_json::to_string(&task.status_history)?);
    record.set(LAST_UPDATED, task.last_updated.to_rfc3339());
    record.set(PARENT_ID, task.parent_id);
    Ok(record)
}

//! Status workflow rules.
//!
//! The four statuses form a flat state machine: any status may move to any
//! other, and `Done` can be reopened. What this module guarantees is that every
//! transition keeps three fields in lockstep:
//!
//! - `completed` is recomputed as `status == Done` (never trusted from callers)
//! - `status_history` gets `{status, timestamp}` appended per the [`HistoryPolicy`]
//! - `last_updated` is refreshed
//!
//! Whether a transition is *allowed* given open dependencies is a presentation
//! concern layered on [`super::graph::is_blocked`]; nothing here refuses a
//! transition.

use chrono::{DateTime, Utc};

use super::{StatusChange, Task, TaskStatus};

/// When a status write appends to the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryPolicy {
    /// Append only if the status actually changes (`update`)
    OnChange,
    /// Append on every call, even for an unchanged status (`update_status`, `toggle_complete`)
    Always,
}

/// Seed the workflow fields for a freshly created task.
///
/// Returns `(completed, status_history)`.
pub fn initial_state(status: TaskStatus, now: DateTime<Utc>) -> (bool, Vec<StatusChange>) {
    (status.is_done(), vec![StatusChange::new(status, now)])
}

/// Apply a status write to `task`.
///
/// Returns `true` if a history entry was appended.
pub fn transition(
    task: &mut Task,
    status: TaskStatus,
    policy: HistoryPolicy,
    now: DateTime<Utc>,
) -> bool {
    let changed = task.status != status;
    task.status = status;
    task.completed = status.is_done();
    task.last_updated = now;

    if changed || policy == HistoryPolicy::Always {
        task.status_history.push(StatusChange::new(status, now));
        true
    } else {
        false
    }
}

/// Work out which status a partial update asks for.
///
/// An explicit `status` always wins. A bare `completed` flag is folded into a
/// status: `true` means `Done`, `false` reopens a `Done` task to `To Do` and is
/// a no-op otherwise.
pub fn requested_status(
    current: TaskStatus,
    status: Option<TaskStatus>,
    completed: Option<bool>,
) -> Option<TaskStatus> {
    match (status, completed) {
        (Some(s), _) => Some(s),
        (None, Some(true)) => Some(TaskStatus::Done),
        (None, Some(false)) if current.is_done() => Some(TaskStatus::ToDo),
        _ => None,
    }
}

/// The status `toggle_complete` moves a task to.
///
/// Reopening always lands on `To Do`; the status before `Done` is not restored.
pub fn toggle_target(task: &Task) -> TaskStatus {
    if task.status.is_done() {
        TaskStatus::ToDo
    } else {
        TaskStatus::Done
    }
}

/// Check the workflow invariants on one task.
///
/// Returns a description of each violation found.
pub fn check_consistency(task: &Task) -> Vec<String> {
    let mut problems = Vec::new();

    if task.completed != task.status.is_done() {
        problems.push(format!(
            "task {}: completed={} but status is {}",
            task.id, task.completed, task.status
        ));
    }

    match task.status_history.last() {
        None => problems.push(format!("task {}: empty status history", task.id)),
        Some(last) if last.status != task.status => problems.push(format!(
            "task {}: last history entry is {} but status is {}",
            task.id, last.status, task.status
        )),
        _ => {}
    }

    if task.dependencies().contains(&task.id) {
        problems.push(format!("task {}: depends on itself", task.id));
    }

    problems
}

/// Bring a task loaded from an older record back in line with the invariants.
///
/// The status is authoritative: `completed` is recomputed from it, and a
/// missing or stale history gets one entry for the current status stamped `at`.
/// Returns `true` if anything changed.
pub fn repair(task: &mut Task, at: DateTime<Utc>) -> bool {
    let mut repaired = false;

    if task.completed != task.status.is_done() {
        task.completed = task.status.is_done();
        repaired = true;
    }

    let stale = task
        .status_history
        .last()
        .is_none_or(|last| last.status != task.status);
    if stale {
        task.status_history.push(StatusChange::new(task.status, at));
        repaired = true;
    }

    repaired
}

//! Command implementations for the taskflow CLI.
//!
//! Each command takes the [`TaskStore`] and returns a result type implementing
//! [`CommandResult`], so the binary only decides between JSON and human output.
//! Text arguments (status, priority, dates) are parsed here; parse failures are
//! `InvalidInput` errors.

use serde::Serialize;

use crate::config::ResolvedConfig;
use crate::models::graph::{BoardColumn, SubtaskProgress};
use crate::models::{NewTask, Priority, Task, TaskPatch, TaskStatus, parse_due_date};
use crate::storage::TaskStore;
use crate::{Error, Result};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait CommandResult {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!(r#"{{"error": "{}"}}"#, e))
}

fn parse_status(s: &str) -> Result<TaskStatus> {
    s.parse()
}

fn parse_priority(s: Option<&str>) -> Result<Option<Priority>> {
    s.map(str::parse).transpose()
}

fn parse_due(s: Option<&str>) -> Result<Option<chrono::DateTime<chrono::Utc>>> {
    s.map(parse_due_date).transpose()
}

fn task_line(task: &Task) -> String {
    let mut line = format!(
        "[{}] #{} {} ({})",
        if task.completed { "x" } else { " " },
        task.id,
        task.title,
        task.status
    );
    if task.priority != Priority::Medium {
        line.push_str(&format!(" !{}", task.priority));
    }
    if let Some(due) = task.due_date {
        line.push_str(&format!(" due {}", due.format("%Y-%m-%d")));
    }
    if let Some(deps) = &task.blocked_by {
        let ids: Vec<String> = deps.iter().map(|id| format!("#{}", id)).collect();
        line.push_str(&format!(" blocked by {}", ids.join(", ")));
    }
    line
}

// === Single task ===

/// A single task, returned by every mutation.
#[derive(Serialize)]
pub struct TaskOutput {
    #[serde(flatten)]
    pub task: Task,
}

impl CommandResult for TaskOutput {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let t = &self.task;
        let mut lines = vec![
            task_line(t),
            format!("  Project: {}", t.project_id),
            format!("  Priority: {}", t.priority),
        ];
        if let Some(parent) = t.parent_id {
            lines.push(format!("  Parent: #{}", parent));
        }
        if !t.description.is_empty() {
            lines.push(format!("  Description: {}", t.description));
        }
        lines.push(format!(
            "  Updated: {}",
            t.last_updated.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        lines.join("\n")
    }
}

/// Create a task.
#[allow(clippy::too_many_arguments)]
pub fn task_create(
    store: &mut TaskStore,
    title: String,
    project: u64,
    description: String,
    priority: Option<String>,
    due: Option<String>,
    status: Option<String>,
    blocked_by: Vec<u64>,
    parent: Option<u64>,
) -> Result<TaskOutput> {
    let mut new = NewTask::new(project, title).with_description(description);
    if let Some(priority) = parse_priority(priority.as_deref())? {
        new = new.with_priority(priority);
    }
    if let Some(due) = parse_due(due.as_deref())? {
        new = new.with_due_date(due);
    }
    if let Some(status) = status {
        new = new.with_status(parse_status(&status)?);
    }
    if !blocked_by.is_empty() {
        new = new.with_blocked_by(blocked_by);
    }
    if let Some(parent) = parent {
        new = new.with_parent(parent);
    }

    let task = store.create(new)?;
    Ok(TaskOutput { task })
}

/// Create a subtask under `parent`.
pub fn task_subtask(
    store: &mut TaskStore,
    parent: u64,
    title: String,
    description: String,
    priority: Option<String>,
    due: Option<String>,
    blocked_by: Vec<u64>,
) -> Result<TaskOutput> {
    // Project is overwritten with the parent's
    let mut new = NewTask::new(0, title).with_description(description);
    if let Some(priority) = parse_priority(priority.as_deref())? {
        new = new.with_priority(priority);
    }
    if let Some(due) = parse_due(due.as_deref())? {
        new = new.with_due_date(due);
    }
    if !blocked_by.is_empty() {
        new = new.with_blocked_by(blocked_by);
    }

    let task = store.create_subtask(parent, new)?;
    Ok(TaskOutput { task })
}

/// Flags from `tf task update`.
#[derive(Debug, Default)]
pub struct UpdateArgs {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub project: Option<u64>,
    pub due: Option<String>,
    pub clear_due: bool,
    pub status: Option<String>,
    pub completed: Option<bool>,
    pub blocked_by: Option<Vec<u64>>,
    pub clear_blocked_by: bool,
    pub parent: Option<u64>,
    pub clear_parent: bool,
}

impl UpdateArgs {
    fn into_patch(self) -> Result<TaskPatch> {
        let mut patch = TaskPatch::new();
        if let Some(title) = self.title {
            patch = patch.title(title);
        }
        if let Some(description) = self.description {
            patch = patch.description(description);
        }
        if let Some(priority) = parse_priority(self.priority.as_deref())? {
            patch = patch.priority(priority);
        }
        if let Some(project) = self.project {
            patch = patch.project(project);
        }
        if self.clear_due {
            patch = patch.due_date(None);
        } else if let Some(due) = parse_due(self.due.as_deref())? {
            patch = patch.due_date(Some(due));
        }
        if let Some(status) = self.status {
            patch = patch.status(parse_status(&status)?);
        }
        if let Some(completed) = self.completed {
            patch = patch.completed(completed);
        }
        if self.clear_blocked_by {
            patch = patch.blocked_by(None);
        } else if let Some(ids) = self.blocked_by {
            patch = patch.blocked_by(Some(ids));
        }
        if self.clear_parent {
            patch = patch.parent(None);
        } else if let Some(parent) = self.parent {
            patch = patch.parent(Some(parent));
        }
        Ok(patch)
    }
}

/// Apply a partial update.
pub fn task_update(store: &mut TaskStore, id: u64, args: UpdateArgs) -> Result<TaskOutput> {
    let patch = args.into_patch()?;
    if patch.is_empty() {
        return Err(Error::InvalidInput(
            "No fields to update. Pass at least one option.".to_string(),
        ));
    }
    let task = store.update(id, patch)?;
    Ok(TaskOutput { task })
}

/// Set a task's status.
pub fn task_status(store: &mut TaskStore, id: u64, status: &str) -> Result<TaskOutput> {
    let task = store.update_status(id, parse_status(status)?)?;
    Ok(TaskOutput { task })
}

/// Move a task to the next board column.
pub fn task_advance(store: &mut TaskStore, id: u64) -> Result<TaskOutput> {
    let task = store.advance_status(id)?;
    Ok(TaskOutput { task })
}

/// Flip a task between `Done` and `To Do`.
pub fn task_toggle(store: &mut TaskStore, id: u64) -> Result<TaskOutput> {
    let task = store.toggle_complete(id)?;
    Ok(TaskOutput { task })
}

// === Show ===

/// A task plus its derived graph facts.
#[derive(Serialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,
    pub depth: usize,
    pub subtasks: SubtaskProgress,
    pub dependents: Vec<u64>,
    pub is_blocked: bool,
    pub has_unsatisfied_dependencies: bool,
}

impl CommandResult for TaskDetail {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut out = TaskOutput {
            task: self.task.clone(),
        }
        .to_human();
        if self.subtasks.total > 0 {
            out.push_str(&format!(
                "\n  Subtasks: {}/{} done",
                self.subtasks.completed, self.subtasks.total
            ));
        }
        if self.has_unsatisfied_dependencies {
            out.push_str("\n  Waiting on unfinished dependencies");
        }
        if !self.dependents.is_empty() {
            let ids: Vec<String> = self.dependents.iter().map(|id| format!("#{}", id)).collect();
            out.push_str(&format!("\n  Blocks: {}", ids.join(", ")));
        }
        out.push_str("\n  History:");
        for change in &self.task.status_history {
            out.push_str(&format!(
                "\n    {} {}",
                change.timestamp.format("%Y-%m-%d %H:%M:%S"),
                change.status
            ));
        }
        out
    }
}

/// Show a task.
pub fn task_show(store: &TaskStore, id: u64) -> Result<TaskDetail> {
    let task = store.get_by_id(id)?.clone();
    Ok(TaskDetail {
        depth: store.task_depth(id)?,
        subtasks: store.subtask_progress(id),
        dependents: store.dependents(id),
        is_blocked: store.is_blocked(id)?,
        has_unsatisfied_dependencies: store.has_unsatisfied_dependencies(id)?,
        task,
    })
}

// === Lists ===

/// A list of tasks.
#[derive(Serialize)]
pub struct TaskList {
    pub tasks: Vec<Task>,
    pub count: usize,
}

impl TaskList {
    fn new<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let tasks: Vec<Task> = tasks.into_iter().cloned().collect();
        Self {
            count: tasks.len(),
            tasks,
        }
    }
}

impl CommandResult for TaskList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.tasks.is_empty() {
            return "No tasks found.".to_string();
        }
        let mut lines = vec![format!("{} task(s):", self.count)];
        lines.extend(self.tasks.iter().map(|t| format!("  {}", task_line(t))));
        lines.join("\n")
    }
}

/// List tasks, optionally filtered.
pub fn task_list(
    store: &TaskStore,
    project: Option<u64>,
    status: Option<String>,
    parent: Option<u64>,
    main_only: bool,
) -> Result<TaskList> {
    let status = status.as_deref().map(parse_status).transpose()?;
    let tasks = store
        .get_all()
        .iter()
        .filter(|t| project.is_none_or(|p| t.project_id == p))
        .filter(|t| status.is_none_or(|s| t.status == s))
        .filter(|t| parent.is_none_or(|p| t.parent_id == Some(p)))
        .filter(|t| !main_only || !t.is_subtask());
    Ok(TaskList::new(tasks))
}

/// Tasks a dependency picker may offer for `id` (or for a new task).
pub fn task_candidates(store: &TaskStore, id: Option<u64>) -> Result<TaskList> {
    Ok(TaskList::new(store.dependency_candidates(id)?))
}

/// Tasks with dependency links, or only those still waiting on one.
pub fn blocked(store: &TaskStore, unsatisfied: bool) -> Result<TaskList> {
    let mut tasks = Vec::new();
    for task in store.get_all() {
        let include = if unsatisfied {
            store.has_unsatisfied_dependencies(task.id)?
        } else {
            store.is_blocked(task.id)?
        };
        if include {
            tasks.push(task);
        }
    }
    Ok(TaskList::new(tasks))
}

// === Small results ===

/// Result of a delete.
#[derive(Serialize)]
pub struct TaskDeleted {
    pub id: u64,
    pub deleted: bool,
}

impl CommandResult for TaskDeleted {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("Deleted task #{}", self.id)
    }
}

/// Hard-delete a task.
pub fn task_delete(store: &mut TaskStore, id: u64) -> Result<TaskDeleted> {
    store.delete(id)?;
    Ok(TaskDeleted { id, deleted: true })
}

/// Depth of a task in the hierarchy.
#[derive(Serialize)]
pub struct TaskDepth {
    pub id: u64,
    pub depth: usize,
}

impl CommandResult for TaskDepth {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("Task #{} is at depth {}", self.id, self.depth)
    }
}

/// Parent hops from `id` to its root.
pub fn task_depth(store: &TaskStore, id: u64) -> Result<TaskDepth> {
    Ok(TaskDepth {
        id,
        depth: store.task_depth(id)?,
    })
}

/// Subtask completion for one parent.
#[derive(Serialize)]
pub struct Progress {
    pub parent_id: u64,
    pub total: usize,
    pub completed: usize,
    pub ratio: f64,
}

impl CommandResult for Progress {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.total == 0 {
            return format!("Task #{} has no subtasks", self.parent_id);
        }
        format!(
            "Task #{}: {}/{} subtasks done ({:.0}%)",
            self.parent_id,
            self.completed,
            self.total,
            self.ratio * 100.0
        )
    }
}

/// Subtask counts for `parent`.
pub fn progress(store: &TaskStore, parent: u64) -> Result<Progress> {
    store.get_by_id(parent)?;
    let p = store.subtask_progress(parent);
    Ok(Progress {
        parent_id: parent,
        total: p.total,
        completed: p.completed,
        ratio: p.ratio(),
    })
}

/// Kanban board.
#[derive(Serialize)]
pub struct Board {
    pub columns: Vec<BoardColumn>,
}

impl CommandResult for Board {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        for column in &self.columns {
            lines.push(format!("{} ({})", column.status, column.tasks.len()));
            lines.extend(column.tasks.iter().map(|t| format!("  {}", task_line(t))));
        }
        lines.join("\n")
    }
}

/// Build the board for one project or all.
pub fn board(store: &TaskStore, project: Option<u64>) -> Result<Board> {
    Ok(Board {
        columns: store.board(project),
    })
}

/// Outcome of a dependency check. Only produced when the list is acceptable.
#[derive(Serialize)]
pub struct DepsCheck {
    pub id: u64,
    pub blocked_by: Vec<u64>,
    pub valid: bool,
}

impl CommandResult for DepsCheck {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let ids: Vec<String> = self.blocked_by.iter().map(|id| format!("#{}", id)).collect();
        format!("Task #{} can be blocked by {}", self.id, ids.join(", "))
    }
}

/// Validate a proposed dependency list without saving it.
pub fn deps_check(store: &TaskStore, id: u64, blocked_by: Vec<u64>) -> Result<DepsCheck> {
    store.check_dependencies(id, &blocked_by)?;
    Ok(DepsCheck {
        id,
        blocked_by,
        valid: true,
    })
}

/// Resolved configuration with sources.
#[derive(Serialize)]
pub struct ConfigShow {
    #[serde(flatten)]
    pub config: ResolvedConfig,
}

impl CommandResult for ConfigShow {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let c = &self.config;
        let mut lines = Vec::new();
        if let Some(path) = &c.config_path {
            lines.push(format!("config file: {}", path.display()));
        }
        lines.push(format!("backend: {} ({})", c.backend.value, c.backend.source));
        lines.push(format!(
            "data-dir: {} ({})",
            c.data_dir.value.display(),
            c.data_dir.source
        ));
        if let Some(seed) = &c.seed_file {
            lines.push(format!("seed-file: {} ({})", seed.value.display(), seed.source));
        }
        lines.push(format!(
            "output-format: {} ({})",
            c.output_format.value, c.output_format.source
        ));
        lines.push(format!("log-level: {} ({})", c.log_level.value, c.log_level.source));
        lines.join("\n")
    }
}

/// Show the resolved configuration.
pub fn config_show(config: &ResolvedConfig) -> ConfigShow {
    ConfigShow {
        config: config.clone(),
    }
}

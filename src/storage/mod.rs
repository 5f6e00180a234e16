//! Storage layer for taskflow data.
//!
//! [`TaskStore`] owns the canonical task collection. It assigns ids, maintains
//! timestamps and is the only place tasks are written. Every write is
//! validate-then-commit: dependency and hierarchy rules from
//! [`crate::models::graph`] run against the committed collection, the workflow
//! fields are computed by [`crate::models::workflow`], and only then is the
//! record handed to the backend. A rejected write leaves both the backend and
//! the in-memory collection untouched.
//!
//! ## Storage Backends
//!
//! - **SQLite backend** (default): `~/.local/share/taskflow/tasks.db`
//! - **Memory backend**: process-local records, optionally seeded from a fixture
//!
//! Deletes never cascade. Removing a task leaves any `blocked_by` entries and
//! `parent_id`s that point at it in place.

pub mod backend;
pub mod memory;
pub mod record;
pub mod sqlite;

pub use backend::{BackendType, StorageBackend};
pub use memory::MemoryBackend;
pub use record::Record;
pub use sqlite::SqliteBackend;

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

use crate::models::graph::{self, BoardColumn, SubtaskProgress};
use crate::models::workflow::{self, HistoryPolicy};
use crate::models::{NewTask, Task, TaskPatch, TaskStatus, normalize_blocked_by};
use crate::{Error, Result};
use record::{record_from_task, task_from_record};

/// Collection name tasks are stored under.
pub const TASK_COLLECTION: &str = "tasks";

/// File name of the SQLite database inside the data directory.
pub const DATABASE_FILE: &str = "tasks.db";

/// Task collection manager over a single backend.
pub struct TaskStore {
    backend: Box<dyn StorageBackend>,
    tasks: Vec<Task>,
    /// Highest id ever assigned, deleted ones included
    last_id: u64,
}

impl TaskStore {
    /// Open a store over `backend`, loading and normalizing every task record.
    pub fn open(backend: Box<dyn StorageBackend>) -> Result<Self> {
        let mut store = Self {
            backend,
            tasks: Vec::new(),
            last_id: 0,
        };
        store.reload()?;
        Ok(store)
    }

    /// Re-read the collection from the backend.
    ///
    /// Records that cannot be turned into a task are skipped with a warning.
    /// Their ids, and every id named by a `blocked_by` or `parent_id`, still
    /// count towards the id high-water mark so a new task never picks up a
    /// stale link.
    pub fn reload(&mut self) -> Result<()> {
        let records = self.backend.fetch_records(TASK_COLLECTION)?;
        let tasks: Vec<Task> = records
            .iter()
            .filter_map(|record| {
                task_from_record(record)
                    .inspect_err(|e| {
                        tracing::warn!(
                            record_id = record.id,
                            error = %e,
                            "skipping unreadable task record"
                        )
                    })
                    .ok()
            })
            .collect();

        let max_record = records.iter().map(|r| r.id).max().unwrap_or(0);
        let max_referenced = tasks
            .iter()
            .flat_map(|t| t.dependencies().iter().copied().chain(t.parent_id))
            .max()
            .unwrap_or(0);
        let high_water = self.backend.high_water_mark(TASK_COLLECTION)?;
        self.last_id = self
            .last_id
            .max(high_water)
            .max(max_record)
            .max(max_referenced);
        self.tasks = tasks;

        tracing::debug!(
            count = self.tasks.len(),
            last_id = self.last_id,
            backend = %self.backend.backend_type(),
            "loaded task collection"
        );
        Ok(())
    }

    /// Get the backend type.
    pub fn backend_type(&self) -> BackendType {
        self.backend.backend_type()
    }

    /// Get the storage location description.
    pub fn location(&self) -> String {
        self.backend.location()
    }

    // === Queries ===

    /// All tasks, in insertion order.
    pub fn get_all(&self) -> &[Task] {
        &self.tasks
    }

    /// Get a task by id.
    pub fn get_by_id(&self, id: u64) -> Result<&Task> {
        self.tasks
            .iter()
            .find(|t| t.id == id)
            .ok_or(Error::NotFound(id))
    }

    /// Main tasks and subtasks belonging to a project.
    pub fn get_by_project_id(&self, project_id: u64) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.project_id == project_id)
            .collect()
    }

    /// Direct subtasks of a task.
    pub fn get_subtasks(&self, parent_id: u64) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.parent_id == Some(parent_id))
            .collect()
    }

    /// Tasks without a parent.
    pub fn get_main_tasks(&self) -> Vec<&Task> {
        self.tasks.iter().filter(|t| !t.is_subtask()).collect()
    }

    /// Direct subtask counts for `parent_id`.
    pub fn subtask_progress(&self, parent_id: u64) -> SubtaskProgress {
        graph::subtask_aggregate(parent_id, &self.tasks)
    }

    /// Parent hops from `id` to its root.
    pub fn task_depth(&self, id: u64) -> Result<usize> {
        graph::task_depth(id, &self.tasks)
    }

    /// Whether a task has any dependency links. See [`graph::is_blocked`].
    pub fn is_blocked(&self, id: u64) -> Result<bool> {
        Ok(graph::is_blocked(self.get_by_id(id)?))
    }

    /// Whether a task waits on a dependency that is not done yet.
    pub fn has_unsatisfied_dependencies(&self, id: u64) -> Result<bool> {
        Ok(graph::has_unsatisfied_dependencies(
            self.get_by_id(id)?,
            &self.tasks,
        ))
    }

    /// Tasks whose `blocked_by` lists `id`.
    pub fn dependents(&self, id: u64) -> Vec<u64> {
        graph::dependents(id, &self.tasks)
    }

    /// Dependency picker choices for an existing task, or for a new one when `id` is `None`.
    pub fn dependency_candidates(&self, id: Option<u64>) -> Result<Vec<&Task>> {
        let task = id.map(|id| self.get_by_id(id)).transpose()?;
        Ok(graph::dependency_candidates(task, &self.tasks))
    }

    /// Kanban columns for one project, or all projects.
    pub fn board(&self, project_id: Option<u64>) -> Vec<BoardColumn> {
        graph::board(&self.tasks, project_id)
    }

    /// Check a proposed dependency list for `id` without writing anything.
    pub fn check_dependencies(&self, id: u64, blocked_by: &[u64]) -> Result<()> {
        self.get_by_id(id)?;
        graph::validate_dependencies(id, blocked_by, &self.tasks)
    }

    // === Mutations ===

    /// Create a task.
    ///
    /// Assigns the next id, stamps `created_at`/`last_updated`, defaults the
    /// status to `To Do` and seeds the history. `blocked_by` and `parent_id` are
    /// validated first; on failure nothing is created.
    pub fn create(&mut self, new: NewTask) -> Result<Task> {
        let id = self.last_id + 1;
        let now = Utc::now();
        let blocked_by = normalize_blocked_by(new.blocked_by);

        if let Some(deps) = &blocked_by {
            graph::validate_dependencies(id, deps, &self.tasks)
                .inspect_err(|e| tracing::warn!(error = %e, "rejected task creation"))?;
        }
        if let Some(parent_id) = new.parent_id {
            graph::validate_parent(id, parent_id, &self.tasks)
                .inspect_err(|e| tracing::warn!(error = %e, "rejected task creation"))?;
        }

        let status = new.status.unwrap_or_default();
        let (completed, status_history) = workflow::initial_state(status, now);
        let task = Task {
            id,
            project_id: new.project_id,
            title: new.title,
            description: new.description,
            priority: new.priority,
            due_date: new.due_date,
            parent_id: new.parent_id,
            blocked_by,
            status,
            completed,
            status_history,
            last_updated: now,
            created_at: now,
        };

        self.backend
            .create_record(TASK_COLLECTION, &record_from_task(&task)?)?;
        self.last_id = id;
        self.tasks.push(task.clone());

        tracing::info!(task_id = id, project_id = task.project_id, "created task");
        Ok(task)
    }

    /// Create a subtask under `parent_id`.
    ///
    /// The project is always inherited from the parent; any `project_id` in
    /// `new` is ignored.
    pub fn create_subtask(&mut self, parent_id: u64, mut new: NewTask) -> Result<Task> {
        let parent = self.get_by_id(parent_id)?;
        new.project_id = parent.project_id;
        new.parent_id = Some(parent_id);
        self.create(new)
    }

    /// Apply a partial update.
    ///
    /// Fields present in `patch` overwrite stored values. A status change (or a
    /// bare `completed` flag, folded into one) appends history only if the
    /// status actually changes. `blocked_by` and `parent_id` are revalidated;
    /// a failure aborts the whole update.
    pub fn update(&mut self, id: u64, patch: TaskPatch) -> Result<Task> {
        let mut task = self.get_by_id(id)?.clone();
        let now = Utc::now();

        if let Some(blocked_by) = patch.blocked_by {
            let blocked_by = normalize_blocked_by(blocked_by);
            if let Some(deps) = &blocked_by {
                graph::validate_dependencies(id, deps, &self.tasks).inspect_err(
                    |e| tracing::warn!(task_id = id, error = %e, "rejected dependency update"),
                )?;
            }
            task.blocked_by = blocked_by;
        }

        if let Some(parent_id) = patch.parent_id {
            if let Some(parent) = parent_id {
                graph::validate_parent(id, parent, &self.tasks).inspect_err(
                    |e| tracing::warn!(task_id = id, error = %e, "rejected parent update"),
                )?;
            }
            task.parent_id = parent_id;
        }

        if let Some(project_id) = patch.project_id {
            task.project_id = project_id;
        }
        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = description;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            task.due_date = due_date;
        }

        task.last_updated = now;
        if let Some(status) = workflow::requested_status(task.status, patch.status, patch.completed)
        {
            workflow::transition(&mut task, status, HistoryPolicy::OnChange, now);
        }

        self.commit(task)
    }

    /// Set a task's status, always appending a history entry.
    ///
    /// Unlike [`TaskStore::update`], an unchanged status still records an entry.
    pub fn update_status(&mut self, id: u64, status: TaskStatus) -> Result<Task> {
        self.apply_status(id, status)
    }

    /// Move a task one step along the board: `To Do` to `In Progress` to
    /// `Review` to `Done`, and `Done` back to `To Do`.
    pub fn advance_status(&mut self, id: u64) -> Result<Task> {
        let target = self.get_by_id(id)?.status.next();
        self.apply_status(id, target)
    }

    /// Flip between `Done` and `To Do`.
    ///
    /// Any status other than `Done` goes to `Done`; `Done` always reopens to
    /// `To Do`.
    pub fn toggle_complete(&mut self, id: u64) -> Result<Task> {
        let target = workflow::toggle_target(self.get_by_id(id)?);
        self.apply_status(id, target)
    }

    /// Rename a task.
    pub fn quick_update_title(&mut self, id: u64, title: impl Into<String>) -> Result<Task> {
        self.update(id, TaskPatch::new().title(title))
    }

    /// Set or clear a task's due date.
    pub fn quick_update_due_date(
        &mut self,
        id: u64,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Task> {
        self.update(id, TaskPatch::new().due_date(due_date))
    }

    /// Hard-delete a task.
    ///
    /// Subtasks and dependents keep their now-dangling references.
    pub fn delete(&mut self, id: u64) -> Result<()> {
        self.get_by_id(id)?;

        if !self.backend.delete_record(TASK_COLLECTION, id)? {
            return Err(Error::NotFound(id));
        }
        self.tasks.retain(|t| t.id != id);

        tracing::info!(
            task_id = id,
            dangling_dependents = self.dependents(id).len(),
            orphaned_subtasks = self.get_subtasks(id).len(),
            "deleted task"
        );
        Ok(())
    }

    fn apply_status(&mut self, id: u64, status: TaskStatus) -> Result<Task> {
        let mut task = self.get_by_id(id)?.clone();
        workflow::transition(&mut task, status, HistoryPolicy::Always, Utc::now());
        self.commit(task)
    }

    /// Persist an updated task, then replace the cached copy.
    fn commit(&mut self, task: Task) -> Result<Task> {
        self.backend
            .update_record(TASK_COLLECTION, &record_from_task(&task)?)?;
        if let Some(slot) = self.tasks.iter_mut().find(|t| t.id == task.id) {
            *slot = task.clone();
        }

        tracing::info!(task_id = task.id, status = %task.status, "updated task");
        Ok(task)
    }
}

/// Default data directory: `~/.local/share/taskflow` (platform equivalent).
pub fn default_data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|d| d.join("taskflow"))
        .ok_or_else(|| Error::Config("Could not determine data directory".to_string()))
}

/// Path of the SQLite database inside a data directory.
pub fn database_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DATABASE_FILE)
}

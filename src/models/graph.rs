//! Dependency and hierarchy rules over the task collection.
//!
//! Two relations live on [`Task`]:
//! - `blocked_by`: directed edges `task -> dependency`, which must stay acyclic
//! - `parent_id`: the subtask hierarchy (one level deep in practice)
//!
//! Everything here is a pure function over a slice of tasks. The store calls the
//! `validate_*` functions before committing a write; the remaining functions are
//! read-side queries used for rendering.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::{Task, TaskStatus};
use crate::{Error, Result};

/// Validate a proposed `blocked_by` list for `task_id`.
///
/// `tasks` is the committed collection; `task_id` may be an id that has not been
/// committed yet (a task being created). The proposed list replaces whatever
/// edges `task_id` currently has.
///
/// Fails with:
/// - [`Error::InvalidReference`] if any listed id does not exist
/// - [`Error::CircularDependency`] if the list contains `task_id` itself or if
///   `task_id` is reachable from any listed id
pub fn validate_dependencies(task_id: u64, blocked_by: &[u64], tasks: &[Task]) -> Result<()> {
    let known: HashSet<u64> = tasks.iter().map(|t| t.id).collect();

    let mut missing: Vec<u64> = Vec::new();
    for id in blocked_by {
        if !known.contains(id) && !missing.contains(id) {
            missing.push(*id);
        }
    }
    if !missing.is_empty() {
        return Err(Error::InvalidReference(missing));
    }

    if blocked_by.contains(&task_id) {
        return Err(Error::CircularDependency {
            task_id,
            dependency: task_id,
        });
    }

    let edges = edge_map(tasks);
    for &dependency in blocked_by {
        if reaches(dependency, task_id, &edges) {
            return Err(Error::CircularDependency {
                task_id,
                dependency,
            });
        }
    }

    Ok(())
}

/// Validate assigning `parent_id` as the parent of `task_id`.
///
/// The parent must exist and must not be `task_id` or one of its descendants.
pub fn validate_parent(task_id: u64, parent_id: u64, tasks: &[Task]) -> Result<()> {
    if !tasks.iter().any(|t| t.id == parent_id) {
        return Err(Error::InvalidParent(parent_id));
    }

    let parents: HashMap<u64, Option<u64>> = tasks.iter().map(|t| (t.id, t.parent_id)).collect();
    let mut visited = HashSet::new();
    let mut current = Some(parent_id);

    while let Some(id) = current {
        if id == task_id {
            return Err(Error::CircularHierarchy { task_id, parent_id });
        }
        if !visited.insert(id) {
            break;
        }
        current = parents.get(&id).copied().flatten();
    }

    Ok(())
}

/// Whether a task counts as blocked.
///
/// A task is blocked as soon as it has any `blocked_by` entry, whether or not the
/// referenced tasks are already done. Quick-status controls are disabled on this
/// basis. See [`has_unsatisfied_dependencies`] for the stricter check.
pub fn is_blocked(task: &Task) -> bool {
    !task.dependencies().is_empty()
}

/// Whether any existing dependency of `task` is not yet `Done`.
///
/// Dangling ids (dependencies that have since been deleted) are ignored.
pub fn has_unsatisfied_dependencies(task: &Task, tasks: &[Task]) -> bool {
    let status: HashMap<u64, TaskStatus> = tasks.iter().map(|t| (t.id, t.status)).collect();
    task.dependencies()
        .iter()
        .filter_map(|id| status.get(id))
        .any(|s| !s.is_done())
}

/// Direct subtask counts for one parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SubtaskProgress {
    pub total: usize,
    pub completed: usize,
}

impl SubtaskProgress {
    /// Fraction done in `0.0..=1.0`; `0.0` with no subtasks.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// Count the direct subtasks of `parent_id` and how many are done.
///
/// Only one level is counted; subtasks of subtasks are not included.
pub fn subtask_aggregate(parent_id: u64, tasks: &[Task]) -> SubtaskProgress {
    tasks
        .iter()
        .filter(|t| t.parent_id == Some(parent_id))
        .fold(SubtaskProgress::default(), |mut acc, t| {
            acc.total += 1;
            if t.status.is_done() {
                acc.completed += 1;
            }
            acc
        })
}

/// Number of `parent_id` hops from `task_id` to a root.
///
/// Main tasks have depth 0. The walk stops at a missing parent (counting the hop
/// to it) and at any repeated id, so a corrupted parent chain cannot loop.
pub fn task_depth(task_id: u64, tasks: &[Task]) -> Result<usize> {
    let parents: HashMap<u64, Option<u64>> = tasks.iter().map(|t| (t.id, t.parent_id)).collect();
    let mut current = *parents.get(&task_id).ok_or(Error::NotFound(task_id))?;

    let mut visited = HashSet::from([task_id]);
    let mut depth = 0;

    while let Some(parent) = current {
        depth += 1;
        if !visited.insert(parent) {
            tracing::warn!(task_id, parent, "parent cycle detected while computing depth");
            break;
        }
        current = match parents.get(&parent) {
            Some(next) => *next,
            None => break,
        };
    }

    Ok(depth)
}

/// Ids of tasks that list `task_id` in their `blocked_by`.
pub fn dependents(task_id: u64, tasks: &[Task]) -> Vec<u64> {
    tasks
        .iter()
        .filter(|t| t.dependencies().contains(&task_id))
        .map(|t| t.id)
        .collect()
}

/// Tasks a form may offer as dependency choices for `task`.
///
/// Excludes the task itself, its direct subtasks and its parent. Pass `None` when
/// the task does not exist yet; every task is then a candidate. This is a picker
/// filter only; the store does not enforce it.
pub fn dependency_candidates<'a>(task: Option<&Task>, tasks: &'a [Task]) -> Vec<&'a Task> {
    let Some(task) = task else {
        return tasks.iter().collect();
    };

    tasks
        .iter()
        .filter(|t| t.id != task.id)
        .filter(|t| t.parent_id != Some(task.id))
        .filter(|t| Some(t.id) != task.parent_id)
        .collect()
}

/// One kanban column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardColumn {
    pub status: TaskStatus,
    pub tasks: Vec<Task>,
}

/// Group main tasks into the four status columns.
///
/// Subtasks are left off the board. Within a column tasks are ordered
/// incomplete first, then by priority (Critical first), then due date (undated
/// last), then id.
pub fn board(tasks: &[Task], project_id: Option<u64>) -> Vec<BoardColumn> {
    TaskStatus::ALL
        .iter()
        .map(|&status| {
            let mut column: Vec<Task> = tasks
                .iter()
                .filter(|t| !t.is_subtask())
                .filter(|t| project_id.is_none_or(|p| t.project_id == p))
                .filter(|t| t.status == status)
                .cloned()
                .collect();
            column.sort_by(|a, b| {
                a.completed
                    .cmp(&b.completed)
                    .then(a.priority.rank().cmp(&b.priority.rank()))
                    .then_with(|| match (a.due_date, b.due_date) {
                        (Some(x), Some(y)) => x.cmp(&y),
                        (Some(_), None) => std::cmp::Ordering::Less,
                        (None, Some(_)) => std::cmp::Ordering::Greater,
                        (None, None) => std::cmp::Ordering::Equal,
                    })
                    .then(a.id.cmp(&b.id))
            });
            BoardColumn {
                status,
                tasks: column,
            }
        })
        .collect()
}

fn edge_map(tasks: &[Task]) -> HashMap<u64, &[u64]> {
    tasks.iter().map(|t| (t.id, t.dependencies())).collect()
}

/// Iterative DFS over `edges` from `start`, with a visited set so diamonds are
/// walked once and malformed graphs terminate.
fn reaches(start: u64, target: u64, edges: &HashMap<u64, &[u64]>) -> bool {
    let mut visited = HashSet::new();
    let mut stack = vec![start];

    while let Some(current) = stack.pop() {
        if current == target {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        if let Some(deps) = edges.get(&current) {
            for dep in deps.iter() {
                if !visited.contains(dep) {
                    stack.push(*dep);
                }
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, workflow};
    use chrono::{Duration, TimeZone, Utc};

    fn task(id: u64, blocked_by: &[u64]) -> Task {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
        let (completed, status_history) = workflow::initial_state(TaskStatus::ToDo, now);
        Task {
            id,
            project_id: 1,
            title: format!("Task {}", id),
            description: String::new(),
            priority: Priority::Medium,
            due_date: None,
            parent_id: None,
            blocked_by: if blocked_by.is_empty() {
                None
            } else {
                Some(blocked_by.to_vec())
            },
            status: TaskStatus::ToDo,
            completed,
            status_history,
            last_updated: now,
            created_at: now,
        }
    }

    fn subtask(id: u64, parent: u64, status: TaskStatus) -> Task {
        let mut t = task(id, &[]);
        t.parent_id = Some(parent);
        workflow::transition(&mut t, status, workflow::HistoryPolicy::OnChange, Utc::now());
        t
    }

    #[test]
    fn test_validate_accepts_existing_acyclic() {
        let tasks = vec![task(1, &[]), task(2, &[1])];
        assert!(validate_dependencies(3, &[1, 2], &tasks).is_ok());
        assert!(validate_dependencies(2, &[1], &tasks).is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_ids() {
        let tasks = vec![task(1, &[])];
        match validate_dependencies(2, &[1, 9999, 42, 9999], &tasks) {
            Err(Error::InvalidReference(ids)) => assert_eq!(ids, vec![9999, 42]),
            other => panic!("Expected InvalidReference, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_self_reference() {
        let tasks = vec![task(1, &[])];
        match validate_dependencies(1, &[1], &tasks) {
            Err(Error::CircularDependency { task_id, dependency }) => {
                assert_eq!((task_id, dependency), (1, 1));
            }
            other => panic!("Expected CircularDependency, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_direct_cycle() {
        // 2 is blocked by 1; making 1 blocked by 2 closes the loop
        let tasks = vec![task(1, &[]), task(2, &[1])];
        assert!(matches!(
            validate_dependencies(1, &[2], &tasks),
            Err(Error::CircularDependency { task_id: 1, dependency: 2 })
        ));
    }

    #[test]
    fn test_validate_rejects_transitive_cycle() {
        // 3 -> 2 -> 1, then 1 -> 3
        let tasks = vec![task(1, &[]), task(2, &[1]), task(3, &[2])];
        assert!(matches!(
            validate_dependencies(1, &[3], &tasks),
            Err(Error::CircularDependency { .. })
        ));
    }

    #[test]
    fn test_validate_diamond_is_not_a_cycle() {
        // 4 -> {2, 3}, 2 -> 1, 3 -> 1: node 1 reachable twice
        let tasks = vec![task(1, &[]), task(2, &[1]), task(3, &[1]), task(4, &[2, 3])];
        assert!(validate_dependencies(5, &[4, 1], &tasks).is_ok());
        assert!(validate_dependencies(4, &[2, 3, 1], &tasks).is_ok());
    }

    #[test]
    fn test_validate_replaces_existing_edges() {
        // 1 already depends on 2, so 2 -> 1 closes the loop
        let tasks = vec![task(1, &[2]), task(2, &[])];
        assert!(validate_dependencies(2, &[1], &tasks).is_err());
        // Replacing 1's own edges with an empty list is always fine
        assert!(validate_dependencies(1, &[], &tasks).is_ok());
    }

    #[test]
    fn test_validate_terminates_on_malformed_graph() {
        // A pre-existing cycle between 2 and 3 (not creatable through the store)
        let tasks = vec![task(1, &[]), task(2, &[3]), task(3, &[2])];
        assert!(validate_dependencies(1, &[2], &tasks).is_ok());
    }

    #[test]
    fn test_validate_skips_dangling_edges() {
        // 2 still points at deleted task 7
        let tasks = vec![task(1, &[]), task(2, &[7])];
        assert!(validate_dependencies(1, &[2], &tasks).is_ok());
    }

    #[test]
    fn test_validate_parent() {
        let tasks = vec![task(1, &[]), subtask(2, 1, TaskStatus::ToDo), subtask(3, 2, TaskStatus::ToDo)];
        assert!(validate_parent(4, 1, &tasks).is_ok());
        assert!(matches!(
            validate_parent(4, 99, &tasks),
            Err(Error::InvalidParent(99))
        ));
        assert!(matches!(
            validate_parent(1, 1, &tasks),
            Err(Error::CircularHierarchy { task_id: 1, parent_id: 1 })
        ));
        assert!(matches!(
            validate_parent(1, 3, &tasks),
            Err(Error::CircularHierarchy { .. })
        ));
    }

    #[test]
    fn test_is_blocked_ignores_dependency_status() {
        let mut done = task(1, &[]);
        workflow::transition(&mut done, TaskStatus::Done, workflow::HistoryPolicy::OnChange, Utc::now());
        let dependent = task(2, &[1]);
        let tasks = vec![done, dependent.clone()];

        assert!(is_blocked(&dependent));
        assert!(!has_unsatisfied_dependencies(&dependent, &tasks));
        assert!(!is_blocked(&tasks[0]));
    }

    #[test]
    fn test_has_unsatisfied_dependencies() {
        let tasks = vec![task(1, &[]), task(2, &[1]), task(3, &[8])];
        assert!(has_unsatisfied_dependencies(&tasks[1], &tasks));
        // Only a dangling reference: nothing left to wait on
        assert!(!has_unsatisfied_dependencies(&tasks[2], &tasks));
    }

    #[test]
    fn test_subtask_aggregate() {
        let tasks = vec![
            task(1, &[]),
            subtask(2, 1, TaskStatus::Done),
            subtask(3, 1, TaskStatus::Done),
            subtask(4, 1, TaskStatus::Review),
            subtask(5, 2, TaskStatus::Done),
        ];
        let progress = subtask_aggregate(1, &tasks);
        assert_eq!(progress, SubtaskProgress { total: 3, completed: 2 });
        assert!((progress.ratio() - 2.0 / 3.0).abs() < f64::EPSILON);
        assert_eq!(subtask_aggregate(4, &tasks), SubtaskProgress::default());
        assert_eq!(SubtaskProgress::default().ratio(), 0.0);
    }

    #[test]
    fn test_task_depth() {
        let tasks = vec![
            task(1, &[]),
            subtask(2, 1, TaskStatus::ToDo),
            subtask(3, 2, TaskStatus::ToDo),
            subtask(4, 77, TaskStatus::ToDo),
        ];
        assert_eq!(task_depth(1, &tasks).unwrap(), 0);
        assert_eq!(task_depth(2, &tasks).unwrap(), 1);
        assert_eq!(task_depth(3, &tasks).unwrap(), 2);
        assert_eq!(task_depth(4, &tasks).unwrap(), 1);
        assert!(matches!(task_depth(9, &tasks), Err(Error::NotFound(9))));
    }

    #[test]
    fn test_task_depth_guards_parent_cycle() {
        let tasks = vec![subtask(1, 2, TaskStatus::ToDo), subtask(2, 1, TaskStatus::ToDo)];
        assert_eq!(task_depth(1, &tasks).unwrap(), 2);
    }

    #[test]
    fn test_dependents() {
        let tasks = vec![task(1, &[]), task(2, &[1]), task(3, &[2, 1])];
        assert_eq!(dependents(1, &tasks), vec![2, 3]);
        assert!(dependents(3, &tasks).is_empty());
    }

    #[test]
    fn test_dependency_candidates() {
        let tasks = vec![
            task(1, &[]),
            subtask(2, 1, TaskStatus::ToDo),
            subtask(3, 1, TaskStatus::ToDo),
            task(4, &[]),
        ];

        let for_main: Vec<u64> = dependency_candidates(Some(&tasks[0]), &tasks)
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(for_main, vec![4]);

        let for_subtask: Vec<u64> = dependency_candidates(Some(&tasks[1]), &tasks)
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(for_subtask, vec![3, 4]);

        assert_eq!(dependency_candidates(None, &tasks).len(), 4);
    }

    #[test]
    fn test_board_groups_and_sorts() {
        let base = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();

        let mut low = task(1, &[]);
        low.priority = Priority::Low;
        let mut critical = task(2, &[]);
        critical.priority = Priority::Critical;
        let mut high_late = task(3, &[]);
        high_late.priority = Priority::High;
        high_late.due_date = Some(base + Duration::days(5));
        let mut high_soon = task(4, &[]);
        high_soon.priority = Priority::High;
        high_soon.due_date = Some(base);
        let mut high_undated = task(5, &[]);
        high_undated.priority = Priority::High;
        let mut done = task(6, &[]);
        workflow::transition(&mut done, TaskStatus::Done, workflow::HistoryPolicy::OnChange, base);
        let sub = subtask(7, 1, TaskStatus::ToDo);
        let mut other_project = task(8, &[]);
        other_project.project_id = 2;

        let tasks = vec![low, critical, high_late, high_soon, high_undated, done, sub, other_project];
        let columns = board(&tasks, Some(1));

        assert_eq!(columns.len(), 4);
        assert_eq!(columns[0].status, TaskStatus::ToDo);
        let todo: Vec<u64> = columns[0].tasks.iter().map(|t| t.id).collect();
        assert_eq!(todo, vec![2, 4, 3, 5, 1]);
        assert!(columns[1].tasks.is_empty());
        assert!(columns[2].tasks.is_empty());
        assert_eq!(columns[3].tasks.len(), 1);

        let all_projects = board(&tasks, None);
        assert_eq!(all_projects[0].tasks.len(), 6);
    }
}

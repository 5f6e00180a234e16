//! CLI argument definitions for taskflow.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Taskflow - task dependencies, subtasks and status workflow.
#[derive(Parser, Debug)]
#[command(name = "tf")]
#[command(author, version, about = "Track tasks, their dependencies and their status", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Config file (defaults to ~/.config/taskflow/config.kdl)
    #[arg(long, global = true, env = "TF_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the task database.
    /// Can also be set via TF_DATA_DIR environment variable.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Storage backend (sqlite, memory)
    #[arg(long, global = true)]
    pub backend: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Task management commands
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Kanban board: main tasks grouped by status
    Board {
        /// Only show one project
        #[arg(long)]
        project: Option<u64>,
    },

    /// Subtask completion counts for a parent task
    Progress {
        /// Parent task ID
        parent: u64,
    },

    /// Show tasks with dependencies
    Blocked {
        /// Only tasks waiting on a dependency that is not done
        #[arg(long)]
        unsatisfied: bool,
    },

    /// Dependency validation commands
    Deps {
        #[command(subcommand)]
        command: DepsCommands,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a new task
    Create {
        /// Task title
        title: String,

        /// Project the task belongs to
        #[arg(short = 'P', long)]
        project: u64,

        /// Task description
        #[arg(short, long, default_value = "")]
        description: String,

        /// Priority (low, medium, high, critical)
        #[arg(short, long)]
        priority: Option<String>,

        /// Due date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        due: Option<String>,

        /// Initial status (todo, in_progress, review, done)
        #[arg(long)]
        status: Option<String>,

        /// IDs of tasks this one waits on (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        blocked_by: Vec<u64>,

        /// Parent task ID
        #[arg(long)]
        parent: Option<u64>,
    },

    /// Create a subtask (project is inherited from the parent)
    Subtask {
        /// Parent task ID
        parent: u64,

        /// Subtask title
        title: String,

        /// Subtask description
        #[arg(short, long, default_value = "")]
        description: String,

        /// Priority (low, medium, high, critical)
        #[arg(short, long)]
        priority: Option<String>,

        /// Due date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        due: Option<String>,

        /// IDs of tasks this one waits on (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        blocked_by: Vec<u64>,
    },

    /// Show task details with subtask and dependency summary
    Show {
        /// Task ID
        id: u64,
    },

    /// List tasks
    List {
        /// Filter by project
        #[arg(long)]
        project: Option<u64>,

        /// Filter by status
        #[arg(long)]
        status: Option<String>,

        /// Only direct subtasks of this task
        #[arg(long, conflicts_with = "main")]
        parent: Option<u64>,

        /// Only tasks without a parent
        #[arg(long)]
        main: bool,
    },

    /// Update a task
    Update {
        /// Task ID
        id: u64,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// New priority
        #[arg(long)]
        priority: Option<String>,

        /// Move to another project
        #[arg(long)]
        project: Option<u64>,

        /// New due date
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,

        /// Remove the due date
        #[arg(long)]
        clear_due: bool,

        /// New status (todo, in_progress, review, done)
        #[arg(long)]
        status: Option<String>,

        /// Set the completed flag (folded into a status change)
        #[arg(long)]
        completed: Option<bool>,

        /// Replace the dependency list (comma-separated)
        #[arg(long, value_delimiter = ',', conflicts_with = "clear_blocked_by")]
        blocked_by: Option<Vec<u64>>,

        /// Remove all dependencies
        #[arg(long)]
        clear_blocked_by: bool,

        /// New parent task ID
        #[arg(long, conflicts_with = "clear_parent")]
        parent: Option<u64>,

        /// Make the task a main task
        #[arg(long)]
        clear_parent: bool,
    },

    /// Set a task's status (always recorded in history)
    Status {
        /// Task ID
        id: u64,

        /// New status (todo, in_progress, review, done)
        status: String,
    },

    /// Move a task to the next board column (done wraps to to do)
    Advance {
        /// Task ID
        id: u64,
    },

    /// Flip a task between done and to do
    Toggle {
        /// Task ID
        id: u64,
    },

    /// Delete a task (subtasks and dependents are left as they are)
    Delete {
        /// Task ID
        id: u64,
    },

    /// Number of parent hops from a task to its root
    Depth {
        /// Task ID
        id: u64,
    },

    /// Tasks that may be offered as dependencies
    Candidates {
        /// Task being edited (omit for a new task)
        id: Option<u64>,
    },
}

/// Dependency subcommands
#[derive(Subcommand, Debug)]
pub enum DepsCommands {
    /// Check a dependency list for a task without saving it
    Check {
        /// Task ID
        id: u64,

        /// Proposed dependency IDs
        #[arg(required = true, num_args = 1..)]
        blocked_by: Vec<u64>,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the resolved configuration and where each value came from
    Show,
}

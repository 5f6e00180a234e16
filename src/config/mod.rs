//! Configuration for taskflow.
//!
//! ## config.kdl
//!
//! Located at `--config <path>` or, by default, `~/.config/taskflow/config.kdl`.
//!
//! Contains:
//! - `backend` - "sqlite" (default) or "memory"
//! - `data-dir` - Directory holding `tasks.db`
//! - `seed-file` - Fixture JSON for the memory backend
//! - `output-format` - "json" or "human"
//! - `log-level` - Log filter when `TF_LOG` is unset
//!
//! ## Precedence
//!
//! CLI flag > `TF_DATA_DIR` (data dir only) > config.kdl > defaults
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    ConfigOverrides, DATA_DIR_ENV, Resolved, ResolvedConfig, ValueSource, resolve_config,
    resolve_config_with_env,
};
pub use schema::{OutputFormat, TaskflowConfig};

//! Precedence resolution for configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. `TF_DATA_DIR` environment variable (data directory only)
//! 3. config.kdl (`--config <path>` or `~/.config/taskflow/config.kdl`)
//! 4. Built-in defaults

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::Result;
use crate::config::{OutputFormat, TaskflowConfig};
use crate::storage::{self, BackendType};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "TF_DATA_DIR";

/// Default log filter.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from a config file
    File(PathBuf),
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::File(path) => write!(f, "file:{}", path.display()),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

impl Serialize for ValueSource {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, Serialize)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    /// Create a new resolved value.
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    /// Config file consulted, whether or not it existed
    pub config_path: Option<PathBuf>,
    pub backend: Resolved<BackendType>,
    pub data_dir: Resolved<PathBuf>,
    pub seed_file: Option<Resolved<PathBuf>>,
    pub output_format: Resolved<OutputFormat>,
    pub log_level: Resolved<String>,
}

impl ResolvedConfig {
    /// Get the backend type.
    pub fn backend(&self) -> BackendType {
        self.backend.value
    }

    /// Get the data directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir.value
    }

    /// Path of the SQLite database inside the data directory.
    pub fn database_path(&self) -> PathBuf {
        storage::database_path(&self.data_dir.value)
    }

    /// Get the memory backend seed file, if set.
    pub fn seed_file(&self) -> Option<&Path> {
        self.seed_file.as_ref().map(|r| r.value.as_path())
    }

    /// Get the output format value.
    pub fn output_format(&self) -> OutputFormat {
        self.output_format.value
    }

    /// Get the log filter.
    pub fn log_level(&self) -> &str {
        &self.log_level.value
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Explicit config file path from `--config`
    pub config_path: Option<PathBuf>,
    /// Backend override from CLI flag
    pub backend: Option<BackendType>,
    /// Data directory override from CLI flag
    pub data_dir: Option<PathBuf>,
    /// Output format override from CLI flag
    pub output_format: Option<OutputFormat>,
}

impl ConfigOverrides {
    /// Create empty overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set config file path.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Set backend override.
    pub fn with_backend(mut self, backend: BackendType) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set data directory override.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Set output format override.
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }
}

/// Default system config path: `~/.config/taskflow/config.kdl`.
pub fn system_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("taskflow").join("config.kdl"))
}

/// Resolve configuration with full precedence chain.
///
/// Reads `TF_DATA_DIR` from the process environment.
pub fn resolve_config(overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let env_data_dir = std::env::var(DATA_DIR_ENV)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);
    resolve_config_with_env(overrides, env_data_dir)
}

/// Resolve configuration with an explicit value standing in for `TF_DATA_DIR`.
pub fn resolve_config_with_env(
    overrides: &ConfigOverrides,
    env_data_dir: Option<PathBuf>,
) -> Result<ResolvedConfig> {
    let config_path = overrides.config_path.clone().or_else(system_config_path);
    let file_config = match &config_path {
        Some(path) => TaskflowConfig::load(path)?,
        None => TaskflowConfig::new(),
    };
    let file_source = || {
        config_path
            .clone()
            .map(ValueSource::File)
            .unwrap_or(ValueSource::Default)
    };

    // Resolve backend
    let backend = if let Some(backend) = overrides.backend {
        Resolved::new(backend, ValueSource::CliFlag)
    } else if let Some(backend) = file_config.backend {
        Resolved::new(backend, file_source())
    } else {
        Resolved::new(BackendType::default(), ValueSource::Default)
    };

    // Resolve data_dir
    let data_dir = if let Some(ref dir) = overrides.data_dir {
        Resolved::new(dir.clone(), ValueSource::CliFlag)
    } else if let Some(dir) = env_data_dir {
        Resolved::new(dir, ValueSource::EnvVar(DATA_DIR_ENV.to_string()))
    } else if let Some(ref dir) = file_config.data_dir {
        Resolved::new(dir.clone(), file_source())
    } else {
        Resolved::new(storage::default_data_dir()?, ValueSource::Default)
    };

    // Seed file only comes from the config file
    let seed_file = file_config
        .seed_file
        .clone()
        .map(|path| Resolved::new(path, file_source()));

    // Resolve output_format
    let output_format = if let Some(format) = overrides.output_format {
        Resolved::new(format, ValueSource::CliFlag)
    } else if let Some(format) = file_config.output_format {
        Resolved::new(format, file_source())
    } else {
        Resolved::new(OutputFormat::default(), ValueSource::Default)
    };

    // Resolve log_level
    let log_level = match file_config.log_level.clone() {
        Some(level) => Resolved::new(level, file_source()),
        None => Resolved::new(DEFAULT_LOG_LEVEL.to_string(), ValueSource::Default),
    };

    Ok(ResolvedConfig {
        config_path,
        backend,
        data_dir,
        seed_file,
        output_format,
        log_level,
    })
}

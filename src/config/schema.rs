//! KDL schema definitions for config.kdl.
//!
//! This module provides:
//! - Rust structs representing the KDL schema
//! - Serialization/deserialization to/from KDL format
//! - Validation functions

use std::path::{Path, PathBuf};

use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};

use crate::storage::BackendType;
use crate::{Error, Result};

/// Log levels accepted by `log-level`.
pub const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Settings stored in config.kdl.
///
/// # KDL Schema
///
/// ```kdl
/// backend "sqlite"          // or "memory"
/// data-dir "/path/to/data"
/// seed-file "tasks.json"    // fixture for the memory backend
/// output-format "human"     // or "json"
/// log-level "info"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskflowConfig {
    /// Storage backend to open
    pub backend: Option<BackendType>,

    /// Directory holding the SQLite database
    pub data_dir: Option<PathBuf>,

    /// Fixture JSON loaded into the memory backend at startup
    pub seed_file: Option<PathBuf>,

    /// Default output format for CLI commands
    pub output_format: Option<OutputFormat>,

    /// Log filter used when `TF_LOG` is unset
    pub log_level: Option<String>,
}

fn string_value<'a>(doc: &'a KdlDocument, name: &str) -> Option<&'a str> {
    doc.get(name)?.entries().first()?.value().as_string()
}

fn string_node(name: &str, value: impl Into<String>) -> KdlNode {
    let mut node = KdlNode::new(name);
    node.push(KdlEntry::new(KdlValue::String(value.into())));
    node
}

impl TaskflowConfig {
    /// Create an empty config with no values set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config values.
    ///
    /// Returns an error message if any value is invalid.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(level) = &self.log_level {
            if !LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
                return Err(format!(
                    "log-level must be one of {}, got {}",
                    LOG_LEVELS.join(", "),
                    level
                ));
            }
        }
        if self.seed_file.is_some() && self.backend == Some(BackendType::Sqlite) {
            return Err("seed-file only applies to the memory backend".to_string());
        }
        Ok(())
    }

    /// Parse config from a KDL document.
    ///
    /// Unknown nodes are ignored. Values that fail to parse are an error
    /// rather than silently dropped.
    pub fn from_kdl(doc: &KdlDocument) -> Result<Self> {
        let mut config = Self::new();

        if let Some(s) = string_value(doc, "backend") {
            config.backend = Some(
                BackendType::parse(s)
                    .ok_or_else(|| Error::Config(format!("unknown backend: {}", s)))?,
            );
        }

        config.data_dir = string_value(doc, "data-dir").map(PathBuf::from);
        config.seed_file = string_value(doc, "seed-file").map(PathBuf::from);

        if let Some(s) = string_value(doc, "output-format") {
            config.output_format = Some(
                OutputFormat::parse(s)
                    .ok_or_else(|| Error::Config(format!("unknown output-format: {}", s)))?,
            );
        }

        config.log_level = string_value(doc, "log-level").map(str::to_string);

        config.validate().map_err(Error::Config)?;
        Ok(config)
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(backend) = self.backend {
            doc.nodes_mut().push(string_node("backend", backend.as_str()));
        }
        if let Some(ref dir) = self.data_dir {
            doc.nodes_mut()
                .push(string_node("data-dir", dir.display().to_string()));
        }
        if let Some(ref seed) = self.seed_file {
            doc.nodes_mut()
                .push(string_node("seed-file", seed.display().to_string()));
        }
        if let Some(format) = self.output_format {
            doc.nodes_mut()
                .push(string_node("output-format", format.as_str()));
        }
        if let Some(ref level) = self.log_level {
            doc.nodes_mut().push(string_node("log-level", level.clone()));
        }

        doc
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &TaskflowConfig) {
        if other.backend.is_some() {
            self.backend = other.backend;
        }
        if other.data_dir.is_some() {
            self.data_dir = other.data_dir.clone();
        }
        if other.seed_file.is_some() {
            self.seed_file = other.seed_file.clone();
        }
        if other.output_format.is_some() {
            self.output_format = other.output_format;
        }
        if other.log_level.is_some() {
            self.log_level = other.log_level.clone();
        }
    }

    /// Read a config file. A missing file yields an empty config.
    ///
    /// Relative `data-dir` and `seed-file` paths are resolved against the
    /// directory containing the file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file");
            return Ok(Self::new());
        }

        let text = std::fs::read_to_string(path)?;
        let doc: KdlDocument = text
            .parse()
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        let mut config = Self::from_kdl(&doc)?;

        if let Some(base) = path.parent() {
            config.data_dir = config.data_dir.map(|p| base.join(p));
            config.seed_file = config.seed_file.map(|p| base.join(p));
        }

        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }
}

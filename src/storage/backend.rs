//! Storage backend trait and backend selection.
//!
//! This module defines the record-oriented persistence boundary:
//! - `MemoryBackend` - In-process records, optionally seeded from fixture JSON
//! - `SqliteBackend` - Durable records in a SQLite database (default)
//!
//! Both look like a generic hosted record API: records live in a named
//! collection, are addressed by integer id and carry string-keyed fields.

use serde::Serialize;

use crate::Result;
use crate::storage::record::Record;

/// Trait for storage backends that handle raw record persistence.
///
/// The store maps its CRUD operations 1:1 onto these primitives. Backends never
/// interpret task semantics; they only keep records and the id high-water mark.
pub trait StorageBackend: Send {
    /// Fetch every record in a collection, in insertion order.
    fn fetch_records(&self, collection: &str) -> Result<Vec<Record>>;

    /// Insert a new record. Also raises the collection's high-water mark to the
    /// record's id.
    fn create_record(&mut self, collection: &str, record: &Record) -> Result<()>;

    /// Replace an existing record's fields.
    fn update_record(&mut self, collection: &str, record: &Record) -> Result<()>;

    /// Delete a record. Returns `false` if no record had that id.
    fn delete_record(&mut self, collection: &str, id: u64) -> Result<bool>;

    /// Highest id ever created in the collection, including deleted ones.
    fn high_water_mark(&self, collection: &str) -> Result<u64>;

    /// Get the storage location description (for display purposes).
    fn location(&self) -> String;

    /// Get the backend type.
    fn backend_type(&self) -> BackendType;
}

/// Available storage backend types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// In-memory records, lost on exit
    Memory,
    /// SQLite database file
    #[default]
    Sqlite,
}

impl BackendType {
    /// Parse a backend type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" | "mem" | "mock" => Some(Self::Memory),
            "sqlite" | "sql" | "db" => Some(Self::Sqlite),
            _ => None,
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sqlite => "sqlite",
        }
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

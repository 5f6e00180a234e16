//! In-memory record backend.
//!
//! Records live in process memory and are lost on exit. A backend can be seeded
//! from fixture JSON: an array of flat objects, each carrying an `id` (or `Id`)
//! next to its fields.

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;

use crate::storage::backend::{BackendType, StorageBackend};
use crate::storage::record::{Record, lookup_id};
use crate::{Error, Result};

#[derive(Debug, Default)]
struct Collection {
    records: Vec<Record>,
    high_water: u64,
}

/// Record storage backed by plain vectors.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    collections: HashMap<String, Collection>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend with `collection` seeded from fixture JSON.
    pub fn from_fixture(collection: &str, json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        let Value::Array(items) = value else {
            return Err(Error::InvalidInput(
                "fixture must be a JSON array of records".to_string(),
            ));
        };

        let mut backend = Self::new();
        for item in items {
            let Value::Object(mut fields) = item else {
                return Err(Error::InvalidInput("fixture entries must be objects".to_string()));
            };
            let id = fields
                .remove("id")
                .or_else(|| fields.remove("Id"))
                .as_ref()
                .and_then(lookup_id)
                .ok_or_else(|| Error::InvalidInput("fixture entry has no id".to_string()))?;
            backend.create_record(collection, &Record { id, fields })?;
        }

        tracing::debug!(
            collection,
            count = backend.collection_len(collection),
            "seeded memory backend"
        );
        Ok(backend)
    }

    /// Read a fixture file and seed `collection` from it.
    pub fn load_fixture(collection: &str, path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_fixture(collection, &json)
    }

    fn collection_len(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|c| c.records.len())
            .unwrap_or(0)
    }
}

impl StorageBackend for MemoryBackend {
    fn fetch_records(&self, collection: &str) -> Result<Vec<Record>> {
        Ok(self
            .collections
            .get(collection)
            .map(|c| c.records.clone())
            .unwrap_or_default())
    }

    fn create_record(&mut self, collection: &str, record: &Record) -> Result<()> {
        let entry = self.collections.entry(collection.to_string()).or_default();
        if entry.records.iter().any(|r| r.id == record.id) {
            return Err(Error::InvalidInput(format!(
                "record {} already exists in {}",
                record.id, collection
            )));
        }
        entry.high_water = entry.high_water.max(record.id);
        entry.records.push(record.clone());
        Ok(())
    }

    fn update_record(&mut self, collection: &str, record: &Record) -> Result<()> {
        let existing = self
            .collections
            .get_mut(collection)
            .and_then(|c| c.records.iter_mut().find(|r| r.id == record.id))
            .ok_or(Error::NotFound(record.id))?;
        *existing = record.clone();
        Ok(())
    }

    fn delete_record(&mut self, collection: &str, id: u64) -> Result<bool> {
        let Some(entry) = self.collections.get_mut(collection) else {
            return Ok(false);
        };
        let before = entry.records.len();
        entry.records.retain(|r| r.id != id);
        Ok(entry.records.len() < before)
    }

    fn high_water_mark(&self, collection: &str) -> Result<u64> {
        Ok(self
            .collections
            .get(collection)
            .map(|c| c.high_water)
            .unwrap_or(0))
    }

    fn location(&self) -> String {
        "memory".to_string()
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Memory
    }
}

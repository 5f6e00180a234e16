//! SQLite record backend.
//!
//! Records are stored as JSON field maps keyed by `(collection, id)`. The backend
//! maintains the `created_on`/`modified_on` system timestamps itself and keeps a
//! per-collection high-water mark so deleted ids are never handed out again.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Map, Value};

use crate::storage::backend::{BackendType, StorageBackend};
use crate::storage::record::{Record, fields};
use crate::{Error, Result};

/// Record storage in a single SQLite database file.
pub struct SqliteBackend {
    path: Option<PathBuf>,
    conn: Connection,
}

impl SqliteBackend {
    /// Open or create the database at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            path: Some(path.to_path_buf()),
            conn,
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { path: None, conn })
    }

    /// Initialize the SQLite schema.
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                collection TEXT NOT NULL,
                id INTEGER NOT NULL,
                fields TEXT NOT NULL,
                created_on TEXT NOT NULL,
                modified_on TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            );

            CREATE TABLE IF NOT EXISTS collection_meta (
                collection TEXT PRIMARY KEY,
                high_water INTEGER NOT NULL DEFAULT 0
            );
            "#,
        )?;
        Ok(())
    }

    fn encode_fields(record: &Record) -> Result<String> {
        Ok(serde_json::to_string(&record.fields)?)
    }
}

impl StorageBackend for SqliteBackend {
    fn fetch_records(&self, collection: &str) -> Result<Vec<Record>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, fields, created_on, modified_on FROM records WHERE collection = ?1 ORDER BY rowid",
        )?;
        let rows = stmt.query_map([collection], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, raw_fields, created_on, modified_on) = row?;
            let mut record_fields: Map<String, Value> = serde_json::from_str(&raw_fields)?;
            record_fields
                .entry(fields::CREATED_ON)
                .or_insert(Value::String(created_on));
            record_fields
                .entry(fields::MODIFIED_ON)
                .or_insert(Value::String(modified_on));
            records.push(Record {
                id: id as u64,
                fields: record_fields,
            });
        }
        Ok(records)
    }

    fn create_record(&mut self, collection: &str, record: &Record) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO records (collection, id, fields, created_on, modified_on) VALUES (?1, ?2, ?3, ?4, ?4)",
            params![collection, record.id as i64, Self::encode_fields(record)?, now],
        )?;
        tx.execute(
            r#"
            INSERT INTO collection_meta (collection, high_water) VALUES (?1, ?2)
            ON CONFLICT(collection) DO UPDATE SET high_water = MAX(high_water, excluded.high_water)
            "#,
            params![collection, record.id as i64],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn update_record(&mut self, collection: &str, record: &Record) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE records SET fields = ?1, modified_on = ?2 WHERE collection = ?3 AND id = ?4",
            params![
                Self::encode_fields(record)?,
                Utc::now().to_rfc3339(),
                collection,
                record.id as i64
            ],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(record.id));
        }
        Ok(())
    }

    fn delete_record(&mut self, collection: &str, id: u64) -> Result<bool> {
        let changed = self.conn.execute(
            "DELETE FROM records WHERE collection = ?1 AND id = ?2",
            params![collection, id as i64],
        )?;
        Ok(changed > 0)
    }

    fn high_water_mark(&self, collection: &str) -> Result<u64> {
        let high_water: Option<i64> = self
            .conn
            .query_row(
                "SELECT high_water FROM collection_meta WHERE collection = ?1",
                [collection],
                |row| row.get(0),
            )
            .optional()?;
        Ok(high_water.unwrap_or(0) as u64)
    }

    fn location(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => ":memory:".to_string(),
        }
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Sqlite
    }
}

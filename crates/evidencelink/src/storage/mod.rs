//! Storage layer for evidencelink.
//!
//! Persistence is a single-user key-value store of whole JSON documents:
//! every write replaces the full value stored under a key. [`SqliteStore`]
//! keeps the documents in a `SQLite` file; [`MemoryStore`] keeps them in a
//! map and is used for tests and dry runs.
//!
//! Nothing here coordinates between processes. Two processes writing the
//! same database will overwrite each other's documents.

pub mod schema;

use std::collections::HashMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// A whole-document key-value store.
pub trait DocumentStore: Debug + Send {
    /// Read the document stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Write every `(key, value)` pair, or none of them.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written. On error no
    /// document has changed.
    fn write_all(&mut self, documents: &[(&str, String)]) -> Result<()>;

    /// Document count, last write time and storage size.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn stats(&self) -> Result<StorageStats>;
}

/// In-memory document store.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    documents: HashMap<String, String>,
    last_updated: Option<DateTime<Utc>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw document directly, bypassing validation.
    pub fn insert_raw(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.documents.insert(key.into(), value.into());
    }
}

impl DocumentStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.documents.get(key).cloned())
    }

    fn write_all(&mut self, documents: &[(&str, String)]) -> Result<()> {
        validate_keys(documents)?;
        for (key, value) in documents {
            self.documents.insert((*key).to_string(), value.clone());
        }
        self.last_updated = Some(Utc::now());
        Ok(())
    }

    fn stats(&self) -> Result<StorageStats> {
        Ok(StorageStats {
            documents: self.documents.len(),
            last_updated: self.last_updated,
            size_bytes: self.documents.values().map(|v| v.len() as u64).sum(),
        })
    }
}

/// `SQLite`-backed document store.
#[derive(Debug)]
pub struct SqliteStore {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl SqliteStore {
    /// Open or create a document database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema
    /// cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        schema::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory database for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        schema::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }
}

impl DocumentStore for SqliteStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM documents WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write_all(&mut self, documents: &[(&str, String)]) -> Result<()> {
        validate_keys(documents)?;

        let updated_at = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        for (key, value) in documents {
            tx.execute(
                r"
                INSERT INTO documents (key, value, updated_at) VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                ",
                params![key, value, updated_at],
            )?;
        }
        tx.commit()?;

        debug!("Wrote {} document(s)", documents.len());
        Ok(())
    }

    fn stats(&self) -> Result<StorageStats> {
        let documents: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;

        let last_updated: Option<String> = self
            .conn
            .query_row(
                "SELECT updated_at FROM documents ORDER BY updated_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let last_updated = last_updated
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let size_bytes = if self.path.as_os_str() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map_or(0, |m| m.len())
        };

        Ok(StorageStats {
            documents: usize::try_from(documents).unwrap_or_default(),
            last_updated,
            size_bytes,
        })
    }
}

fn validate_keys(documents: &[(&str, String)]) -> Result<()> {
    if let Some((key, _)) = documents.iter().find(|(key, _)| key.trim().is_empty()) {
        return Err(Error::DocumentWrite {
            key: (*key).to_string(),
            message: "document key must not be empty".to_string(),
        });
    }
    Ok(())
}

/// Statistics about a document backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of stored documents.
    pub documents: usize,
    /// When any document was last written.
    pub last_updated: Option<DateTime<Utc>>,
    /// Size of the database file, or of the held documents, in bytes.
    pub size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_storage() -> SqliteStore {
        SqliteStore::open_in_memory().expect("failed to create test storage")
    }

    #[test]
    fn test_open_in_memory() {
        assert!(SqliteStore::open_in_memory().is_ok());
    }

    #[test]
    fn test_read_missing_key() {
        let storage = create_test_storage();
        assert!(storage.read("nothing").unwrap().is_none());
    }

    #[test]
    fn test_write_and_read() {
        let mut storage = create_test_storage();
        storage
            .write_all(&[("a", "{\"x\":1}".to_string()), ("b", "[]".to_string())])
            .unwrap();

        assert_eq!(storage.read("a").unwrap().as_deref(), Some("{\"x\":1}"));
        assert_eq!(storage.read("b").unwrap().as_deref(), Some("[]"));
        assert_eq!(storage.stats().unwrap().documents, 2);
    }

    #[test]
    fn test_write_replaces_whole_document() {
        let mut storage = create_test_storage();
        storage.write_all(&[("a", "first".to_string())]).unwrap();
        storage.write_all(&[("a", "second".to_string())]).unwrap();

        assert_eq!(storage.read("a").unwrap().as_deref(), Some("second"));
        assert_eq!(storage.stats().unwrap().documents, 1);
    }

    #[test]
    fn test_empty_key_writes_nothing() {
        let mut storage = create_test_storage();
        let result = storage.write_all(&[("a", "1".to_string()), ("", "2".to_string())]);

        assert!(matches!(result, Err(Error::DocumentWrite { .. })));
        assert!(storage.read("a").unwrap().is_none());
    }

    #[test]
    fn test_stats_empty() {
        let storage = create_test_storage();
        let stats = storage.stats().unwrap();

        assert_eq!(stats.documents, 0);
        assert!(stats.last_updated.is_none());
        assert_eq!(stats.size_bytes, 0);
    }

    #[test]
    fn test_stats_with_data() {
        let mut storage = create_test_storage();
        storage.write_all(&[("a", "1".to_string())]).unwrap();

        let stats = storage.stats().unwrap();
        assert_eq!(stats.documents, 1);
        assert!(stats.last_updated.is_some());
    }

    #[test]
    fn test_open_file_based_persists() {
        let db_path = std::env::temp_dir().join(format!(
            "evidencelink_storage_test_{}.db",
            std::process::id()
        ));

        {
            let mut storage = SqliteStore::open(&db_path).unwrap();
            storage.write_all(&[("k", "v".to_string())]).unwrap();
            assert!(storage.stats().unwrap().size_bytes > 0);
        }

        let reopened = SqliteStore::open(&db_path).unwrap();
        assert_eq!(reopened.read("k").unwrap().as_deref(), Some("v"));

        drop(reopened);
        let _ = std::fs::remove_file(&db_path);
        let _ = std::fs::remove_file(db_path.with_extension("db-wal"));
        let _ = std::fs::remove_file(db_path.with_extension("db-shm"));
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let root = std::env::temp_dir().join(format!(
            "evidencelink_nested_test_{}",
            std::process::id()
        ));
        let nested_path = root.join("nested/evidence.db");
        let _ = std::fs::remove_dir_all(&root);

        let storage = SqliteStore::open(&nested_path).unwrap();
        assert!(nested_path.exists());

        drop(storage);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let mut store = MemoryStore::new();
        store.write_all(&[("b", "2".to_string())]).unwrap();
        store.insert_raw("a", "1");

        assert_eq!(store.read("a").unwrap().as_deref(), Some("1"));
        assert_eq!(store.read("b").unwrap().as_deref(), Some("2"));

        let stats = store.stats().unwrap();
        assert_eq!(stats.documents, 2);
        assert_eq!(stats.size_bytes, 2);
        assert!(stats.last_updated.is_some());
    }

    #[test]
    fn test_memory_store_rejects_empty_key() {
        let mut store = MemoryStore::new();
        assert!(store.write_all(&[(" ", "x".to_string())]).is_err());
        assert_eq!(store.stats().unwrap().documents, 0);
    }
}

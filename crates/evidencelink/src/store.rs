//! The quote store: evidence index and transcripts, mirrored in memory.
//!
//! [`QuoteStore`] is constructed once at startup around a
//! [`DocumentStore`] backend. It loads everything into memory and writes
//! everything back on [`QuoteStore::save`]. Loading never fails: a missing
//! or unreadable document starts that collection empty.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::quote::EvidenceQuote;
use crate::storage::{DocumentStore, StorageStats};
use crate::transcript::TranscriptRecord;

/// Document key of the evidence index.
pub const LINKED_QUOTES_KEY: &str = "evidence/linked-quotes";

/// Document key of the transcript list.
pub const TRANSCRIPTS_KEY: &str = "evidence/transcripts";

/// Objective id -> quotes, in display order.
///
/// No objective maps to an empty list.
pub type ObjectiveEvidenceIndex = BTreeMap<String, Vec<EvidenceQuote>>;

/// In-memory mirror of the persisted evidence.
#[derive(Debug)]
pub struct QuoteStore {
    backend: Box<dyn DocumentStore>,
    index: ObjectiveEvidenceIndex,
    transcripts: Vec<TranscriptRecord>,
}

impl QuoteStore {
    /// Create a store over `backend` and load its contents.
    #[must_use]
    pub fn open(backend: Box<dyn DocumentStore>) -> Self {
        let mut store = Self {
            backend,
            index: ObjectiveEvidenceIndex::new(),
            transcripts: Vec::new(),
        };
        store.load();
        store
    }

    /// Replace the in-memory state with what the backend holds.
    pub fn load(&mut self) {
        let mut index: ObjectiveEvidenceIndex =
            self.read_document(LINKED_QUOTES_KEY).unwrap_or_default();
        index.retain(|_, quotes| !quotes.is_empty());

        self.index = index;
        self.transcripts = self.read_document(TRANSCRIPTS_KEY).unwrap_or_default();

        debug!(
            objectives = self.index.len(),
            transcripts = self.transcripts.len(),
            "Loaded evidence store"
        );
    }

    /// Write the full in-memory state to the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the backend write fails. Either
    /// both documents are written or neither is.
    pub fn save(&mut self) -> Result<()> {
        let index = serde_json::to_string(&self.index)?;
        let transcripts = serde_json::to_string(&self.transcripts)?;

        self.backend
            .write_all(&[(LINKED_QUOTES_KEY, index), (TRANSCRIPTS_KEY, transcripts)])?;

        info!(
            quotes = self.count_quotes(),
            transcripts = self.transcripts.len(),
            "Saved evidence store"
        );
        Ok(())
    }

    /// Read-only view of the evidence index.
    #[must_use]
    pub fn index(&self) -> &ObjectiveEvidenceIndex {
        &self.index
    }

    /// Transcripts, newest first.
    #[must_use]
    pub fn transcripts(&self) -> &[TranscriptRecord] {
        &self.transcripts
    }

    /// Total number of quotes across all objectives.
    #[must_use]
    pub fn count_quotes(&self) -> usize {
        self.index.values().map(Vec::len).sum()
    }

    /// Summary counts for display.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            objectives: self.index.len(),
            quotes: self.count_quotes(),
            transcripts: self.transcripts.len(),
            last_linked_at: self
                .index
                .values()
                .flatten()
                .map(|quote| quote.linked_at)
                .max(),
        }
    }

    /// Statistics from the storage backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    pub fn storage_stats(&self) -> Result<StorageStats> {
        self.backend.stats()
    }

    pub(crate) fn index_mut(&mut self) -> &mut ObjectiveEvidenceIndex {
        &mut self.index
    }

    pub(crate) fn transcripts_mut(&mut self) -> &mut Vec<TranscriptRecord> {
        &mut self.transcripts
    }

    fn read_document<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.read(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "Failed to read stored document, starting empty");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Stored document is malformed, starting empty");
                None
            }
        }
    }
}

/// Summary counts over the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Objectives with at least one quote.
    pub objectives: usize,
    /// Total quotes.
    pub quotes: usize,
    /// Stored transcripts.
    pub transcripts: usize,
    /// Most recent `linkedAt`.
    pub last_linked_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::QuoteInput;
    use crate::storage::{MemoryStore, SqliteStore};
    use crate::transcript::TranscriptInput;

    fn quote(text: &str) -> EvidenceQuote {
        EvidenceQuote::from_input(QuoteInput::new(text), "tester").unwrap()
    }

    #[test]
    fn test_open_empty_backend() {
        let store = QuoteStore::open(Box::new(MemoryStore::new()));

        assert!(store.index().is_empty());
        assert!(store.transcripts().is_empty());
        assert_eq!(store.count_quotes(), 0);
    }

    #[test]
    fn test_malformed_documents_load_empty() {
        let mut backend = MemoryStore::new();
        backend.insert_raw(LINKED_QUOTES_KEY, "not json");
        backend.insert_raw(TRANSCRIPTS_KEY, "{\"wrong\": \"shape\"}");

        let store = QuoteStore::open(Box::new(backend));
        assert!(store.index().is_empty());
        assert!(store.transcripts().is_empty());
    }

    #[test]
    fn test_one_bad_document_does_not_reset_the_other() {
        let mut backend = MemoryStore::new();
        backend.insert_raw(LINKED_QUOTES_KEY, "[[[");
        let transcripts = vec![TranscriptRecord::from_input(TranscriptInput {
            raw_text: "kept".to_string(),
            ..TranscriptInput::default()
        })];
        backend.insert_raw(TRANSCRIPTS_KEY, serde_json::to_string(&transcripts).unwrap());

        let store = QuoteStore::open(Box::new(backend));
        assert!(store.index().is_empty());
        assert_eq!(store.transcripts().len(), 1);
    }

    #[test]
    fn test_empty_lists_dropped_on_load() {
        let mut backend = MemoryStore::new();
        backend.insert_raw(
            LINKED_QUOTES_KEY,
            serde_json::to_string(&serde_json::json!({ "AC.L1-3.1.1": [] })).unwrap(),
        );

        let store = QuoteStore::open(Box::new(backend));
        assert!(store.index().is_empty());
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let db_path = std::env::temp_dir().join(format!(
            "evidencelink_store_test_{}.db",
            std::process::id()
        ));

        let mut expected = Vec::new();
        {
            let backend = SqliteStore::open(&db_path).unwrap();
            let mut store = QuoteStore::open(Box::new(backend));
            for (objective, text) in [
                ("AC.L1-3.1.1", "Only authorized users get accounts"),
                ("AC.L1-3.1.1", "Access reviews are quarterly"),
                ("IA.L2-3.5.3", "MFA on all remote access"),
            ] {
                let q = quote(text);
                expected.push((objective.to_string(), q.quote_id.clone(), q.text.clone()));
                store
                    .index_mut()
                    .entry(objective.to_string())
                    .or_default()
                    .push(q);
            }
            store.save().unwrap();
        }

        let reopened = QuoteStore::open(Box::new(SqliteStore::open(&db_path).unwrap()));
        let actual: Vec<(String, String, String)> = reopened
            .index()
            .iter()
            .flat_map(|(objective, quotes)| {
                quotes
                    .iter()
                    .map(move |q| (objective.clone(), q.quote_id.clone(), q.text.clone()))
            })
            .collect();

        assert_eq!(actual, expected);

        drop(reopened);
        let _ = std::fs::remove_file(&db_path);
        let _ = std::fs::remove_file(db_path.with_extension("db-wal"));
        let _ = std::fs::remove_file(db_path.with_extension("db-shm"));
    }

    #[test]
    fn test_load_discards_unsaved_changes() {
        let mut store = QuoteStore::open(Box::new(MemoryStore::new()));
        store
            .index_mut()
            .entry("SC.L1-3.13.1".to_string())
            .or_default()
            .push(quote("unsaved"));

        store.load();
        assert!(store.index().is_empty());
    }

    #[test]
    fn test_stats() {
        let mut store = QuoteStore::open(Box::new(MemoryStore::new()));
        assert_eq!(store.stats().last_linked_at, None);

        store
            .index_mut()
            .entry("A".to_string())
            .or_default()
            .extend([quote("one"), quote("two")]);
        store.transcripts_mut().push(TranscriptRecord::from_input(TranscriptInput {
            raw_text: "t".to_string(),
            ..TranscriptInput::default()
        }));

        let stats = store.stats();
        assert_eq!(stats.objectives, 1);
        assert_eq!(stats.quotes, 2);
        assert_eq!(stats.transcripts, 1);
        assert!(stats.last_linked_at.is_some());
    }

    #[test]
    fn test_storage_stats_follow_saves() {
        let mut store = QuoteStore::open(Box::new(MemoryStore::new()));
        assert_eq!(store.storage_stats().unwrap().documents, 0);

        store.save().unwrap();
        let stats = store.storage_stats().unwrap();
        assert_eq!(stats.documents, 2);
        assert!(stats.size_bytes > 0);
        assert!(stats.last_updated.is_some());
    }
}

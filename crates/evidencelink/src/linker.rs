//! Operations that link, annotate, and unlink evidence quotes.
//!
//! A [`QuoteLinker`] borrows the [`QuoteStore`] for the duration of a batch
//! of edits and persists after every successful mutation. Operations on
//! unknown objectives or quote ids are no-ops that report `false`.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::quote::{EvidenceQuote, QuoteInput};
use crate::store::{ObjectiveEvidenceIndex, QuoteStore};
use crate::transcript::{TranscriptInput, TranscriptRecord};

/// Edits the evidence index on behalf of one user.
#[derive(Debug)]
pub struct QuoteLinker<'a> {
    store: &'a mut QuoteStore,
    user: String,
}

impl<'a> QuoteLinker<'a> {
    /// Create a linker acting as `user` (recorded as `linkedBy`).
    #[must_use]
    pub fn new(store: &'a mut QuoteStore, user: impl Into<String>) -> Self {
        Self {
            store,
            user: user.into(),
        }
    }

    /// The identity recorded on new quotes.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Link a new quote to an objective and persist it.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the objective id or the quote text is
    /// empty, or a storage error if persisting fails. In both cases the
    /// index is left unchanged.
    pub fn link_quote(&mut self, objective_id: &str, input: QuoteInput) -> Result<EvidenceQuote> {
        let objective_id = objective_id.trim();
        if objective_id.is_empty() {
            return Err(Error::EmptyObjectiveId);
        }

        let mut quote = EvidenceQuote::from_input(input, &self.user)?;
        let quotes = self
            .store
            .index_mut()
            .entry(objective_id.to_string())
            .or_default();
        while quotes.iter().any(|q| q.quote_id == quote.quote_id) {
            quote.quote_id = EvidenceQuote::generate_id();
        }
        quotes.push(quote.clone());

        if let Err(e) = self.store.save() {
            self.remove_quote(objective_id, &quote.quote_id);
            return Err(e);
        }

        info!(objective = objective_id, quote_id = %quote.quote_id, "Linked quote");
        Ok(quote)
    }

    /// Remove a quote from an objective.
    ///
    /// Drops the objective entirely when its last quote is removed. Returns
    /// `false` without writing if nothing matched.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails.
    pub fn unlink_quote(&mut self, objective_id: &str, quote_id: &str) -> Result<bool> {
        let objective_id = objective_id.trim();
        let Some((position, removed)) = self.remove_quote(objective_id, quote_id) else {
            debug!(objective = objective_id, quote_id, "Unlink matched nothing");
            return Ok(false);
        };

        if let Err(e) = self.store.save() {
            self.store
                .index_mut()
                .entry(objective_id.to_string())
                .or_default()
                .insert(position, removed);
            return Err(e);
        }

        info!(objective = objective_id, quote_id, "Unlinked quote");
        Ok(true)
    }

    /// Replace the note on a quote.
    ///
    /// Returns `false` without writing if nothing matched.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails. The old note is kept.
    pub fn update_note(&mut self, objective_id: &str, quote_id: &str, note: &str) -> Result<bool> {
        let objective_id = objective_id.trim();
        let Some(quote) = self.quote_mut(objective_id, quote_id) else {
            debug!(objective = objective_id, quote_id, "Note update matched nothing");
            return Ok(false);
        };

        let previous = std::mem::replace(&mut quote.note, note.to_string());
        if let Err(e) = self.store.save() {
            if let Some(quote) = self.quote_mut(objective_id, quote_id) {
                quote.note = previous;
            }
            return Err(e);
        }

        debug!(objective = objective_id, quote_id, "Updated note");
        Ok(true)
    }

    /// Quotes linked to an objective, in display order.
    #[must_use]
    pub fn get_quotes(&self, objective_id: &str) -> &[EvidenceQuote] {
        self.store
            .index()
            .get(objective_id.trim())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The whole evidence index.
    #[must_use]
    pub fn index(&self) -> &ObjectiveEvidenceIndex {
        self.store.index()
    }

    /// Find a quote by id across all objectives.
    #[must_use]
    pub fn find_quote(&self, quote_id: &str) -> Option<(&str, &EvidenceQuote)> {
        self.store.index().iter().find_map(|(objective, quotes)| {
            quotes
                .iter()
                .find(|q| q.quote_id == quote_id)
                .map(|q| (objective.as_str(), q))
        })
    }

    /// Total number of linked quotes.
    #[must_use]
    pub fn count_all(&self) -> usize {
        self.store.count_quotes()
    }

    /// Objectives that have at least one quote.
    #[must_use]
    pub fn objectives_with_quotes(&self) -> BTreeSet<String> {
        self.store.index().keys().cloned().collect()
    }

    /// Store a transcript at the front of the list.
    ///
    /// Returns `None` if a transcript with identical raw text already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails.
    pub fn add_transcript(&mut self, input: TranscriptInput) -> Result<Option<TranscriptRecord>> {
        let fingerprint = TranscriptRecord::compute_fingerprint(&input.raw_text);
        if self
            .store
            .transcripts()
            .iter()
            .any(|t| t.matches_fingerprint(&fingerprint))
        {
            debug!("Skipping duplicate transcript {}", &fingerprint[..16]);
            return Ok(None);
        }

        let record = TranscriptRecord::from_input(input);
        self.store.transcripts_mut().insert(0, record.clone());

        if let Err(e) = self.store.save() {
            self.store.transcripts_mut().remove(0);
            return Err(e);
        }

        info!(id = %record.id, title = %record.title, "Added transcript");
        Ok(Some(record))
    }

    /// Transcripts, newest first.
    #[must_use]
    pub fn transcripts(&self) -> &[TranscriptRecord] {
        self.store.transcripts()
    }

    /// Look up a transcript by id.
    #[must_use]
    pub fn transcript(&self, id: &str) -> Option<&TranscriptRecord> {
        self.store.transcripts().iter().find(|t| t.id == id)
    }

    /// Delete a transcript. Quotes drawn from it are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails.
    pub fn delete_transcript(&mut self, id: &str) -> Result<bool> {
        let transcripts = self.store.transcripts_mut();
        let Some(position) = transcripts.iter().position(|t| t.id == id) else {
            return Ok(false);
        };
        let removed = transcripts.remove(position);

        if let Err(e) = self.store.save() {
            self.store.transcripts_mut().insert(position, removed);
            return Err(e);
        }

        info!(id, "Deleted transcript");
        Ok(true)
    }

    fn quote_mut(&mut self, objective_id: &str, quote_id: &str) -> Option<&mut EvidenceQuote> {
        self.store
            .index_mut()
            .get_mut(objective_id)
            .and_then(|quotes| quotes.iter_mut().find(|q| q.quote_id == quote_id))
    }

    fn remove_quote(&mut self, objective_id: &str, quote_id: &str) -> Option<(usize, EvidenceQuote)> {
        let index = self.store.index_mut();
        let quotes = index.get_mut(objective_id)?;
        let position = quotes.iter().position(|q| q.quote_id == quote_id)?;
        let removed = quotes.remove(position);
        if quotes.is_empty() {
            index.remove(objective_id);
        }
        Some((position, removed))
    }
}

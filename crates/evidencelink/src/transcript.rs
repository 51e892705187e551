//! Transcript records.
//!
//! Transcripts are raw meeting or interview text that quotes are drawn from.
//! They are never edited after creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::quote::UNKNOWN_SPEAKER;

/// Title used when none is given.
pub const UNTITLED: &str = "Untitled transcript";

/// Number of characters of raw text kept as the default summary.
const SUMMARY_CHARS: usize = 200;

/// Caller-supplied fields for a new transcript.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptInput {
    /// Title of the meeting or interview.
    pub title: Option<String>,
    /// Date of the meeting (free text, usually `YYYY-MM-DD`).
    pub date: Option<String>,
    /// Primary speaker.
    pub speaker: Option<String>,
    /// Short summary.
    pub summary: Option<String>,
    /// The full transcript text.
    pub raw_text: String,
}

/// A stored transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptRecord {
    /// Unique identifier.
    pub id: String,
    /// Title of the meeting or interview.
    pub title: String,
    /// Date of the meeting.
    pub date: String,
    /// Primary speaker.
    pub speaker: String,
    /// Short summary.
    pub summary: String,
    /// The full transcript text.
    pub raw_text: String,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// BLAKE3 hash of the raw text.
    #[serde(default)]
    pub fingerprint: String,
}

impl TranscriptRecord {
    /// Build a record from caller input, filling defaults.
    #[must_use]
    pub fn from_input(input: TranscriptInput) -> Self {
        let created_at = Utc::now();
        let fingerprint = Self::compute_fingerprint(&input.raw_text);
        let summary = input
            .summary
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| summarize(&input.raw_text));

        Self {
            id: format!("t-{}", Uuid::new_v4().simple()),
            title: input
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| UNTITLED.to_string()),
            date: input
                .date
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| created_at.format("%Y-%m-%d").to_string()),
            speaker: input
                .speaker
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_SPEAKER.to_string()),
            summary,
            raw_text: input.raw_text,
            created_at,
            fingerprint,
        }
    }

    /// Compute the BLAKE3 hash of transcript text.
    #[must_use]
    pub fn compute_fingerprint(text: &str) -> String {
        blake3::hash(text.as_bytes()).to_hex().to_string()
    }

    /// Check if this transcript has the same raw text as `fingerprint`.
    ///
    /// Records persisted without a fingerprint are hashed on the fly.
    #[must_use]
    pub fn matches_fingerprint(&self, fingerprint: &str) -> bool {
        if self.fingerprint.is_empty() {
            Self::compute_fingerprint(&self.raw_text) == fingerprint
        } else {
            self.fingerprint == fingerprint
        }
    }
}

fn summarize(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= SUMMARY_CHARS {
        collapsed
    } else {
        let mut summary: String = collapsed.chars().take(SUMMARY_CHARS).collect();
        summary.push_str("...");
        summary
    }
}

//! Evidence quote records.
//!
//! An [`EvidenceQuote`] is a short excerpt, attributed to a speaker and a
//! source, offered as evidence that a control objective is met. Callers
//! describe a quote with a [`QuoteInput`]; all default-filling happens in
//! [`EvidenceQuote::from_input`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Attribution used when no speaker or role is given.
pub const UNKNOWN_SPEAKER: &str = "Unknown";

/// Caller-supplied fields for a new quote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteInput {
    /// The evidentiary excerpt. Required.
    pub text: String,
    /// Who said it.
    pub speaker: Option<String>,
    /// The speaker's role (e.g. "IT Director").
    pub speaker_role: Option<String>,
    /// Identifier of the originating transcript or meeting.
    pub source_id: Option<String>,
    /// Title of the originating transcript or meeting.
    pub source_title: Option<String>,
    /// Date of the originating transcript or meeting.
    pub source_date: Option<String>,
    /// Initial annotation.
    pub note: Option<String>,
}

impl QuoteInput {
    /// Create an input with only the quote text set.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Set the speaker.
    #[must_use]
    pub fn speaker(mut self, speaker: impl Into<String>) -> Self {
        self.speaker = Some(speaker.into());
        self
    }

    /// Set the speaker's role.
    #[must_use]
    pub fn speaker_role(mut self, role: impl Into<String>) -> Self {
        self.speaker_role = Some(role.into());
        self
    }

    /// Set the note.
    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// A quote linked to a control objective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceQuote {
    /// Unique identifier, generated at creation and never reused.
    pub quote_id: String,
    /// The evidentiary excerpt.
    pub text: String,
    /// Who said it.
    pub speaker: String,
    /// The speaker's role.
    pub speaker_role: String,
    /// Identifier of the originating transcript or meeting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    /// Title of the originating transcript or meeting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_title: Option<String>,
    /// Date of the originating transcript or meeting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_date: Option<String>,
    /// When the quote was linked.
    pub linked_at: DateTime<Utc>,
    /// Who linked it.
    pub linked_by: String,
    /// Free-text annotation; the only field that changes after creation.
    #[serde(default)]
    pub note: String,
}

impl EvidenceQuote {
    /// Build a quote from caller input, filling defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyQuoteText`] if the text is empty or whitespace.
    pub fn from_input(input: QuoteInput, linked_by: &str) -> Result<Self> {
        if input.text.trim().is_empty() {
            return Err(Error::EmptyQuoteText);
        }

        Ok(Self {
            quote_id: Self::generate_id(),
            text: input.text,
            speaker: or_unknown(input.speaker),
            speaker_role: or_unknown(input.speaker_role),
            source_id: non_blank(input.source_id),
            source_title: non_blank(input.source_title),
            source_date: non_blank(input.source_date),
            linked_at: Utc::now(),
            linked_by: if linked_by.trim().is_empty() {
                UNKNOWN_SPEAKER.to_string()
            } else {
                linked_by.to_string()
            },
            note: input.note.unwrap_or_default(),
        })
    }

    /// Generate a fresh quote identifier.
    #[must_use]
    pub fn generate_id() -> String {
        format!("q-{}", Uuid::new_v4().simple())
    }

    /// Check whether the quote has a note.
    #[must_use]
    pub fn has_note(&self) -> bool {
        !self.note.trim().is_empty()
    }

    /// Short human-readable attribution, e.g. `Jane Doe (IT Director)`.
    #[must_use]
    pub fn attribution(&self) -> String {
        if self.speaker_role == UNKNOWN_SPEAKER || self.speaker_role.is_empty() {
            self.speaker.clone()
        } else {
            format!("{} ({})", self.speaker, self.speaker_role)
        }
    }
}

fn or_unknown(value: Option<String>) -> String {
    non_blank(value).unwrap_or_else(|| UNKNOWN_SPEAKER.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_input_fills_defaults() {
        let quote = EvidenceQuote::from_input(QuoteInput::new("MFA is enforced"), "alice").unwrap();

        assert!(quote.quote_id.starts_with("q-"));
        assert_eq!(quote.text, "MFA is enforced");
        assert_eq!(quote.speaker, "Unknown");
        assert_eq!(quote.speaker_role, "Unknown");
        assert!(quote.source_id.is_none());
        assert_eq!(quote.linked_by, "alice");
        assert_eq!(quote.note, "");
        assert!(!quote.has_note());
    }

    #[test]
    fn test_from_input_keeps_attribution() {
        let input = QuoteInput::new("We rotate keys every 90 days")
            .speaker("Jane")
            .speaker_role("IT Director")
            .note("ask for the policy doc");
        let quote = EvidenceQuote::from_input(input, "bob").unwrap();

        assert_eq!(quote.speaker, "Jane");
        assert_eq!(quote.speaker_role, "IT Director");
        assert_eq!(quote.attribution(), "Jane (IT Director)");
        assert!(quote.has_note());
    }

    #[test]
    fn test_from_input_rejects_empty_text() {
        let err = EvidenceQuote::from_input(QuoteInput::new("   "), "alice").unwrap_err();
        assert!(matches!(err, Error::EmptyQuoteText));
    }

    #[test]
    fn test_blank_fields_become_defaults() {
        let mut input = QuoteInput::new("text").speaker("  ");
        input.source_title = Some(String::new());
        let quote = EvidenceQuote::from_input(input, "").unwrap();

        assert_eq!(quote.speaker, "Unknown");
        assert!(quote.source_title.is_none());
        assert_eq!(quote.linked_by, "Unknown");
    }

    #[test]
    fn test_ids_are_unique() {
        let a = EvidenceQuote::generate_id();
        let b = EvidenceQuote::generate_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_attribution_without_role() {
        let quote = EvidenceQuote::from_input(QuoteInput::new("x").speaker("Sam"), "a").unwrap();
        assert_eq!(quote.attribution(), "Sam");
    }

    #[test]
    fn test_serializes_camel_case() {
        let quote = EvidenceQuote::from_input(QuoteInput::new("x"), "a").unwrap();
        let json = serde_json::to_string(&quote).unwrap();

        assert!(json.contains("\"quoteId\""));
        assert!(json.contains("\"speakerRole\""));
        assert!(json.contains("\"linkedAt\""));
        assert!(!json.contains("sourceId"));
    }

    #[test]
    fn test_deserialize_without_note() {
        let json = r#"{
            "quoteId": "q-1",
            "text": "t",
            "speaker": "s",
            "speakerRole": "r",
            "linkedAt": "2024-05-01T12:00:00Z",
            "linkedBy": "u"
        }"#;
        let quote: EvidenceQuote = serde_json::from_str(json).unwrap();
        assert_eq!(quote.note, "");
        assert!(quote.source_date.is_none());
    }
}

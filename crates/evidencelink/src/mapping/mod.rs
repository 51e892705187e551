//! Transcript analysis: proposing quote-to-objective mappings.
//!
//! Mapping is advisory. [`TranscriptMapper::map`] returns candidates and
//! never touches the quote store; candidates are committed only when a
//! caller confirms them through the linker.
//!
//! A response that cannot be read produces an empty candidate list, but the
//! [`MappingReport`] keeps the reason so "the model found nothing" and "the
//! reply was garbage" stay distinguishable.

pub mod client;
pub mod parse;
pub mod prompt;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub use client::{Analyzer, HttpAnalyzer};
pub use parse::{parse_mapping_response, MappingParse};
pub use prompt::{build_prompt, AnalysisPrompt};

use crate::catalog::ObjectiveCatalog;
use crate::error::{Error, Result};
use crate::quote::QuoteInput;
use crate::transcript::TranscriptRecord;

/// How strongly a quote supports its objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    /// Directly demonstrates the objective.
    Strong,
    /// Supports the objective with caveats.
    Moderate,
    /// Tangential support.
    Weak,
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strong => write!(f, "strong"),
            Self::Moderate => write!(f, "moderate"),
            Self::Weak => write!(f, "weak"),
        }
    }
}

impl FromStr for Strength {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strong" => Ok(Self::Strong),
            "moderate" => Ok(Self::Moderate),
            "weak" => Ok(Self::Weak),
            other => Err(format!("unknown strength: {other}")),
        }
    }
}

/// A proposed association between a quote and an objective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingCandidate {
    /// Proposed objective.
    pub objective_id: String,
    /// Proposed evidence excerpt.
    pub quote: String,
    /// Who said it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    /// The speaker's role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_role: Option<String>,
    /// The model's note to the assessor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// How strong the evidence is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<Strength>,
    /// Control family named by the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_family: Option<String>,
    /// Whether the objective exists in the catalog; `None` without a catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_catalog: Option<bool>,
}

impl MappingCandidate {
    /// Quote input for confirming this candidate, attributed to `source`.
    #[must_use]
    pub fn to_quote_input(&self, source: Option<&TranscriptRecord>) -> QuoteInput {
        QuoteInput {
            text: self.quote.clone(),
            speaker: self.speaker.clone(),
            speaker_role: self.speaker_role.clone(),
            source_id: source.map(|t| t.id.clone()),
            source_title: source.map(|t| t.title.clone()),
            source_date: source.map(|t| t.date.clone()),
            note: self.note.clone(),
        }
    }
}

/// Input to a mapping run.
#[derive(Debug, Clone, Copy)]
pub struct MappingRequest<'a> {
    /// Raw transcript text.
    pub transcript: &'a str,
    /// Optional hint narrowing what to look for.
    pub focus_area: Option<&'a str>,
    /// Optional catalog of valid objectives.
    pub catalog: Option<&'a ObjectiveCatalog>,
}

impl<'a> MappingRequest<'a> {
    /// Request mapping of a transcript.
    #[must_use]
    pub fn new(transcript: &'a str) -> Self {
        Self {
            transcript,
            focus_area: None,
            catalog: None,
        }
    }

    /// Set the focus area.
    #[must_use]
    pub fn focus_area(mut self, focus_area: &'a str) -> Self {
        self.focus_area = Some(focus_area);
        self
    }

    /// Set the objective catalog.
    #[must_use]
    pub fn catalog(mut self, catalog: &'a ObjectiveCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }
}

/// Result of a mapping run.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingReport {
    /// Candidates proposed by the analysis.
    pub candidates: Vec<MappingCandidate>,
    /// Elements dropped for missing required fields.
    pub discarded: usize,
    /// Why the response could not be read, if it couldn't.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unparseable: Option<String>,
}

impl MappingReport {
    fn from_parse(parsed: MappingParse) -> Self {
        match parsed {
            MappingParse::Candidates {
                candidates,
                discarded,
            } => Self {
                candidates,
                discarded,
                unparseable: None,
            },
            MappingParse::Unparseable { reason } => Self {
                unparseable: Some(reason),
                ..Self::default()
            },
        }
    }

    /// Check if no candidates were proposed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Check if the analysis was read and simply found no evidence.
    #[must_use]
    pub fn found_nothing(&self) -> bool {
        self.unparseable.is_none() && self.candidates.is_empty()
    }

    /// Candidates whose objective is not in the catalog.
    pub fn unknown_objectives(&self) -> impl Iterator<Item = &MappingCandidate> {
        self.candidates
            .iter()
            .filter(|c| c.in_catalog == Some(false))
    }
}

/// Runs transcripts through an [`Analyzer`] and parses the result.
#[derive(Debug)]
pub struct TranscriptMapper<A> {
    analyzer: A,
    min_transcript_chars: usize,
}

impl<A: Analyzer> TranscriptMapper<A> {
    /// Create a mapper that rejects transcripts shorter than
    /// `min_transcript_chars` characters.
    #[must_use]
    pub fn new(analyzer: A, min_transcript_chars: usize) -> Self {
        Self {
            analyzer,
            min_transcript_chars,
        }
    }

    /// Propose mappings for a transcript.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TranscriptTooShort`] before any call is made if the
    /// trimmed transcript is below the minimum length, and propagates
    /// analyzer failures. An unreadable response is not an error.
    pub async fn map(&self, request: &MappingRequest<'_>) -> Result<MappingReport> {
        let length = request.transcript.trim().chars().count();
        if length < self.min_transcript_chars {
            return Err(Error::TranscriptTooShort {
                length,
                minimum: self.min_transcript_chars,
            });
        }

        let prompt = build_prompt(request);
        info!(
            analyzer = self.analyzer.name(),
            transcript_chars = length,
            "Analyzing transcript"
        );
        let response = self.analyzer.analyze(&prompt).await?;

        let mut report = MappingReport::from_parse(parse_mapping_response(&response));
        if let Some(reason) = &report.unparseable {
            warn!(reason = %reason, "Analysis response could not be parsed");
        }

        if let Some(catalog) = request.catalog {
            for candidate in &mut report.candidates {
                candidate.in_catalog = Some(catalog.contains(&candidate.objective_id));
            }
        }

        info!(
            candidates = report.candidates.len(),
            discarded = report.discarded,
            "Mapping complete"
        );
        Ok(report)
    }
}

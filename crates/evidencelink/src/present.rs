//! Presentation adapter for the command-line surface.
//!
//! Renders store contents and mapping candidates as plain text, tables, or
//! JSON, and turns user actions into [`QuoteLinker`] calls.

use std::fmt::Write as _;
use std::str::FromStr;

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::linker::QuoteLinker;
use crate::mapping::{MappingCandidate, MappingReport};
use crate::quote::{EvidenceQuote, QuoteInput};
use crate::storage::StorageStats;
use crate::store::{ObjectiveEvidenceIndex, StoreStats};
use crate::transcript::TranscriptRecord;

/// Width of the text column in table output.
const TABLE_TEXT_WIDTH: usize = 60;

/// A user action against the evidence index.
#[derive(Debug, Clone)]
pub enum Action {
    /// Link a manually entered quote.
    Link {
        /// Target objective.
        objective_id: String,
        /// Quote fields.
        input: QuoteInput,
    },
    /// Replace a quote's note.
    EditNote {
        /// Objective holding the quote.
        objective_id: String,
        /// Quote to edit.
        quote_id: String,
        /// New note.
        note: String,
    },
    /// Remove a quote.
    Unlink {
        /// Objective holding the quote.
        objective_id: String,
        /// Quote to remove.
        quote_id: String,
    },
    /// Commit a mapping candidate as a quote.
    ConfirmCandidate {
        /// The accepted candidate.
        candidate: MappingCandidate,
        /// Transcript the candidate came from.
        source: Option<TranscriptRecord>,
    },
}

/// What an [`Action`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// A quote was linked.
    Linked(EvidenceQuote),
    /// A note was replaced.
    NoteUpdated,
    /// A quote was removed.
    Unlinked,
    /// The target objective or quote did not exist; nothing changed.
    NotFound,
}

/// Apply a user action through the linker.
///
/// # Errors
///
/// Returns validation or storage errors from the linker.
pub fn apply(linker: &mut QuoteLinker<'_>, action: Action) -> Result<ActionOutcome> {
    match action {
        Action::Link {
            objective_id,
            input,
        } => linker
            .link_quote(&objective_id, input)
            .map(ActionOutcome::Linked),
        Action::EditNote {
            objective_id,
            quote_id,
            note,
        } => Ok(if linker.update_note(&objective_id, &quote_id, &note)? {
            ActionOutcome::NoteUpdated
        } else {
            ActionOutcome::NotFound
        }),
        Action::Unlink {
            objective_id,
            quote_id,
        } => Ok(if linker.unlink_quote(&objective_id, &quote_id)? {
            ActionOutcome::Unlinked
        } else {
            ActionOutcome::NotFound
        }),
        Action::ConfirmCandidate { candidate, source } => {
            let input = candidate.to_quote_input(source.as_ref());
            linker
                .link_quote(&candidate.objective_id, input)
                .map(ActionOutcome::Linked)
        }
    }
}

/// Which candidates the user accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every candidate.
    All,
    /// 1-based candidate numbers.
    Indices(Vec<usize>),
}

impl FromStr for Selection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }

        let mut indices = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let n: usize = part
                .parse()
                .map_err(|_| format!("invalid candidate number: {part}"))?;
            if n == 0 {
                return Err("candidate numbers start at 1".to_string());
            }
            if !indices.contains(&n) {
                indices.push(n);
            }
        }
        if indices.is_empty() {
            return Err("expected 'all' or a list like 1,3,5".to_string());
        }
        Ok(Self::Indices(indices))
    }
}

impl Selection {
    /// Pick the selected candidates, ignoring out-of-range numbers.
    #[must_use]
    pub fn pick<'r>(&self, report: &'r MappingReport) -> Vec<&'r MappingCandidate> {
        match self {
            Self::All => report.candidates.iter().collect(),
            Self::Indices(indices) => indices
                .iter()
                .filter_map(|&n| n.checked_sub(1).and_then(|i| report.candidates.get(i)))
                .collect(),
        }
    }
}

/// Render the whole evidence index.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render_index(index: &ObjectiveEvidenceIndex, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(index)?);
    }
    if index.is_empty() {
        return Ok("No evidence linked yet.\n".to_string());
    }

    let mut out = String::new();
    for (objective_id, quotes) in index {
        out.push_str(&render_quotes(objective_id, quotes, format)?);
        out.push('\n');
    }
    Ok(out)
}

/// Render the quotes linked to one objective.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render_quotes(
    objective_id: &str,
    quotes: &[EvidenceQuote],
    format: OutputFormat,
) -> Result<String> {
    let mut out = String::new();
    match format {
        OutputFormat::Json => {
            out = serde_json::to_string_pretty(quotes)?;
        }
        OutputFormat::Plain => {
            let _ = writeln!(out, "{objective_id} ({} quote(s))", quotes.len());
            for quote in quotes {
                let _ = writeln!(out, "  [{}] \"{}\"", quote.quote_id, quote.text);
                let _ = write!(out, "      {}", quote.attribution());
                if let Some(title) = &quote.source_title {
                    let _ = write!(out, ", {title}");
                }
                if let Some(date) = &quote.source_date {
                    let _ = write!(out, " ({date})");
                }
                let _ = writeln!(
                    out,
                    "; linked {} by {}",
                    quote.linked_at.format("%Y-%m-%d %H:%M"),
                    quote.linked_by
                );
                if quote.has_note() {
                    let _ = writeln!(out, "      Note: {}", quote.note);
                }
            }
        }
        OutputFormat::Table => {
            let _ = writeln!(out, "{objective_id}");
            let _ = writeln!(
                out,
                "{:<34} {:<24} {:<width$}",
                "QUOTE ID",
                "SPEAKER",
                "TEXT",
                width = TABLE_TEXT_WIDTH
            );
            for quote in quotes {
                let _ = writeln!(
                    out,
                    "{:<34} {:<24} {:<width$}",
                    quote.quote_id,
                    truncate(&quote.attribution(), 24),
                    truncate(&quote.text, TABLE_TEXT_WIDTH),
                    width = TABLE_TEXT_WIDTH
                );
            }
        }
    }
    Ok(out)
}

/// Render the transcript list.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render_transcripts(transcripts: &[TranscriptRecord], format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(transcripts)?);
    }
    if transcripts.is_empty() {
        return Ok("No transcripts stored.\n".to_string());
    }

    let mut out = String::new();
    for transcript in transcripts {
        let _ = writeln!(
            out,
            "{}  {}  {}  ({})",
            transcript.id, transcript.date, transcript.title, transcript.speaker
        );
        if format == OutputFormat::Plain {
            let _ = writeln!(out, "    {}", transcript.summary);
        }
    }
    Ok(out)
}

/// Render mapping candidates, numbered from 1 for selection.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render_candidates(report: &MappingReport, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(report)?);
    }

    let mut out = String::new();
    if let Some(reason) = &report.unparseable {
        let _ = writeln!(out, "The analysis response could not be read ({reason}).");
        let _ = writeln!(out, "No candidates were proposed; nothing was saved.");
        return Ok(out);
    }
    if report.candidates.is_empty() {
        let _ = writeln!(out, "No evidence found in this transcript.");
        return Ok(out);
    }

    for (i, candidate) in report.candidates.iter().enumerate() {
        let marker = if candidate.in_catalog == Some(false) {
            " (not in catalog)"
        } else {
            ""
        };
        let strength = candidate
            .strength
            .map(|s| format!(" [{s}]"))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "{:>3}. {}{}{}",
            i + 1,
            candidate.objective_id,
            strength,
            marker
        );
        let _ = writeln!(out, "     \"{}\"", candidate.quote);
        if let Some(speaker) = &candidate.speaker {
            match &candidate.speaker_role {
                Some(role) => {
                    let _ = writeln!(out, "     - {speaker} ({role})");
                }
                None => {
                    let _ = writeln!(out, "     - {speaker}");
                }
            }
        }
        if let Some(note) = &candidate.note {
            let _ = writeln!(out, "     Note: {note}");
        }
    }
    if report.discarded > 0 {
        let _ = writeln!(
            out,
            "({} incomplete suggestion(s) ignored)",
            report.discarded
        );
    }
    Ok(out)
}

/// Render evidence counts alongside backend statistics.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render_stats(stats: &StoreStats, storage: &StorageStats, json: bool) -> Result<String> {
    let last_linked = stats.last_linked_at.map(|t| t.to_rfc3339());
    let last_write = storage.last_updated.map(|t| t.to_rfc3339());
    if json {
        let value = serde_json::json!({
            "objectives": stats.objectives,
            "quotes": stats.quotes,
            "transcripts": stats.transcripts,
            "lastLinkedAt": last_linked,
            "storage": {
                "documents": storage.documents,
                "sizeBytes": storage.size_bytes,
                "lastWrite": last_write,
            },
        });
        return Ok(serde_json::to_string_pretty(&value)?);
    }

    let mut out = String::new();
    let _ = writeln!(out, "Objectives with evidence: {}", stats.objectives);
    let _ = writeln!(out, "Linked quotes:            {}", stats.quotes);
    let _ = writeln!(out, "Transcripts:              {}", stats.transcripts);
    let _ = writeln!(
        out,
        "Last linked:              {}",
        last_linked.as_deref().unwrap_or("never")
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "Stored documents:         {}", storage.documents);
    let _ = writeln!(out, "Storage size:             {} bytes", storage.size_bytes);
    let _ = writeln!(
        out,
        "Last write:               {}",
        last_write.as_deref().unwrap_or("never")
    );
    Ok(out)
}

fn truncate(text: &str, width: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= width {
        flat
    } else {
        let mut short: String = flat.chars().take(width.saturating_sub(3)).collect();
        short.push_str("...");
        short
    }
}

//! Parsing of analysis responses into mapping candidates.
//!
//! The model is asked for a bare JSON array but may wrap it in a markdown
//! fence or surround it with prose. Parsing strips the fence, finds the
//! first bracket-balanced span that is a JSON array of objects, and keeps
//! only the elements carrying both an `objectiveId` and a `quote`.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use super::{MappingCandidate, Strength};

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)```").expect("Invalid regex pattern")
});

/// Outcome of reading an analysis response.
#[derive(Debug, Clone, PartialEq)]
pub enum MappingParse {
    /// A JSON array was found. It may legitimately hold no candidates.
    Candidates {
        /// Elements that had both required fields.
        candidates: Vec<MappingCandidate>,
        /// Elements dropped for missing or empty required fields.
        discarded: usize,
    },
    /// No JSON array could be read from the response.
    Unparseable {
        /// What was wrong with the response.
        reason: String,
    },
}

impl MappingParse {
    /// The candidates, or nothing if the response was unparseable.
    #[must_use]
    pub fn into_candidates(self) -> Vec<MappingCandidate> {
        match self {
            Self::Candidates { candidates, .. } => candidates,
            Self::Unparseable { .. } => Vec::new(),
        }
    }

    /// Check if the response could not be read.
    #[must_use]
    pub fn is_unparseable(&self) -> bool {
        matches!(self, Self::Unparseable { .. })
    }
}

/// Parse an analysis response.
#[must_use]
pub fn parse_mapping_response(text: &str) -> MappingParse {
    if text.trim().is_empty() {
        return MappingParse::Unparseable {
            reason: "response was empty".to_string(),
        };
    }

    let body = strip_code_fence(text);
    let Some(elements) = extract_first_array(body).or_else(|| extract_first_array(text)) else {
        return MappingParse::Unparseable {
            reason: "no JSON array found in response".to_string(),
        };
    };

    let total = elements.len();
    let candidates: Vec<MappingCandidate> = elements.iter().filter_map(to_candidate).collect();
    let discarded = total - candidates.len();

    debug!(kept = candidates.len(), discarded, "Parsed mapping response");
    MappingParse::Candidates {
        candidates,
        discarded,
    }
}

/// Return the contents of the first fenced block, or the text unchanged.
#[must_use]
pub fn strip_code_fence(text: &str) -> &str {
    CODE_FENCE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map_or(text, |m| m.as_str())
}

/// Find the first bracket-balanced span that parses as a JSON array of
/// objects, or as an empty array.
///
/// Arrays holding no objects at all, like a "[1]" citation in prose, are
/// skipped.
fn extract_first_array(text: &str) -> Option<Vec<Value>> {
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find('[') {
        let start = search_from + offset;
        if let Some(end) = matching_bracket(text, start) {
            let span = &text[start..=end];
            match serde_json::from_str::<Vec<Value>>(span) {
                Ok(elements) if elements.is_empty() || elements.iter().any(Value::is_object) => {
                    return Some(elements);
                }
                Ok(_) => trace!(array = span, "Skipping array without objects"),
                Err(e) => trace!(error = %e, "Bracketed span is not a JSON array"),
            }
        }
        search_from = start + 1;
    }
    None
}

/// Byte index of the `]` closing the `[` at `start`, skipping string contents.
fn matching_bracket(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + i);
                }
            }
            _ => {}
        }
    }
    None
}

fn to_candidate(value: &Value) -> Option<MappingCandidate> {
    let object = value.as_object()?;
    let objective_id = string_field(object, "objectiveId")?;
    let quote = string_field(object, "quote")?;

    Some(MappingCandidate {
        objective_id,
        quote,
        speaker: string_field(object, "speaker"),
        speaker_role: string_field(object, "speakerRole"),
        note: string_field(object, "assessorNote").or_else(|| string_field(object, "note")),
        strength: string_field(object, "strength").and_then(|s| s.parse::<Strength>().ok()),
        control_family: string_field(object, "controlFamily"),
        in_catalog: None,
    })
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(text: &str) -> Vec<MappingCandidate> {
        parse_mapping_response(text).into_candidates()
    }

    #[test]
    fn test_plain_array() {
        let text = r#"[{"objectiveId": "IA.L2-3.5.1", "quote": "Every user has a unique ID", "speaker": "Sam", "strength": "strong"}]"#;
        let parsed = candidates(text);

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].objective_id, "IA.L2-3.5.1");
        assert_eq!(parsed[0].quote, "Every user has a unique ID");
        assert_eq!(parsed[0].speaker.as_deref(), Some("Sam"));
        assert_eq!(parsed[0].strength, Some(Strength::Strong));
    }

    #[test]
    fn test_fenced_array_with_prose() {
        let text = "Here is the mapping:\n```json\n[\n  {\"objectiveId\": \"AC.L1-3.1.1\", \"quote\": \"Accounts need a ticket\"}\n]\n```\nLet me know if you need more.";
        let parsed = candidates(text);

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].objective_id, "AC.L1-3.1.1");
    }

    #[test]
    fn test_unfenced_array_after_prose_with_brackets() {
        let text = r#"I looked at [several] sections. [{"objectiveId": "A", "quote": "q"}]"#;
        let parsed = candidates(text);

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].objective_id, "A");
    }

    #[test]
    fn test_citation_arrays_in_prose_are_skipped() {
        let text = r#"Per sections [1] and [2, 3] of the policy: [{"objectiveId": "IA.L2-3.5.1", "quote": "Keys rotate every 90 days"}]"#;
        let parsed = candidates(text);

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].quote, "Keys rotate every 90 days");
    }

    #[test]
    fn test_only_citation_arrays_is_unparseable() {
        assert!(parse_mapping_response("See [1] and [\"a\"].").is_unparseable());
    }

    #[test]
    fn test_brackets_inside_strings() {
        let text = r#"[{"objectiveId": "A", "quote": "we use [MFA] and \"strong ]\" passwords"}]"#;
        let parsed = candidates(text);

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].quote, "we use [MFA] and \"strong ]\" passwords");
    }

    #[test]
    fn test_not_json_is_unparseable() {
        let parsed = parse_mapping_response("not json");
        assert!(parsed.is_unparseable());
        assert!(parsed.into_candidates().is_empty());
    }

    #[test]
    fn test_empty_response_is_unparseable() {
        assert!(parse_mapping_response("   ").is_unparseable());
    }

    #[test]
    fn test_unbalanced_array_is_unparseable() {
        let parsed = parse_mapping_response(r#"[{"objectiveId": "A", "quote": "q"}"#);
        assert!(parsed.is_unparseable());
    }

    #[test]
    fn test_elements_without_required_fields_are_discarded() {
        let text = r#"[
            {"quote": "no objective"},
            {"objectiveId": "B"},
            {"objectiveId": "", "quote": "empty id"},
            {"objectiveId": 7, "quote": "numeric id"},
            "a bare string",
            {"objectiveId": "C", "quote": "kept"}
        ]"#;

        match parse_mapping_response(text) {
            MappingParse::Candidates {
                candidates,
                discarded,
            } => {
                assert_eq!(candidates.len(), 1);
                assert_eq!(candidates[0].objective_id, "C");
                assert_eq!(discarded, 5);
            }
            MappingParse::Unparseable { reason } => panic!("unexpected: {reason}"),
        }
    }

    #[test]
    fn test_array_lacking_objective_ids_yields_empty() {
        let parsed = parse_mapping_response(r#"[{"quote": "a"}, {"quote": "b"}]"#);
        assert!(!parsed.is_unparseable());
        assert!(parsed.into_candidates().is_empty());
    }

    #[test]
    fn test_empty_array_is_found_nothing() {
        let parsed = parse_mapping_response("[]");
        assert_eq!(
            parsed,
            MappingParse::Candidates {
                candidates: Vec::new(),
                discarded: 0
            }
        );
    }

    #[test]
    fn test_assessor_note_preferred_over_note() {
        let text = r#"[
            {"objectiveId": "A", "quote": "q1", "assessorNote": "primary", "note": "secondary"},
            {"objectiveId": "B", "quote": "q2", "note": "fallback"}
        ]"#;
        let parsed = candidates(text);

        assert_eq!(parsed[0].note.as_deref(), Some("primary"));
        assert_eq!(parsed[1].note.as_deref(), Some("fallback"));
    }

    #[test]
    fn test_unknown_strength_dropped() {
        let text = r#"[{"objectiveId": "A", "quote": "q", "strength": "overwhelming"},
                       {"objectiveId": "B", "quote": "q", "strength": "Weak"}]"#;
        let parsed = candidates(text);

        assert_eq!(parsed[0].strength, None);
        assert_eq!(parsed[1].strength, Some(Strength::Weak));
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n[1]\n```").trim(), "[1]");
        assert_eq!(strip_code_fence("```\n[2]```").trim(), "[2]");
        assert_eq!(strip_code_fence("[3]"), "[3]");
    }

    #[test]
    fn test_fence_without_array_falls_back_to_full_text() {
        let text = "```\nno array here\n```\n[{\"objectiveId\": \"A\", \"quote\": \"q\"}]";
        assert_eq!(candidates(text).len(), 1);
    }

    #[test]
    fn test_control_family_and_role() {
        let text = r#"[{"objectiveId": "A", "quote": "q", "speakerRole": "CISO", "controlFamily": "Access Control"}]"#;
        let parsed = candidates(text);

        assert_eq!(parsed[0].speaker_role.as_deref(), Some("CISO"));
        assert_eq!(parsed[0].control_family.as_deref(), Some("Access Control"));
        assert_eq!(parsed[0].in_catalog, None);
    }
}

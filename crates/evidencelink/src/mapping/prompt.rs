//! Prompt construction for transcript analysis.

use std::fmt::Write as _;

use super::MappingRequest;

/// The two parts of an analysis request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisPrompt {
    /// Standing instructions for the model.
    pub system: String,
    /// The task, including the transcript.
    pub user: String,
}

const SYSTEM_PROMPT: &str = "You are assisting a compliance assessor reviewing interview \
transcripts for evidence that CMMC / NIST SP 800-171 control objectives are met. \
Only quote text that appears verbatim in the transcript. Respond with a JSON array and \
nothing else.";

const RESPONSE_CONTRACT: &str = r#"Return ONLY a JSON array. Each element must be an object with:
  "objectiveId"   (required) the control objective identifier
  "quote"         (required) the exact excerpt from the transcript
  "speaker"       (optional) who said it
  "speakerRole"   (optional) the speaker's role or title
  "assessorNote"  (optional) why this quote is relevant
  "strength"      (optional) one of "strong", "moderate", "weak"
  "controlFamily" (optional) the control family name
If the transcript contains no relevant evidence, return [].
Do not wrap the array in markdown and do not add commentary."#;

/// Build the prompt for a mapping request.
#[must_use]
pub fn build_prompt(request: &MappingRequest<'_>) -> AnalysisPrompt {
    let mut user = String::new();

    user.push_str(
        "Identify statements in the transcript below that serve as evidence for \
         compliance control objectives.\n\n",
    );

    if let Some(focus) = request.focus_area.map(str::trim).filter(|f| !f.is_empty()) {
        let _ = writeln!(user, "Focus on the following area: {focus}\n");
    }

    if let Some(catalog) = request.catalog.filter(|c| !c.is_empty()) {
        user.push_str("Use only these objective identifiers:\n");
        for entry in catalog.entries() {
            let _ = writeln!(user, "- {}: {}", entry.objective_id, entry.text);
        }
        user.push('\n');
    }

    user.push_str(RESPONSE_CONTRACT);
    user.push_str("\n\n<transcript>\n");
    user.push_str(request.transcript.trim());
    user.push_str("\n</transcript>\n");

    AnalysisPrompt {
        system: SYSTEM_PROMPT.to_string(),
        user,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ObjectiveCatalog;

    #[test]
    fn test_prompt_contains_contract_and_transcript() {
        let request = MappingRequest::new("  We enforce MFA for all admins.  ");
        let prompt = build_prompt(&request);

        assert!(prompt.system.contains("JSON array"));
        assert!(prompt.user.contains("\"objectiveId\""));
        assert!(prompt.user.contains("\"strength\""));
        assert!(prompt
            .user
            .contains("<transcript>\nWe enforce MFA for all admins.\n</transcript>"));
        assert!(!prompt.user.contains("Focus on"));
        assert!(!prompt.user.contains("Use only these"));
    }

    #[test]
    fn test_prompt_includes_focus_area() {
        let request = MappingRequest::new("text").focus_area("Identification and Authentication");
        let prompt = build_prompt(&request);

        assert!(prompt
            .user
            .contains("Focus on the following area: Identification and Authentication"));
    }

    #[test]
    fn test_blank_focus_area_ignored() {
        let request = MappingRequest::new("text").focus_area("   ");
        assert!(!build_prompt(&request).user.contains("Focus on"));
    }

    #[test]
    fn test_prompt_lists_catalog() {
        let catalog = ObjectiveCatalog::from_json_str(
            r#"{"IA": {"IA.L2-3.5.1": {"IA.L2-3.5.1[a]": "system users are identified"}}}"#,
        )
        .unwrap();
        let request = MappingRequest::new("text").catalog(&catalog);
        let prompt = build_prompt(&request);

        assert!(prompt
            .user
            .contains("- IA.L2-3.5.1[a]: system users are identified"));
    }
}

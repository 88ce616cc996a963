//! Cover letter generation for a tracked posting.

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::prompts::{COVER_LETTER_PROMPT_TEMPLATE, COVER_LETTER_SYSTEM};
use crate::generation::tone::Tone;
use crate::llm_client::prompts::{GROUNDING_INSTRUCTION, PLAIN_OUTPUT_INSTRUCTION};
use crate::llm_client::LlmClient;
use crate::models::job::JobRow;

/// Longest description slice sent to the model, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 6000;

#[derive(Debug, Clone, Deserialize)]
pub struct CoverLetterRequest {
    pub user_id: Uuid,
    pub candidate_summary: String,
    #[serde(default)]
    pub tone: Tone,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoverLetterResponse {
    pub cover_letter: String,
    pub provider: String,
    pub model: String,
}

/// Cuts `text` to at most `max` characters on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

pub fn build_prompt(job: &JobRow, candidate_summary: &str, tone: Tone) -> String {
    let guide = tone.guide();
    let description = truncate_chars(job.description.trim(), MAX_DESCRIPTION_CHARS);
    let location = match (&job.location, job.remote) {
        (Some(loc), true) => format!("{loc} (remote)"),
        (Some(loc), false) => loc.clone(),
        (None, true) => "Remote".to_string(),
        (None, false) => "Not specified".to_string(),
    };

    COVER_LETTER_PROMPT_TEMPLATE
        .replace("{grounding_instruction}", GROUNDING_INSTRUCTION)
        .replace("{output_instruction}", PLAIN_OUTPUT_INSTRUCTION)
        .replace("{tone}", tone.as_str())
        .replace("{tone_description}", guide.description)
        .replace("{min_words}", &guide.target_words.0.to_string())
        .replace("{max_words}", &guide.target_words.1.to_string())
        .replace("{avoid}", &guide.avoid.join(", "))
        .replace("{title}", &job.title)
        .replace("{company}", &job.company)
        .replace("{location}", &location)
        .replace("{description}", description)
        .replace("{candidate_summary}", candidate_summary.trim())
}

pub async fn generate_cover_letter(
    llm: &LlmClient,
    job: &JobRow,
    request: &CoverLetterRequest,
) -> Result<CoverLetterResponse, AppError> {
    if request.candidate_summary.trim().is_empty() {
        return Err(AppError::Validation(
            "candidate_summary cannot be empty".to_string(),
        ));
    }

    let prompt = build_prompt(job, &request.candidate_summary, request.tone);
    let cover_letter = llm
        .call_text(&prompt, COVER_LETTER_SYSTEM)
        .await
        .map_err(|e| AppError::Llm(e.to_string()))?;

    let provider = llm.provider();
    info!(
        "Generated {} cover letter for job {} via {provider}",
        request.tone.as_str(),
        job.id
    );

    Ok(CoverLetterResponse {
        cover_letter,
        provider: provider.as_str().to_string(),
        model: provider.model().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn job(description: &str) -> JobRow {
        let now = Utc::now();
        JobRow {
            id: Uuid::new_v4(),
            source: "greenhouse:acme".into(),
            external_id: "42".into(),
            title: "Senior Rust Engineer".into(),
            company: "Acme".into(),
            location: Some("Berlin".into()),
            remote: true,
            url: "https://acme.io/jobs/42".into(),
            description: description.into(),
            salary: None,
            tags: vec![],
            posted_at: None,
            duplicate_of: None,
            similarity: None,
            created_at: now,
        }
    }

    #[test]
    fn test_prompt_includes_posting_and_summary() {
        let prompt = build_prompt(
            &job("Build streaming pipelines in Rust."),
            "  Eight years of backend work, mostly Rust and Kafka.  ",
            Tone::Concise,
        );
        assert!(prompt.contains("POSITION: Senior Rust Engineer"));
        assert!(prompt.contains("COMPANY: Acme"));
        assert!(prompt.contains("LOCATION: Berlin (remote)"));
        assert!(prompt.contains("Build streaming pipelines in Rust."));
        assert!(prompt.contains("CANDIDATE SUMMARY:\nEight years of backend work"));
        assert!(prompt.contains("TONE: concise"));
        assert!(prompt.contains("120-180 words"));
        assert!(!prompt.contains('{'));
    }

    #[test]
    fn test_long_description_is_truncated() {
        let long = "é".repeat(MAX_DESCRIPTION_CHARS + 500);
        let prompt = build_prompt(&job(&long), "summary", Tone::Professional);
        let kept = prompt.matches('é').count();
        assert_eq!(kept, MAX_DESCRIPTION_CHARS);
    }

    #[test]
    fn test_truncate_chars_short_input_untouched() {
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abcdef", 3), "abc");
    }

    #[test]
    fn test_request_defaults_tone() {
        let request: CoverLetterRequest = serde_json::from_value(serde_json::json!({
            "user_id": Uuid::nil(),
            "candidate_summary": "Rust engineer"
        }))
        .unwrap();
        assert_eq!(request.tone, Tone::Professional);
    }

    #[tokio::test]
    async fn test_empty_summary_rejected_before_calling_provider() {
        let llm = LlmClient::new(crate::llm_client::Provider::Anthropic, "sk-test".into());
        let request = CoverLetterRequest {
            user_id: Uuid::nil(),
            candidate_summary: "   ".into(),
            tone: Tone::Concise,
        };
        let err = generate_cover_letter(&llm, &job("desc"), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}

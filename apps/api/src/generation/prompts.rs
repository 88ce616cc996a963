// Prompt constants for cover letter generation.
// Reuses cross-cutting fragments from llm_client::prompts.

pub const COVER_LETTER_SYSTEM: &str = "You are an experienced career coach writing \
    cover letters for software engineers. You write specific, honest letters that \
    connect the candidate's real experience to the posting's stated needs.";

/// Replace: {grounding_instruction}, {output_instruction}, {tone}, {tone_description},
///          {min_words}, {max_words}, {avoid}, {title}, {company}, {location},
///          {description}, {candidate_summary}
pub const COVER_LETTER_PROMPT_TEMPLATE: &str = r#"{grounding_instruction}

Write a cover letter for the position below.

TONE: {tone} ({tone_description})
LENGTH: {min_words}-{max_words} words
AVOID these phrases: {avoid}

POSITION: {title}
COMPANY: {company}
LOCATION: {location}

JOB DESCRIPTION:
{description}

CANDIDATE SUMMARY:
{candidate_summary}

{output_instruction}"#;

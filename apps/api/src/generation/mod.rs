// Cover letter generation for tracked postings.
// All LLM calls go through llm_client; nothing here talks to a provider directly.

pub mod cover_letter;
pub mod handlers;
pub mod prompts;
pub mod tone;

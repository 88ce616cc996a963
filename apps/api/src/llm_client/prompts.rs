// Shared prompt fragments. Each service that needs LLM calls defines its own
// prompts.rs alongside it; this file holds cross-cutting pieces.

/// Instruction that keeps generated text grounded in the supplied inputs.
pub const GROUNDING_INSTRUCTION: &str = "\
    CRITICAL: Only use facts present in the candidate summary and the job posting. \
    Do NOT invent employers, degrees, metrics, or technologies. \
    If the summary does not support a claim, leave it out.";

/// Instruction that forbids wrapper text around generated documents.
pub const PLAIN_OUTPUT_INSTRUCTION: &str = "\
    Return only the document text. No preamble, no markdown headings, \
    no closing remarks about the document itself.";

// Shared prompt fragments. Each service that needs LLM calls defines its own
// prompts.rs alongside it; this file holds the cross-cutting pieces.

/// Appended to every prompt whose answer is shown to planners as real data.
pub const NO_FABRICATION_INSTRUCTION: &str = "\
    CRITICAL: Base every recommendation on the district figures provided. \
    Do NOT invent facility names that already exist, population figures, or survey results. \
    If the figures do not justify a new facility, return an empty JSON array [].";

// Cross-cutting prompt fragments.
// Each caller that needs LLM calls defines its own prompts.rs alongside it.

/// Appended to every system prompt that expects a machine-readable reply.
pub const JSON_ONLY_INSTRUCTION: &str = "\
    You MUST respond with a single valid JSON object only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

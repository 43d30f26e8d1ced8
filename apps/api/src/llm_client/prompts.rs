// Shared prompt fragments. Each module that calls the LLM keeps its own
// prompts.rs alongside it; this file holds the cross-cutting pieces.

/// System prompt that pins the model to bare JSON output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON value. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

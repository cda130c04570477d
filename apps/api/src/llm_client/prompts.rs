// Shared prompt constants.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// System prompt fragment for calls whose reply is handed to the user verbatim.
pub const VERBATIM_OUTPUT_SYSTEM: &str = "Reply with the requested text only. \
    Do NOT add a preamble, a closing remark, or commentary about what you changed.";

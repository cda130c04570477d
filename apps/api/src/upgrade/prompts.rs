// All LLM prompt constants for the upgrade module.
// The upgrade instruction itself is rendered by `compiler`; only the fixed
// framing lives here.

use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, VERBATIM_OUTPUT_SYSTEM};

/// System prompt for prompt analysis. Replies are normalized, never trusted.
pub fn analysis_system() -> String {
    format!("You are an expert prompt engineer who grades AI prompts. {JSON_ONLY_SYSTEM}")
}

/// System prompt for the upgrade call.
pub fn upgrade_system() -> String {
    format!(
        "You are an expert prompt engineer who rewrites prompts to get better results \
         from AI assistants. {VERBATIM_OUTPUT_SYSTEM}"
    )
}

/// Analysis prompt template. Replace `{prompt}` before sending.
pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"Analyze the following AI prompt and grade its quality.

Return a JSON object with this EXACT schema (no extra fields):
{
  "clarity": 7,
  "specificity": 6,
  "effectiveness": 7,
  "creativity": 5,
  "structure": 6,
  "coherence": 7,
  "readability": 8,
  "languageQuality": 7,
  "contextualRichness": 5,
  "tokenCount": 42,
  "estimatedCost": 0.0001,
  "strengths": ["States the goal directly"],
  "weaknesses": ["Does not name the target language"],
  "suggestions": ["Specify the expected output format"],
  "estimatedPerformance": "fair",
  "complexity": "medium"
}

Rules:
- Every score is an integer from 1 (very poor) to 10 (excellent).
- "estimatedPerformance" is one of "poor", "fair", "good", "excellent".
- "complexity" is one of "low", "medium", "high", "very-high".
- "weaknesses" must name concrete, fixable problems. They are fed back into the rewrite.
- Give between one and five items for each of strengths, weaknesses, and suggestions.

PROMPT TO ANALYZE:
"""
{prompt}
""""#;

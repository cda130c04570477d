//! Analysis normalizer: turns whatever the provider sent back into a `PromptAnalysis`.
//!
//! The provider reply is untrusted. It may be:
//! - text with a JSON object buried in it
//! - an object shaped (loosely) like `PromptAnalysis`
//! - the legacy `{summary, codeQuality, performance}` shape
//!
//! Normalization never fails. Every path that cannot make sense of the input
//! lands on `fallback_analysis()`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// USD per 1,000 tokens used for the cost heuristic.
pub const COST_PER_1K_TOKENS: f64 = 0.002;

const SCORE_MIN: u8 = 1;
const SCORE_MAX: u8 = 10;
const MISSING_SCORE: u8 = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimatedPerformance {
    Poor,
    #[default]
    Fair,
    Good,
    Excellent,
}

impl EstimatedPerformance {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Poor => "poor",
            Self::Fair => "fair",
            Self::Good => "good",
            Self::Excellent => "excellent",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "poor" => Some(Self::Poor),
            "fair" => Some(Self::Fair),
            "good" => Some(Self::Good),
            "excellent" => Some(Self::Excellent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Complexity {
    Low,
    #[default]
    Medium,
    High,
    VeryHigh,
}

impl Complexity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::VeryHigh => "very-high",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "very-high" => Some(Self::VeryHigh),
            _ => None,
        }
    }
}

/// Quality assessment of a prompt. Every score is in [1, 10].
///
/// Deserialization goes through `normalize_analysis`, so an analysis posted by
/// a client or read back from storage obeys the same bounds as one built from
/// a provider reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptAnalysis {
    pub clarity: u8,
    pub specificity: u8,
    pub effectiveness: u8,
    pub creativity: u8,
    pub structure: u8,
    pub coherence: u8,
    pub readability: u8,
    pub language_quality: u8,
    pub contextual_richness: u8,
    pub token_count: u64,
    pub estimated_cost: f64,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub suggestions: Vec<String>,
    pub estimated_performance: EstimatedPerformance,
    pub complexity: Complexity,
}

impl PromptAnalysis {
    /// `(label, score)` for the nine score dimensions, in display order.
    pub fn scores(&self) -> [(&'static str, u8); 9] {
        [
            ("Clarity", self.clarity),
            ("Specificity", self.specificity),
            ("Effectiveness", self.effectiveness),
            ("Creativity", self.creativity),
            ("Structure", self.structure),
            ("Coherence", self.coherence),
            ("Readability", self.readability),
            ("Language quality", self.language_quality),
            ("Contextual richness", self.contextual_richness),
        ]
    }

    /// Mean of the nine scores, rounded to one decimal.
    pub fn overall_score(&self) -> f64 {
        let sum: u32 = self.scores().iter().map(|(_, s)| *s as u32).sum();
        (sum as f64 / 9.0 * 10.0).round() / 10.0
    }
}

impl<'de> Deserialize<'de> for PromptAnalysis {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(normalize_analysis)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Estimators
// ────────────────────────────────────────────────────────────────────────────

/// Rough token count: one token per four characters, rounded up.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}

/// Rough USD cost for `tokens` at `COST_PER_1K_TOKENS`.
pub fn estimate_cost(tokens: u64) -> f64 {
    tokens as f64 / 1000.0 * COST_PER_1K_TOKENS
}

// ────────────────────────────────────────────────────────────────────────────
// Fallback
// ────────────────────────────────────────────────────────────────────────────

/// The record returned whenever the provider reply cannot be interpreted.
pub fn fallback_analysis() -> PromptAnalysis {
    PromptAnalysis {
        clarity: 6,
        specificity: 6,
        effectiveness: 6,
        creativity: 5,
        structure: 6,
        coherence: 6,
        readability: 6,
        language_quality: 6,
        contextual_richness: 5,
        token_count: 0,
        estimated_cost: 0.0,
        strengths: vec!["Prompt received for analysis".to_string()],
        weaknesses: vec![
            "Detailed analysis was unavailable for this prompt".to_string(),
            "Consider adding more specific requirements and context".to_string(),
        ],
        suggestions: vec!["Retry the analysis to get tailored suggestions".to_string()],
        estimated_performance: EstimatedPerformance::Fair,
        complexity: Complexity::Medium,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Payload shapes
// ────────────────────────────────────────────────────────────────────────────

/// The shapes a provider reply can take.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisPayload {
    /// Free text that may contain a JSON object.
    Text(String),
    /// `{summary, codeQuality, performance}`.
    Legacy(Map<String, Value>),
    /// Loosely `PromptAnalysis`-shaped object.
    Modern(Map<String, Value>),
}

impl AnalysisPayload {
    /// Resolves the shape of a reply. `None` for null, arrays and scalars.
    pub fn classify(value: Value) -> Option<Self> {
        match value {
            Value::String(text) => Some(Self::Text(text)),
            Value::Object(map) if map.contains_key("summary") => Some(Self::Legacy(map)),
            Value::Object(map) => Some(Self::Modern(map)),
            _ => None,
        }
    }
}

/// Normalizes a provider reply of any shape. Never fails.
pub fn normalize_analysis(response: Value) -> PromptAnalysis {
    match AnalysisPayload::classify(response) {
        Some(AnalysisPayload::Text(text)) => normalize_analysis_text(&text),
        Some(AnalysisPayload::Legacy(map)) => from_legacy(&map),
        Some(AnalysisPayload::Modern(map)) => from_modern(&map),
        None => {
            warn!("Analysis payload is not an object or string, using fallback analysis");
            fallback_analysis()
        }
    }
}

/// Normalizes a raw text reply by parsing the first JSON object inside it.
pub fn normalize_analysis_text(text: &str) -> PromptAnalysis {
    let Some(candidate) = extract_first_json_object(text) else {
        warn!("No JSON object found in analysis reply, using fallback analysis");
        return fallback_analysis();
    };

    match serde_json::from_str::<Value>(candidate) {
        Ok(value @ Value::Object(_)) => normalize_analysis(value),
        Ok(_) => fallback_analysis(),
        Err(e) => {
            warn!("Analysis reply JSON did not parse ({e}), using fallback analysis");
            fallback_analysis()
        }
    }
}

/// Returns the first balanced `{...}` region of `text`.
///
/// Braces inside JSON string literals are ignored, including escaped quotes.
pub fn extract_first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

// ────────────────────────────────────────────────────────────────────────────
// Shape conversions
// ────────────────────────────────────────────────────────────────────────────

fn from_modern(map: &Map<String, Value>) -> PromptAnalysis {
    let token_count = map
        .get("tokenCount")
        .and_then(as_number)
        .map(|n| n.max(0.0).round() as u64)
        .unwrap_or(0);
    let estimated_cost = map
        .get("estimatedCost")
        .and_then(as_number)
        .filter(|c| c.is_finite())
        .map(|c| c.max(0.0))
        .unwrap_or_else(|| estimate_cost(token_count));

    PromptAnalysis {
        clarity: score(map.get("clarity"), MISSING_SCORE),
        specificity: score(map.get("specificity"), MISSING_SCORE),
        effectiveness: score(map.get("effectiveness"), MISSING_SCORE),
        creativity: score(map.get("creativity"), MISSING_SCORE),
        structure: score(map.get("structure"), MISSING_SCORE),
        coherence: score(map.get("coherence"), MISSING_SCORE),
        readability: score(map.get("readability"), MISSING_SCORE),
        language_quality: score(map.get("languageQuality"), MISSING_SCORE),
        contextual_richness: score(map.get("contextualRichness"), MISSING_SCORE),
        token_count,
        estimated_cost,
        strengths: string_list(map.get("strengths"), "No specific strengths identified"),
        weaknesses: string_list(map.get("weaknesses"), "No specific weaknesses identified"),
        suggestions: string_list(map.get("suggestions"), "No specific suggestions provided"),
        estimated_performance: map
            .get("estimatedPerformance")
            .and_then(Value::as_str)
            .and_then(EstimatedPerformance::parse)
            .unwrap_or_default(),
        complexity: map
            .get("complexity")
            .and_then(Value::as_str)
            .and_then(Complexity::parse)
            .unwrap_or_default(),
    }
}

fn from_legacy(map: &Map<String, Value>) -> PromptAnalysis {
    debug!("Normalizing legacy-shaped analysis payload");
    let summary = map.get("summary").and_then(Value::as_str).unwrap_or("");
    let code_quality = map.get("codeQuality");
    let performance = map.get("performance");
    let quality = |key: &str| code_quality.and_then(|q| q.get(key));

    let token_count = estimate_tokens(summary);

    PromptAnalysis {
        clarity: score(quality("clarity"), 7),
        specificity: score(quality("specificity"), 6),
        effectiveness: score(quality("effectiveness"), 7),
        creativity: 6,
        structure: 7,
        coherence: 7,
        readability: 7,
        language_quality: 7,
        contextual_richness: 6,
        token_count,
        estimated_cost: estimate_cost(token_count),
        strengths: string_list(quality("strengths"), "Clear intent"),
        weaknesses: string_list(quality("improvements"), "Could be more specific"),
        suggestions: string_list(
            performance.and_then(|p| p.get("optimizations")),
            "Add more context and constraints",
        ),
        estimated_performance: EstimatedPerformance::Good,
        complexity: Complexity::Medium,
    }
}

/// Numbers and numeric strings are accepted.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Rounds and clamps into [1, 10]; `default` when missing or non-numeric.
fn score(value: Option<&Value>, default: u8) -> u8 {
    match value.and_then(as_number).filter(|n| !n.is_nan()) {
        Some(n) => n.round().clamp(SCORE_MIN as f64, SCORE_MAX as f64) as u8,
        None => default,
    }
}

/// Keeps the string elements of an array; a one-element placeholder otherwise.
fn string_list(value: Option<&Value>, placeholder: &str) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => {
            let strings: Vec<String> = items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect();
            if strings.is_empty() && !items.is_empty() {
                vec![placeholder.to_string()]
            } else {
                strings
            }
        }
        _ => vec![placeholder.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SCORE_KEYS: [&str; 9] = [
        "clarity",
        "specificity",
        "effectiveness",
        "creativity",
        "structure",
        "coherence",
        "readability",
        "languageQuality",
        "contextualRichness",
    ];

    fn score_of(analysis: &PromptAnalysis, key: &str) -> u8 {
        let value = serde_json::to_value(analysis).unwrap();
        value[key].as_u64().unwrap() as u8
    }

    #[test]
    fn test_clamps_high_scores_to_ten() {
        for key in SCORE_KEYS {
            let analysis = normalize_analysis(json!({ key: 15 }));
            assert_eq!(score_of(&analysis, key), 10, "{key}");
        }
    }

    #[test]
    fn test_clamps_low_scores_to_one() {
        for key in SCORE_KEYS {
            let analysis = normalize_analysis(json!({ key: -3 }));
            assert_eq!(score_of(&analysis, key), 1, "{key}");
        }
    }

    #[test]
    fn test_missing_scores_default_to_five() {
        let analysis = normalize_analysis(json!({}));
        for key in SCORE_KEYS {
            assert_eq!(score_of(&analysis, key), 5, "{key}");
        }
    }

    #[test]
    fn test_non_numeric_score_defaults_to_five() {
        let analysis = normalize_analysis(json!({ "clarity": "very clear", "structure": null }));
        assert_eq!(analysis.clarity, 5);
        assert_eq!(analysis.structure, 5);
    }

    #[test]
    fn test_numeric_strings_and_fractions_are_rounded() {
        let analysis = normalize_analysis(json!({ "clarity": "8", "coherence": 7.6 }));
        assert_eq!(analysis.clarity, 8);
        assert_eq!(analysis.coherence, 8);
    }

    #[test]
    fn test_unknown_performance_falls_back_to_fair() {
        let analysis = normalize_analysis(json!({ "estimatedPerformance": "amazing" }));
        assert_eq!(analysis.estimated_performance, EstimatedPerformance::Fair);
    }

    #[test]
    fn test_unknown_complexity_falls_back_to_medium() {
        let analysis = normalize_analysis(json!({ "complexity": "extreme" }));
        assert_eq!(analysis.complexity, Complexity::Medium);
        let analysis = normalize_analysis(json!({ "complexity": "very-high" }));
        assert_eq!(analysis.complexity, Complexity::VeryHigh);
    }

    #[test]
    fn test_null_returns_fallback() {
        assert_eq!(normalize_analysis(Value::Null), fallback_analysis());
    }

    #[test]
    fn test_non_object_values_return_fallback() {
        assert_eq!(normalize_analysis(json!([1, 2, 3])), fallback_analysis());
        assert_eq!(normalize_analysis(json!(42)), fallback_analysis());
        assert_eq!(normalize_analysis(json!(true)), fallback_analysis());
    }

    #[test]
    fn test_fallback_shape() {
        let fallback = fallback_analysis();
        assert_eq!(fallback.clarity, 6);
        assert_eq!(fallback.creativity, 5);
        assert_eq!(fallback.contextual_richness, 5);
        assert_eq!(fallback.weaknesses.len(), 2);
        assert_eq!(fallback.estimated_performance, EstimatedPerformance::Fair);
        assert_eq!(fallback.complexity, Complexity::Medium);
    }

    #[test]
    fn test_legacy_shape_maps_code_quality() {
        let summary = "A short prompt asking for a sorting function.";
        let analysis = normalize_analysis(json!({
            "summary": summary,
            "codeQuality": { "clarity": 9 }
        }));
        assert_eq!(analysis.clarity, 9);
        assert_eq!(analysis.specificity, 6);
        assert_eq!(analysis.effectiveness, 7);
        assert_eq!(analysis.token_count, estimate_tokens(summary));
        assert_eq!(analysis.strengths.len(), 1);
        assert_eq!(analysis.suggestions.len(), 1);
    }

    #[test]
    fn test_legacy_shape_maps_lists() {
        let analysis = normalize_analysis(json!({
            "summary": "s",
            "codeQuality": {
                "strengths": ["concise"],
                "improvements": ["name the language", "state the input size"]
            },
            "performance": { "optimizations": "not a list" }
        }));
        assert_eq!(analysis.strengths, vec!["concise"]);
        assert_eq!(analysis.weaknesses.len(), 2);
        assert_eq!(analysis.suggestions, vec!["Add more context and constraints"]);
    }

    #[test]
    fn test_legacy_scores_are_clamped() {
        let analysis = normalize_analysis(json!({
            "summary": "",
            "codeQuality": { "clarity": 42, "effectiveness": 0 }
        }));
        assert_eq!(analysis.clarity, 10);
        assert_eq!(analysis.effectiveness, 1);
        assert_eq!(analysis.token_count, 0);
    }

    #[test]
    fn test_string_lists_filter_non_strings() {
        let analysis = normalize_analysis(json!({
            "strengths": ["good", 3, null, "clear"],
            "weaknesses": [1, 2],
            "suggestions": []
        }));
        assert_eq!(analysis.strengths, vec!["good", "clear"]);
        assert_eq!(analysis.weaknesses, vec!["No specific weaknesses identified"]);
        assert!(analysis.suggestions.is_empty());
    }

    #[test]
    fn test_token_count_and_cost() {
        let analysis = normalize_analysis(json!({ "tokenCount": 1500 }));
        assert_eq!(analysis.token_count, 1500);
        assert!((analysis.estimated_cost - 0.003).abs() < 1e-12);

        let analysis = normalize_analysis(json!({ "tokenCount": -20, "estimatedCost": -1.0 }));
        assert_eq!(analysis.token_count, 0);
        assert_eq!(analysis.estimated_cost, 0.0);
    }

    #[test]
    fn test_text_reply_with_embedded_json() {
        let reply = r#"Here is the analysis:
{"clarity": 8, "weaknesses": ["no {output} format given"], "estimatedPerformance": "good"}
Let me know if you need more."#;
        let analysis = normalize_analysis(Value::String(reply.to_string()));
        assert_eq!(analysis.clarity, 8);
        assert_eq!(analysis.weaknesses, vec!["no {output} format given"]);
        assert_eq!(analysis.estimated_performance, EstimatedPerformance::Good);
    }

    #[test]
    fn test_text_reply_can_be_legacy_shaped() {
        let reply = r#"{"summary": "ok", "codeQuality": {"clarity": 2}}"#;
        assert_eq!(normalize_analysis_text(reply).clarity, 2);
    }

    #[test]
    fn test_text_reply_without_json_returns_fallback() {
        assert_eq!(
            normalize_analysis_text("I could not analyze this prompt."),
            fallback_analysis()
        );
    }

    #[test]
    fn test_text_reply_with_broken_json_returns_fallback() {
        assert_eq!(
            normalize_analysis_text("{\"clarity\": 8, }"),
            fallback_analysis()
        );
        assert_eq!(normalize_analysis_text("{\"clarity\": 8"), fallback_analysis());
    }

    #[test]
    fn test_extract_first_json_object_is_balanced() {
        let text = r#"noise {"a": {"b": "}"}, "c": "\"{"} trailing {"d": 1}"#;
        assert_eq!(
            extract_first_json_object(text),
            Some(r#"{"a": {"b": "}"}, "c": "\"{"}"#)
        );
        assert_eq!(extract_first_json_object("no braces"), None);
    }

    #[test]
    fn test_normalization_is_deterministic() {
        let input = json!({ "clarity": 3, "strengths": ["x"] });
        assert_eq!(normalize_analysis(input.clone()), normalize_analysis(input));
    }

    #[test]
    fn test_estimate_tokens_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens("héllo"), 2);
    }

    #[test]
    fn test_overall_score() {
        let analysis = fallback_analysis();
        // (6 * 7 + 5 * 2) / 9 = 5.777...
        assert_eq!(analysis.overall_score(), 5.8);
    }

    #[test]
    fn test_serializes_camel_case_and_enum_values() {
        let value = serde_json::to_value(fallback_analysis()).unwrap();
        assert_eq!(value["languageQuality"], 6);
        assert_eq!(value["estimatedPerformance"], "fair");
        assert_eq!(value["complexity"], "medium");
    }

    #[test]
    fn test_deserializing_clamps_and_defaults_like_the_normalizer() {
        let analysis: PromptAnalysis = serde_json::from_value(json!({
            "clarity": 15,
            "specificity": 0,
            "effectiveness": 300,
            "estimatedPerformance": "amazing",
            "complexity": "extreme"
        }))
        .unwrap();
        assert_eq!(analysis.clarity, 10);
        assert_eq!(analysis.specificity, 1);
        assert_eq!(analysis.effectiveness, 10);
        assert_eq!(analysis.creativity, 5);
        assert_eq!(analysis.estimated_performance, EstimatedPerformance::Fair);
        assert_eq!(analysis.complexity, Complexity::Medium);
    }

    #[test]
    fn test_normalized_analysis_survives_storage_round_trip() {
        let mut analysis = fallback_analysis();
        analysis.clarity = 9;
        analysis.token_count = 120;
        analysis.estimated_cost = estimate_cost(120);
        analysis.strengths.clear();
        let json = serde_json::to_string(&analysis).unwrap();
        let back: PromptAnalysis = serde_json::from_str(&json).unwrap();
        assert_eq!(back, analysis);
    }
}


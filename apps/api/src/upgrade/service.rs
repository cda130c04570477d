//! Upgrade orchestration: analyze, compile, call the provider, record history.
//!
//! Flow for an upgrade: validate → apply template (optional) → compile →
//! one completion call → clean reply → append history → return response.
//!
//! Every provider call is a single attempt. Nothing is written to history
//! unless the upgrade call produced a usable prompt.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::TextCompleter;
use crate::upgrade::analysis::{
    estimate_cost, estimate_tokens, fallback_analysis, normalize_analysis_text, PromptAnalysis,
};
use crate::upgrade::compiler::{clean_upgraded_output, compile_upgrade_prompt};
use crate::upgrade::history::{SessionStore, UpgradeHistoryEntry};
use crate::upgrade::parameters::UpgradeParameters;
use crate::upgrade::prompts::{analysis_system, upgrade_system, ANALYSIS_PROMPT_TEMPLATE};
use crate::upgrade::templates::apply_template;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Request body for an upgrade or an upgrade preview.
#[derive(Debug, Clone, Deserialize)]
pub struct UpgradeRequest {
    pub user_id: Uuid,
    pub prompt: String,
    #[serde(default)]
    pub parameters: UpgradeParameters,
    /// Result of a prior analysis call, normalized on the way in.
    /// Absent means "not analyzed".
    #[serde(default)]
    pub analysis: Option<PromptAnalysis>,
    /// Template applied on top of `parameters` before compiling.
    #[serde(default)]
    pub template: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeResponse {
    pub upgraded_prompt: String,
    pub history_entry: UpgradeHistoryEntry,
    pub compiled_prompt_tokens: u64,
    pub estimated_cost: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradePreview {
    pub compiled_prompt: String,
    pub parameters: UpgradeParameters,
    pub token_count: u64,
    pub estimated_cost: f64,
}

/// Parameters and compiled instruction for one upgrade, before any provider call.
struct PreparedUpgrade {
    parameters: UpgradeParameters,
    compiled: String,
}

fn prepare(request: &UpgradeRequest) -> Result<PreparedUpgrade, AppError> {
    if request.prompt.trim().is_empty() {
        return Err(AppError::Validation("prompt cannot be empty".to_string()));
    }

    let parameters = match request.template.as_deref() {
        Some(name) => apply_template(&request.parameters, name)?,
        None => request.parameters.clone(),
    };

    // An unanalyzed prompt still compiles; the placeholder analysis stands in.
    let analysis = request.analysis.clone().unwrap_or_else(fallback_analysis);
    let compiled = compile_upgrade_prompt(&request.prompt, &analysis, &parameters);

    Ok(PreparedUpgrade {
        parameters,
        compiled,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Operations
// ────────────────────────────────────────────────────────────────────────────

/// Picks the credential for a provider call: the user's stored key first,
/// then the server-wide key.
pub async fn resolve_api_key(
    sessions: &dyn SessionStore,
    user_id: Uuid,
    fallback: Option<&str>,
) -> Result<String, AppError> {
    if let Some(key) = sessions.load_api_key(user_id).await? {
        return Ok(key);
    }
    fallback
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .ok_or(AppError::MissingCredential)
}

/// Grades `text` with one provider call. Whatever comes back is normalized,
/// so a malformed reply yields the placeholder analysis rather than an error.
pub async fn analyze_prompt(
    completer: &dyn TextCompleter,
    api_key: &str,
    text: &str,
) -> Result<PromptAnalysis, AppError> {
    if text.trim().is_empty() {
        return Err(AppError::Validation("prompt cannot be empty".to_string()));
    }

    let prompt = ANALYSIS_PROMPT_TEMPLATE.replace("{prompt}", text);
    let completion = completer
        .complete(api_key, &prompt, &analysis_system())
        .await
        .map_err(|e| AppError::Llm(format!("Analysis call failed: {e}")))?;

    let mut analysis = normalize_analysis_text(&completion.text);
    if analysis.token_count == 0 {
        analysis.token_count = estimate_tokens(text);
        analysis.estimated_cost = estimate_cost(analysis.token_count);
    }

    debug!(
        "Analysis complete: overall {:.1}, {} weaknesses",
        analysis.overall_score(),
        analysis.weaknesses.len()
    );
    Ok(analysis)
}

/// Compiles the upgrade instruction without calling the provider.
pub fn preview_upgrade(request: &UpgradeRequest) -> Result<UpgradePreview, AppError> {
    let prepared = prepare(request)?;
    let token_count = estimate_tokens(&prepared.compiled);

    Ok(UpgradePreview {
        compiled_prompt: prepared.compiled,
        parameters: prepared.parameters,
        token_count,
        estimated_cost: estimate_cost(token_count),
    })
}

/// Runs a full upgrade and records it in the user's history.
pub async fn upgrade_prompt(
    completer: &dyn TextCompleter,
    sessions: &dyn SessionStore,
    api_key: &str,
    request: UpgradeRequest,
) -> Result<UpgradeResponse, AppError> {
    let prepared = prepare(&request)?;
    let compiled_prompt_tokens = estimate_tokens(&prepared.compiled);
    debug!("Compiled upgrade instruction: ~{compiled_prompt_tokens} tokens");

    let completion = completer
        .complete(api_key, &prepared.compiled, &upgrade_system())
        .await
        .map_err(|e| AppError::Llm(format!("Upgrade call failed: {e}")))?;

    let upgraded_prompt = clean_upgraded_output(&completion.text);
    if upgraded_prompt.is_empty() {
        return Err(AppError::Llm(
            "Upgrade call returned an empty prompt".to_string(),
        ));
    }

    // Provider-reported usage when available, local estimate otherwise.
    let billed_tokens = match completion.usage {
        Some(usage) => u64::from(usage.prompt_tokens) + u64::from(usage.completion_tokens),
        None => compiled_prompt_tokens + estimate_tokens(&upgraded_prompt),
    };
    let history_entry = UpgradeHistoryEntry::new(
        request.prompt,
        upgraded_prompt.clone(),
        prepared.parameters,
        request.analysis,
    );
    let history = sessions
        .append_history(request.user_id, history_entry.clone())
        .await?;

    info!(
        "Upgraded prompt for user {} ({} entries in history)",
        request.user_id,
        history.len()
    );

    Ok(UpgradeResponse {
        upgraded_prompt,
        history_entry,
        compiled_prompt_tokens,
        estimated_cost: estimate_cost(billed_tokens),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::llm_client::{Completion, LlmError, Usage};
    use crate::upgrade::history::tests::MemorySessionStore;
    use crate::upgrade::parameters::Purpose;

    /// Replies with a fixed text (or fails) and records every prompt it saw.
    struct CannedCompleter {
        reply: Option<String>,
        usage: Option<Usage>,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedCompleter {
        fn replying(text: &str) -> Self {
            Self {
                reply: Some(text.to_string()),
                usage: None,
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: None,
                usage: None,
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TextCompleter for CannedCompleter {
        async fn complete(
            &self,
            _api_key: &str,
            prompt: &str,
            _system: &str,
        ) -> Result<Completion, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.reply {
                Some(text) => Ok(Completion {
                    text: text.clone(),
                    usage: self.usage,
                }),
                None => Err(LlmError::Api {
                    status: 500,
                    message: "provider unavailable".to_string(),
                }),
            }
        }
    }

    fn request(user_id: Uuid, prompt: &str) -> UpgradeRequest {
        UpgradeRequest {
            user_id,
            prompt: prompt.to_string(),
            parameters: UpgradeParameters::default(),
            analysis: None,
            template: None,
        }
    }

    #[tokio::test]
    async fn test_resolve_api_key_prefers_stored_key() {
        let sessions = MemorySessionStore::default();
        let user = Uuid::new_v4();
        sessions.save_api_key(user, "sk-user").await.unwrap();

        let key = resolve_api_key(&sessions, user, Some("sk-server")).await.unwrap();
        assert_eq!(key, "sk-user");
    }

    #[tokio::test]
    async fn test_resolve_api_key_falls_back_to_server_key() {
        let sessions = MemorySessionStore::default();
        let key = resolve_api_key(&sessions, Uuid::new_v4(), Some("sk-server"))
            .await
            .unwrap();
        assert_eq!(key, "sk-server");
    }

    #[tokio::test]
    async fn test_resolve_api_key_without_any_key_is_missing_credential() {
        let sessions = MemorySessionStore::default();
        let result = resolve_api_key(&sessions, Uuid::new_v4(), Some("  ")).await;
        assert!(matches!(result, Err(AppError::MissingCredential)));
    }

    #[tokio::test]
    async fn test_analyze_prompt_normalizes_fenced_reply() {
        let completer = CannedCompleter::replying(
            "```json\n{\"clarity\": 9, \"specificity\": 4, \"effectiveness\": 8, \
             \"weaknesses\": [\"No output format\"], \"complexity\": \"low\"}\n```",
        );

        let analysis = analyze_prompt(&completer, "sk", "Write a sorting function")
            .await
            .unwrap();

        assert_eq!(analysis.clarity, 9);
        assert_eq!(analysis.specificity, 4);
        assert_eq!(analysis.weaknesses, vec!["No output format".to_string()]);
        let calls = completer.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].contains("Write a sorting function"));
    }

    #[tokio::test]
    async fn test_analyze_prompt_fills_missing_token_count_locally() {
        let completer = CannedCompleter::replying(r#"{"clarity": 7, "tokenCount": 0}"#);
        let analysis = analyze_prompt(&completer, "sk", "12345678").await.unwrap();
        assert_eq!(analysis.token_count, 2);
        assert!(analysis.estimated_cost > 0.0);
    }

    #[tokio::test]
    async fn test_analyze_prompt_garbage_reply_gives_fallback() {
        let completer = CannedCompleter::replying("I cannot grade this prompt.");
        let analysis = analyze_prompt(&completer, "sk", "Hello").await.unwrap();
        assert_eq!(analysis.clarity, fallback_analysis().clarity);
        assert_eq!(analysis.weaknesses, fallback_analysis().weaknesses);
    }

    #[tokio::test]
    async fn test_analyze_prompt_rejects_blank_text_without_calling() {
        let completer = CannedCompleter::replying("{}");
        let result = analyze_prompt(&completer, "sk", "   ").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(completer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_analyze_prompt_provider_failure_is_llm_error() {
        let completer = CannedCompleter::failing();
        let result = analyze_prompt(&completer, "sk", "Hello").await;
        assert!(matches!(result, Err(AppError::Llm(_))));
    }

    #[tokio::test]
    async fn test_upgrade_prompt_cleans_reply_and_records_history() {
        let completer =
            CannedCompleter::replying("Upgraded prompt:\n\"Write a Rust function that sorts.\"");
        let sessions = MemorySessionStore::default();
        let user = Uuid::new_v4();

        let response = upgrade_prompt(&completer, &sessions, "sk", request(user, "sort stuff"))
            .await
            .unwrap();

        assert_eq!(response.upgraded_prompt, "Write a Rust function that sorts.");
        assert!(response.compiled_prompt_tokens > 0);
        assert!(response.estimated_cost > 0.0);

        let history = sessions.load_history(user).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0], response.history_entry);
        assert_eq!(history[0].original_prompt, "sort stuff");
        assert!(history[0].analysis.is_none());

        let calls = completer.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].contains("sort stuff"));
    }

    #[tokio::test]
    async fn test_upgrade_prompt_failure_leaves_history_unchanged() {
        let completer = CannedCompleter::failing();
        let sessions = MemorySessionStore::default();
        let user = Uuid::new_v4();

        let result = upgrade_prompt(&completer, &sessions, "sk", request(user, "sort stuff")).await;

        assert!(matches!(result, Err(AppError::Llm(_))));
        assert!(sessions.load_history(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upgrade_prompt_empty_reply_is_error() {
        let completer = CannedCompleter::replying("```\n```");
        let sessions = MemorySessionStore::default();
        let user = Uuid::new_v4();

        let result = upgrade_prompt(&completer, &sessions, "sk", request(user, "sort stuff")).await;

        assert!(matches!(result, Err(AppError::Llm(_))));
        assert!(sessions.load_history(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upgrade_prompt_applies_template_before_compiling() {
        let completer = CannedCompleter::replying("Find the root cause of the panic.");
        let sessions = MemorySessionStore::default();
        let user = Uuid::new_v4();
        let mut req = request(user, "my code panics");
        req.template = Some("debugging".to_string());

        let response = upgrade_prompt(&completer, &sessions, "sk", req).await.unwrap();

        assert_eq!(response.history_entry.parameters.purpose, Purpose::Debugging);
    }

    #[test]
    fn test_preview_unknown_template_is_not_found() {
        let mut req = request(Uuid::new_v4(), "hello");
        req.template = Some("No Such Template".to_string());
        assert!(matches!(preview_upgrade(&req), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_preview_compiles_without_provider() {
        let preview = preview_upgrade(&request(Uuid::new_v4(), "Explain closures")).unwrap();
        assert!(preview.compiled_prompt.contains("Explain closures"));
        assert_eq!(preview.token_count, estimate_tokens(&preview.compiled_prompt));
        assert_eq!(preview.parameters, UpgradeParameters::default());
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let user = Uuid::new_v4();
        let req: UpgradeRequest =
            serde_json::from_value(serde_json::json!({ "user_id": user, "prompt": "hi" }))
                .unwrap();
        assert_eq!(req.parameters, UpgradeParameters::default());
        assert!(req.analysis.is_none());
        assert!(req.template.is_none());
    }

    #[tokio::test]
    async fn test_upgrade_cost_uses_reported_usage() {
        let mut completer = CannedCompleter::replying("A sharper prompt.");
        completer.usage = Some(Usage {
            prompt_tokens: 1000,
            completion_tokens: 500,
        });
        let sessions = MemorySessionStore::default();

        let response = upgrade_prompt(&completer, &sessions, "sk", request(Uuid::new_v4(), "hi"))
            .await
            .unwrap();

        assert_eq!(response.estimated_cost, estimate_cost(1500));
    }

    #[tokio::test]
    async fn test_upgrade_cost_without_usage_is_estimated() {
        let completer = CannedCompleter::replying("A sharper prompt.");
        let sessions = MemorySessionStore::default();

        let response = upgrade_prompt(&completer, &sessions, "sk", request(Uuid::new_v4(), "hi"))
            .await
            .unwrap();

        let expected = response.compiled_prompt_tokens + estimate_tokens("A sharper prompt.");
        assert_eq!(response.estimated_cost, estimate_cost(expected));
    }

    #[test]
    fn test_posted_analysis_is_normalized_before_compiling() {
        let user = Uuid::new_v4();
        let req: UpgradeRequest = serde_json::from_value(serde_json::json!({
            "user_id": user,
            "prompt": "Explain closures",
            "analysis": {
                "clarity": 15,
                "specificity": 0,
                "effectiveness": 300,
                "estimatedPerformance": "amazing",
                "weaknesses": ["too vague"]
            }
        }))
        .unwrap();

        let analysis = req.analysis.as_ref().unwrap();
        assert_eq!(analysis.clarity, 10);
        assert_eq!(analysis.specificity, 1);
        assert_eq!(analysis.effectiveness, 10);
        assert_eq!(analysis.estimated_performance.as_str(), "fair");

        let preview = preview_upgrade(&req).unwrap();
        assert!(preview.compiled_prompt.contains("Clarity 10/10"));
        assert!(preview.compiled_prompt.contains("Specificity 1/10"));
        assert!(!preview.compiled_prompt.contains("15/10"));
        assert!(preview.compiled_prompt.contains("too vague"));
    }

    #[tokio::test]
    async fn test_history_stores_normalized_analysis() {
        let completer = CannedCompleter::replying("A sharper prompt.");
        let sessions = MemorySessionStore::default();
        let user = Uuid::new_v4();
        let req: UpgradeRequest = serde_json::from_value(serde_json::json!({
            "user_id": user,
            "prompt": "hi",
            "analysis": { "clarity": -3 }
        }))
        .unwrap();

        upgrade_prompt(&completer, &sessions, "sk", req).await.unwrap();

        let history = sessions.load_history(user).await.unwrap();
        assert_eq!(history[0].analysis.as_ref().unwrap().clarity, 1);
    }
}

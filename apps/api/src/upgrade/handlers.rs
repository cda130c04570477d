//! Axum route handlers for the Upgrade API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::upgrade::analysis::PromptAnalysis;
use crate::upgrade::detection::{detect_parameters, Detection};
use crate::upgrade::history::UpgradeHistoryEntry;
use crate::upgrade::parameters::{parameter_options, ParameterOptions, UpgradeParameters};
use crate::upgrade::service::{
    analyze_prompt, preview_upgrade, resolve_api_key, upgrade_prompt, UpgradePreview,
    UpgradeRequest, UpgradeResponse,
};
use crate::upgrade::templates::{apply_template, list_templates, UpgradeTemplate};

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub user_id: Uuid,
    pub prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub analysis: PromptAnalysis,
    pub overall_score: f64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApplyTemplateRequest {
    #[serde(default)]
    pub parameters: UpgradeParameters,
}

#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    pub content: String,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Deserialize)]
pub struct CredentialRequest {
    pub user_id: Uuid,
    pub api_key: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/prompts/analyze
///
/// Grades a prompt with one provider call using the user's credential.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    if request.prompt.trim().is_empty() {
        return Err(AppError::Validation("prompt cannot be empty".to_string()));
    }

    let api_key = resolve_api_key(
        state.sessions.as_ref(),
        request.user_id,
        state.config.openai_api_key.as_deref(),
    )
    .await?;

    let analysis = analyze_prompt(&state.llm, &api_key, &request.prompt).await?;
    let overall_score = analysis.overall_score();

    Ok(Json(AnalyzeResponse {
        analysis,
        overall_score,
    }))
}

/// POST /api/v1/prompts/upgrade
///
/// Compiles the upgrade instruction, calls the provider once and records
/// the result in the user's history.
pub async fn handle_upgrade(
    State(state): State<AppState>,
    Json(request): Json<UpgradeRequest>,
) -> Result<Json<UpgradeResponse>, AppError> {
    let api_key = resolve_api_key(
        state.sessions.as_ref(),
        request.user_id,
        state.config.openai_api_key.as_deref(),
    )
    .await?;

    let response = upgrade_prompt(&state.llm, state.sessions.as_ref(), &api_key, request).await?;

    Ok(Json(response))
}

/// POST /api/v1/prompts/upgrade/preview
///
/// Returns the compiled instruction without calling the provider.
pub async fn handle_upgrade_preview(
    Json(request): Json<UpgradeRequest>,
) -> Result<Json<UpgradePreview>, AppError> {
    Ok(Json(preview_upgrade(&request)?))
}

/// GET /api/v1/templates
pub async fn handle_list_templates() -> Json<&'static [UpgradeTemplate]> {
    Json(list_templates())
}

/// POST /api/v1/templates/:name/apply
///
/// Applies a named template to the posted parameters. The caller's custom
/// instructions survive; the template's guidance is appended to them.
pub async fn handle_apply_template(
    Path(name): Path<String>,
    Json(request): Json<ApplyTemplateRequest>,
) -> Result<Json<UpgradeParameters>, AppError> {
    Ok(Json(apply_template(&request.parameters, &name)?))
}

/// POST /api/v1/parameters/detect
///
/// Suggests parameters for a prompt from keywords in its text and category.
pub async fn handle_detect_parameters(Json(request): Json<DetectRequest>) -> Json<Detection> {
    Json(detect_parameters(&request.content, &request.category))
}

/// GET /api/v1/parameters/options
///
/// Accepted values for every choice field and the flags of each group.
pub async fn handle_parameter_options() -> Json<ParameterOptions> {
    Json(parameter_options())
}

/// GET /api/v1/history?user_id=
pub async fn handle_get_history(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<UpgradeHistoryEntry>>, AppError> {
    Ok(Json(state.sessions.load_history(query.user_id).await?))
}

/// DELETE /api/v1/history?user_id=
pub async fn handle_clear_history(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<StatusCode, AppError> {
    state.sessions.clear_history(query.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/credentials
///
/// Stores the user's own provider API key. The key is never echoed back.
pub async fn handle_save_credentials(
    State(state): State<AppState>,
    Json(request): Json<CredentialRequest>,
) -> Result<StatusCode, AppError> {
    if request.api_key.trim().is_empty() {
        return Err(AppError::Validation("api_key cannot be empty".to_string()));
    }

    state
        .sessions
        .save_api_key(request.user_id, request.api_key.trim())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

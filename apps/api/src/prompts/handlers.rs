//! Axum route handlers for the prompt document store.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::prompt::PromptRow;
use crate::prompts::search::{find_matches, step, Direction, SearchMatch};
use crate::prompts::store::{
    create_prompt, delete_prompt, get_prompt, list_prompts, update_prompt, NewPrompt,
    PromptChanges,
};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub user_id: Uuid,
    pub q: String,
    #[serde(default)]
    pub case_sensitive: bool,
}

#[derive(Debug, Deserialize)]
pub struct MatchesQuery {
    pub user_id: Uuid,
    pub q: String,
    #[serde(default)]
    pub case_sensitive: bool,
    /// Index of the currently highlighted match, if any.
    pub current: Option<usize>,
    #[serde(default)]
    pub direction: Direction,
}

#[derive(Debug, Serialize)]
pub struct SearchResult {
    pub prompt: PromptRow,
    pub title_matches: Vec<SearchMatch>,
    pub content_matches: Vec<SearchMatch>,
}

#[derive(Debug, Serialize)]
pub struct MatchesResponse {
    pub matches: Vec<SearchMatch>,
    pub active: Option<usize>,
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Prompt {id} not found"))
}

/// GET /api/v1/prompts
pub async fn handle_list_prompts(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<PromptRow>>, AppError> {
    Ok(Json(list_prompts(&state.db, params.user_id).await?))
}

/// POST /api/v1/prompts
pub async fn handle_create_prompt(
    State(state): State<AppState>,
    Json(req): Json<NewPrompt>,
) -> Result<(StatusCode, Json<PromptRow>), AppError> {
    if req.title.trim().is_empty() {
        return Err(AppError::Validation("title cannot be empty".to_string()));
    }
    let row = create_prompt(&state.db, &req).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/v1/prompts/:id
pub async fn handle_get_prompt(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<PromptRow>, AppError> {
    get_prompt(&state.db, params.user_id, id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// PUT /api/v1/prompts/:id
pub async fn handle_update_prompt(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<PromptChanges>,
) -> Result<Json<PromptRow>, AppError> {
    if req.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(AppError::Validation("title cannot be empty".to_string()));
    }
    update_prompt(&state.db, id, &req)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// DELETE /api/v1/prompts/:id
pub async fn handle_delete_prompt(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    if delete_prompt(&state.db, params.user_id, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}

/// GET /api/v1/prompts/search
///
/// Returns every prompt whose title or content contains the query, with
/// the match ranges for highlighting. Order follows the prompt list.
pub async fn handle_search_prompts(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<SearchResult>>, AppError> {
    if params.q.is_empty() {
        return Err(AppError::Validation("q cannot be empty".to_string()));
    }

    let results = list_prompts(&state.db, params.user_id)
        .await?
        .into_iter()
        .filter_map(|prompt| {
            let title_matches = find_matches(&prompt.title, &params.q, params.case_sensitive);
            let content_matches = find_matches(&prompt.content, &params.q, params.case_sensitive);
            if title_matches.is_empty() && content_matches.is_empty() {
                return None;
            }
            Some(SearchResult {
                prompt,
                title_matches,
                content_matches,
            })
        })
        .collect();

    Ok(Json(results))
}

/// GET /api/v1/prompts/:id/matches
///
/// Matches inside one prompt's content and the match to highlight after
/// stepping from `current` in `direction`.
pub async fn handle_prompt_matches(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<MatchesQuery>,
) -> Result<Json<MatchesResponse>, AppError> {
    let prompt = get_prompt(&state.db, params.user_id, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    let matches = find_matches(&prompt.content, &params.q, params.case_sensitive);
    let active = step(params.current, matches.len(), params.direction);

    Ok(Json(MatchesResponse { matches, active }))
}

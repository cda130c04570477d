pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::prompts::handlers as prompt_handlers;
use crate::state::AppState;
use crate::upgrade::handlers as upgrade_handlers;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Prompt documents
        .route(
            "/api/v1/prompts",
            get(prompt_handlers::handle_list_prompts).post(prompt_handlers::handle_create_prompt),
        )
        .route(
            "/api/v1/prompts/search",
            get(prompt_handlers::handle_search_prompts),
        )
        .route(
            "/api/v1/prompts/:id",
            get(prompt_handlers::handle_get_prompt)
                .put(prompt_handlers::handle_update_prompt)
                .delete(prompt_handlers::handle_delete_prompt),
        )
        .route(
            "/api/v1/prompts/:id/matches",
            get(prompt_handlers::handle_prompt_matches),
        )
        // Analysis and upgrade
        .route(
            "/api/v1/prompts/analyze",
            post(upgrade_handlers::handle_analyze),
        )
        .route(
            "/api/v1/prompts/upgrade",
            post(upgrade_handlers::handle_upgrade),
        )
        .route(
            "/api/v1/prompts/upgrade/preview",
            post(upgrade_handlers::handle_upgrade_preview),
        )
        // Templates and detection
        .route(
            "/api/v1/templates",
            get(upgrade_handlers::handle_list_templates),
        )
        .route(
            "/api/v1/templates/:name/apply",
            post(upgrade_handlers::handle_apply_template),
        )
        .route(
            "/api/v1/parameters/options",
            get(upgrade_handlers::handle_parameter_options),
        )
        .route(
            "/api/v1/parameters/detect",
            post(upgrade_handlers::handle_detect_parameters),
        )
        // Session
        .route(
            "/api/v1/history",
            get(upgrade_handlers::handle_get_history).delete(upgrade_handlers::handle_clear_history),
        )
        .route(
            "/api/v1/credentials",
            put(upgrade_handlers::handle_save_credentials),
        )
        .with_state(state)
}

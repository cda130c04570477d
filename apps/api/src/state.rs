use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::upgrade::history::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Prompt document store.
    pub db: PgPool,
    /// Per-user upgrade history and API credential. Redis-backed in production.
    pub sessions: Arc<dyn SessionStore>,
    pub llm: LlmClient,
    pub config: Config,
}

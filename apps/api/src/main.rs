mod config;
mod db;
mod errors;
mod llm_client;
mod models;
mod prompts;
mod routes;
mod state;
mod upgrade;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::upgrade::history::RedisSessionStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Prompt Upgrader API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (prompt documents)
    let db = create_pool(&config.database_url).await?;

    // Initialize Redis (history + per-user credentials)
    let redis = redis::Client::open(config.redis_url.clone())?;
    let sessions = Arc::new(RedisSessionStore::new(redis));
    info!("Redis session store initialized");

    // Initialize LLM client
    let llm = LlmClient::new()?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);
    if config.openai_api_key.is_none() {
        info!("No server OPENAI_API_KEY set; users must store their own key");
    }

    let state = AppState {
        db,
        sessions,
        llm,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the web client once it has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Opens the prompt document store and applies pending migrations
/// from `apps/api/migrations`.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to the prompt store...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run prompt store migrations")?;

    info!("Prompt store ready");
    Ok(pool)
}

//! Upgrade history and per-user session storage.
//!
//! History is an append-only log of upgrades, newest first, capped at
//! `HISTORY_LIMIT`. It is stored as one JSON array per user and updated with a
//! plain read-modify-write. Concurrent writers for the same user are not
//! coordinated; a user drives one upgrade at a time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::upgrade::analysis::PromptAnalysis;
use crate::upgrade::parameters::UpgradeParameters;

pub const HISTORY_LIMIT: usize = 50;

/// One saved upgrade: the prompt pair plus the configuration that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeHistoryEntry {
    pub id: Uuid,
    pub original_prompt: String,
    pub upgraded_prompt: String,
    pub parameters: UpgradeParameters,
    pub analysis: Option<PromptAnalysis>,
    pub timestamp: DateTime<Utc>,
}

impl UpgradeHistoryEntry {
    pub fn new(
        original_prompt: String,
        upgraded_prompt: String,
        parameters: UpgradeParameters,
        analysis: Option<PromptAnalysis>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            original_prompt,
            upgraded_prompt,
            parameters,
            analysis,
            timestamp: Utc::now(),
        }
    }
}

/// Inserts `entry` as the newest item and drops anything past the cap.
pub fn push_capped(history: &mut Vec<UpgradeHistoryEntry>, entry: UpgradeHistoryEntry) {
    history.insert(0, entry);
    history.truncate(HISTORY_LIMIT);
}

/// Per-user session state: upgrade history and the user's provider API key.
///
/// Carried in `AppState` as `Arc<dyn SessionStore>`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load_history(&self, user_id: Uuid) -> Result<Vec<UpgradeHistoryEntry>, AppError>;

    async fn save_history(
        &self,
        user_id: Uuid,
        history: &[UpgradeHistoryEntry],
    ) -> Result<(), AppError>;

    async fn load_api_key(&self, user_id: Uuid) -> Result<Option<String>, AppError>;

    async fn save_api_key(&self, user_id: Uuid, api_key: &str) -> Result<(), AppError>;

    /// Appends one entry and returns the capped history.
    async fn append_history(
        &self,
        user_id: Uuid,
        entry: UpgradeHistoryEntry,
    ) -> Result<Vec<UpgradeHistoryEntry>, AppError> {
        let mut history = self.load_history(user_id).await?;
        push_capped(&mut history, entry);
        self.save_history(user_id, &history).await?;
        Ok(history)
    }

    async fn clear_history(&self, user_id: Uuid) -> Result<(), AppError> {
        self.save_history(user_id, &[]).await
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Redis-backed store
// ────────────────────────────────────────────────────────────────────────────

pub struct RedisSessionStore {
    client: redis::Client,
}

impl RedisSessionStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, AppError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

fn history_key(user_id: Uuid) -> String {
    format!("upgrader:{user_id}:history")
}

fn api_key_key(user_id: Uuid) -> String {
    format!("upgrader:{user_id}:api_key")
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load_history(&self, user_id: Uuid) -> Result<Vec<UpgradeHistoryEntry>, AppError> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn.get(history_key(user_id)).await?;

        let Some(raw) = raw else {
            return Ok(Vec::new());
        };
        // Unreadable history is dropped, never surfaced as an upgrade failure.
        match serde_json::from_str(&raw) {
            Ok(history) => Ok(history),
            Err(e) => {
                warn!("Discarding unreadable history for user {user_id}: {e}");
                Ok(Vec::new())
            }
        }
    }

    async fn save_history(
        &self,
        user_id: Uuid,
        history: &[UpgradeHistoryEntry],
    ) -> Result<(), AppError> {
        let json = serde_json::to_string(history)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize history: {e}")))?;
        let mut conn = self.connection().await?;
        let _: () = conn.set(history_key(user_id), json).await?;
        debug!("Saved {} history entries for user {user_id}", history.len());
        Ok(())
    }

    async fn load_api_key(&self, user_id: Uuid) -> Result<Option<String>, AppError> {
        let mut conn = self.connection().await?;
        let key: Option<String> = conn.get(api_key_key(user_id)).await?;
        Ok(key.filter(|k| !k.trim().is_empty()))
    }

    async fn save_api_key(&self, user_id: Uuid, api_key: &str) -> Result<(), AppError> {
        let mut conn = self.connection().await?;
        let _: () = conn.set(api_key_key(user_id), api_key.trim()).await?;
        Ok(())
    }
}

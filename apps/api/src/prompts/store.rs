//! Postgres queries for prompt documents. Every query is scoped by `user_id`.

use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::prompt::PromptRow;

#[derive(Debug, Clone, Deserialize)]
pub struct NewPrompt {
    pub user_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_favorite: bool,
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromptChanges {
    pub user_id: Uuid,
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_favorite: Option<bool>,
}

/// Most recently edited first.
pub async fn list_prompts(pool: &PgPool, user_id: Uuid) -> Result<Vec<PromptRow>, sqlx::Error> {
    sqlx::query_as::<_, PromptRow>(
        "SELECT * FROM prompts WHERE user_id = $1 ORDER BY updated_at DESC, id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn get_prompt(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
) -> Result<Option<PromptRow>, sqlx::Error> {
    sqlx::query_as::<_, PromptRow>("SELECT * FROM prompts WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn create_prompt(pool: &PgPool, new: &NewPrompt) -> Result<PromptRow, sqlx::Error> {
    let row = sqlx::query_as::<_, PromptRow>(
        r#"
        INSERT INTO prompts (id, user_id, title, content, category, tags, is_favorite)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.user_id)
    .bind(&new.title)
    .bind(&new.content)
    .bind(&new.category)
    .bind(&new.tags)
    .bind(new.is_favorite)
    .fetch_one(pool)
    .await?;

    info!("Created prompt {} for user {}", row.id, row.user_id);
    Ok(row)
}

/// Applies `changes` and bumps `updated_at`. `None` when no such prompt.
pub async fn update_prompt(
    pool: &PgPool,
    id: Uuid,
    changes: &PromptChanges,
) -> Result<Option<PromptRow>, sqlx::Error> {
    sqlx::query_as::<_, PromptRow>(
        r#"
        UPDATE prompts SET
            title       = COALESCE($3, title),
            content     = COALESCE($4, content),
            category    = COALESCE($5, category),
            tags        = COALESCE($6, tags),
            is_favorite = COALESCE($7, is_favorite),
            updated_at  = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(changes.user_id)
    .bind(changes.title.as_deref())
    .bind(changes.content.as_deref())
    .bind(changes.category.as_deref())
    .bind(changes.tags.as_deref())
    .bind(changes.is_favorite)
    .fetch_optional(pool)
    .await
}

/// Returns whether a row was deleted.
pub async fn delete_prompt(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM prompts WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

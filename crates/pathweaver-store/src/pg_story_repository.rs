//! `PostgreSQL` implementation of the `StoryRepository` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use pathweaver_core::error::DomainError;
use pathweaver_core::repository::{
    StoredOutline, StoredStory, StoredStoryNode, StoryRepository, StoryStatus,
};

use crate::schema::{NODE_COLUMNS, STORY_COLUMNS};

/// PostgreSQL-backed story repository.
#[derive(Debug, Clone)]
pub struct PgStoryRepository {
    pool: PgPool,
}

impl PgStoryRepository {
    /// Creates a new `PgStoryRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_error(e: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("database error: {e}"))
}

fn story_from_row(row: &PgRow) -> Result<StoredStory, DomainError> {
    let status: String = row.try_get("status").map_err(db_error)?;
    Ok(StoredStory {
        id: row.try_get("id").map_err(db_error)?,
        user_id: row.try_get("user_id").map_err(db_error)?,
        prompt: row.try_get("prompt").map_err(db_error)?,
        title: row.try_get("title").map_err(db_error)?,
        description: row.try_get("description").map_err(db_error)?,
        banner_image_prompt: row.try_get("banner_image_prompt").map_err(db_error)?,
        theme_audio_prompt: row.try_get("theme_audio_prompt").map_err(db_error)?,
        status: status.parse()?,
        error_message: row.try_get("error_message").map_err(db_error)?,
        created_at: row.try_get("created_at").map_err(db_error)?,
        updated_at: row.try_get("updated_at").map_err(db_error)?,
    })
}

fn node_from_row(row: &PgRow) -> Result<StoredStoryNode, DomainError> {
    Ok(StoredStoryNode {
        id: row.try_get("id").map_err(db_error)?,
        story_id: row.try_get("story_id").map_err(db_error)?,
        parent_id: row.try_get("parent_id").map_err(db_error)?,
        position: row.try_get("position").map_err(db_error)?,
        title: row.try_get("title").map_err(db_error)?,
        choice_label: row.try_get("choice_label").map_err(db_error)?,
        choice_description: row.try_get("choice_description").map_err(db_error)?,
        narrative_text: row.try_get("narrative_text").map_err(db_error)?,
        image_prompt: row.try_get("image_prompt").map_err(db_error)?,
        is_terminal: row.try_get("is_terminal").map_err(db_error)?,
    })
}

#[async_trait]
impl StoryRepository for PgStoryRepository {
    async fn insert_story(&self, story: &StoredStory) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO stories (id, user_id, prompt, title, description, \
             banner_image_prompt, theme_audio_prompt, status, error_message, \
             created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(story.id)
        .bind(&story.user_id)
        .bind(&story.prompt)
        .bind(&story.title)
        .bind(&story.description)
        .bind(&story.banner_image_prompt)
        .bind(&story.theme_audio_prompt)
        .bind(story.status.as_str())
        .bind(&story.error_message)
        .bind(story.created_at)
        .bind(story.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn save_outline(
        &self,
        story_id: Uuid,
        outline: &StoredOutline,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE stories SET title = $2, description = $3, banner_image_prompt = $4, \
             theme_audio_prompt = $5, updated_at = $6 WHERE id = $1",
        )
        .bind(story_id)
        .bind(&outline.title)
        .bind(&outline.description)
        .bind(&outline.banner_image_prompt)
        .bind(&outline.theme_audio_prompt)
        .bind(updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::StoryNotFound(story_id));
        }
        Ok(())
    }

    async fn update_story_status(
        &self,
        story_id: Uuid,
        status: StoryStatus,
        error_message: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE stories SET status = $2, error_message = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(story_id)
        .bind(status.as_str())
        .bind(error_message)
        .bind(updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::StoryNotFound(story_id));
        }
        Ok(())
    }

    async fn insert_nodes(
        &self,
        story_id: Uuid,
        nodes: &[StoredStoryNode],
    ) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // Parents precede children, so the self-reference is always satisfied.
        for node in nodes {
            sqlx::query(
                "INSERT INTO story_nodes (id, story_id, parent_id, position, title, \
                 choice_label, choice_description, narrative_text, image_prompt, is_terminal) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            )
            .bind(node.id)
            .bind(story_id)
            .bind(node.parent_id)
            .bind(node.position)
            .bind(&node.title)
            .bind(&node.choice_label)
            .bind(&node.choice_description)
            .bind(&node.narrative_text)
            .bind(&node.image_prompt)
            .bind(node.is_terminal)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;
        debug!(%story_id, nodes = nodes.len(), "story nodes inserted");
        Ok(())
    }

    async fn find_story(&self, story_id: Uuid) -> Result<Option<StoredStory>, DomainError> {
        let row = sqlx::query(&format!("SELECT {STORY_COLUMNS} FROM stories WHERE id = $1"))
            .bind(story_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.as_ref().map(story_from_row).transpose()
    }

    async fn list_nodes(&self, story_id: Uuid) -> Result<Vec<StoredStoryNode>, DomainError> {
        let rows = sqlx::query(&format!(
            "SELECT {NODE_COLUMNS} FROM story_nodes WHERE story_id = $1 ORDER BY position ASC"
        ))
        .bind(story_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        rows.iter().map(node_from_row).collect()
    }

    async fn list_stories_by_user(&self, user_id: &str) -> Result<Vec<StoredStory>, DomainError> {
        let rows = sqlx::query(&format!(
            "SELECT {STORY_COLUMNS} FROM stories WHERE user_id = $1 \
             ORDER BY created_at DESC, id ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        rows.iter().map(story_from_row).collect()
    }

    async fn delete_story(&self, story_id: Uuid, user_id: &str) -> Result<(), DomainError> {
        // Nodes go with the story through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM stories WHERE id = $1 AND user_id = $2")
            .bind(story_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::StoryNotFound(story_id));
        }
        debug!(%story_id, "story deleted");
        Ok(())
    }
}

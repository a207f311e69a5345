//! Story database schema.

use pathweaver_core::error::DomainError;
use sqlx::PgPool;
use sqlx::migrate::Migrator;

/// Embedded migrations from the workspace `migrations/` directory.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Applies all pending migrations.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if a migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DomainError> {
    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| DomainError::Infrastructure(format!("migration failed: {e}")))
}

/// Columns selected for a story row.
pub(crate) const STORY_COLUMNS: &str = "id, user_id, prompt, title, description, \
    banner_image_prompt, theme_audio_prompt, status, error_message, created_at, updated_at";

/// Columns selected for a node row.
pub(crate) const NODE_COLUMNS: &str = "id, story_id, parent_id, position, title, \
    choice_label, choice_description, narrative_text, image_prompt, is_terminal";

//! Command handlers for managing existing stories.

use pathweaver_core::error::DomainError;
use pathweaver_core::repository::StoryRepository;
use tracing::info;

use crate::domain::commands::DeleteStory;

/// Handles the `DeleteStory` command. The story's nodes are removed with it.
/// A story owned by someone else is reported as not found.
///
/// # Errors
///
/// Returns `DomainError::Validation` for a blank user,
/// `DomainError::StoryNotFound` if the user owns no such story, or the
/// repository error.
pub async fn handle_delete_story(
    command: &DeleteStory,
    repo: &dyn StoryRepository,
) -> Result<(), DomainError> {
    if command.user_id.trim().is_empty() {
        return Err(DomainError::Validation("user_id must not be blank".into()));
    }

    repo.delete_story(command.story_id, &command.user_id).await?;

    info!(
        story_id = %command.story_id,
        correlation_id = %command.correlation_id,
        "story deleted"
    );
    Ok(())
}

//! Query handlers for generated stories.
//!
//! Read-only view DTOs over the story repository, serialized as-is by the
//! HTTP layer.

use chrono::{DateTime, Utc};
use pathweaver_core::error::DomainError;
use pathweaver_core::repository::{StoredStory, StoredStoryNode, StoryRepository, StoryStatus};
use serde::Serialize;
use uuid::Uuid;

/// Read-only view of a story.
#[derive(Debug, Serialize)]
pub struct StoryView {
    /// The story identifier.
    pub story_id: Uuid,
    /// Owner of the story.
    pub user_id: String,
    /// The prompt the story was generated from.
    pub prompt: String,
    /// Outline title, once generated.
    pub title: Option<String>,
    /// Outline description, once generated.
    pub description: Option<String>,
    /// Cover image prompt, once generated.
    pub banner_image_prompt: Option<String>,
    /// Theme audio prompt, if any.
    pub theme_audio_prompt: Option<String>,
    /// Current status.
    pub status: StoryStatus,
    /// Failure reason when `FAILED`.
    pub error_message: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<StoredStory> for StoryView {
    fn from(story: StoredStory) -> Self {
        Self {
            story_id: story.id,
            user_id: story.user_id,
            prompt: story.prompt,
            title: story.title,
            description: story.description,
            banner_image_prompt: story.banner_image_prompt,
            theme_audio_prompt: story.theme_audio_prompt,
            status: story.status,
            error_message: story.error_message,
            created_at: story.created_at,
            updated_at: story.updated_at,
        }
    }
}

/// Read-only view of one story node.
#[derive(Debug, Serialize)]
pub struct StoryNodeView {
    /// The node identifier.
    pub node_id: Uuid,
    /// Parent node, `None` for the root.
    pub parent_id: Option<Uuid>,
    /// Short situation title.
    pub title: String,
    /// Label of the choice leading here.
    pub choice_label: String,
    /// Description of the choice leading here.
    pub choice_description: String,
    /// Narrative text.
    pub narrative_text: String,
    /// Illustration prompt.
    pub image_prompt: String,
    /// Whether the story ends here.
    pub is_terminal: bool,
}

impl From<StoredStoryNode> for StoryNodeView {
    fn from(node: StoredStoryNode) -> Self {
        Self {
            node_id: node.id,
            parent_id: node.parent_id,
            title: node.title,
            choice_label: node.choice_label,
            choice_description: node.choice_description,
            narrative_text: node.narrative_text,
            image_prompt: node.image_prompt,
            is_terminal: node.is_terminal,
        }
    }
}

/// Retrieves a story by its ID.
///
/// # Errors
///
/// Returns `DomainError::StoryNotFound` if no story exists for the ID.
/// Returns `DomainError::Infrastructure` if the repository fails.
pub async fn get_story_by_id(
    story_id: Uuid,
    repo: &dyn StoryRepository,
) -> Result<StoryView, DomainError> {
    repo.find_story(story_id)
        .await?
        .map(StoryView::from)
        .ok_or(DomainError::StoryNotFound(story_id))
}

/// Lists the nodes of a story in persisted (pre-order) order.
///
/// # Errors
///
/// Returns `DomainError::StoryNotFound` if no story exists for the ID.
/// Returns `DomainError::Infrastructure` if the repository fails.
pub async fn list_story_nodes(
    story_id: Uuid,
    repo: &dyn StoryRepository,
) -> Result<Vec<StoryNodeView>, DomainError> {
    if repo.find_story(story_id).await?.is_none() {
        return Err(DomainError::StoryNotFound(story_id));
    }
    let nodes = repo.list_nodes(story_id).await?;
    Ok(nodes.into_iter().map(StoryNodeView::from).collect())
}

/// Lists the stories of a user, newest first.
///
/// # Errors
///
/// Returns `DomainError::Validation` if `user_id` is blank.
/// Returns `DomainError::Infrastructure` if the repository fails.
pub async fn list_user_stories(
    user_id: &str,
    repo: &dyn StoryRepository,
) -> Result<Vec<StoryView>, DomainError> {
    if user_id.trim().is_empty() {
        return Err(DomainError::Validation("user_id must not be blank".into()));
    }
    let stories = repo.list_stories_by_user(user_id).await?;
    Ok(stories.into_iter().map(StoryView::from).collect())
}

//! Story repository abstraction.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Lifecycle status of a persisted story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoryStatus {
    /// Generation is in progress.
    Processing,
    /// The tree is persisted and its assets are available.
    Generated,
    /// Generation ended with an unrecovered failure.
    Failed,
}

impl StoryStatus {
    /// Database/wire representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "PROCESSING",
            Self::Generated => "GENERATED",
            Self::Failed => "FAILED",
        }
    }

    /// Returns `true` once no further transition is allowed.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Processing)
    }
}

impl fmt::Display for StoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoryStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PROCESSING" => Ok(Self::Processing),
            "GENERATED" => Ok(Self::Generated),
            "FAILED" => Ok(Self::Failed),
            other => Err(DomainError::Infrastructure(format!(
                "unknown story status: {other}"
            ))),
        }
    }
}

/// Stored representation of a story.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredStory {
    /// Story identifier.
    pub id: Uuid,
    /// Owner of the story.
    pub user_id: String,
    /// The prompt the story was generated from.
    pub prompt: String,
    /// Outline title, once generated.
    pub title: Option<String>,
    /// Outline scene-setting description, once generated.
    pub description: Option<String>,
    /// Cover image prompt, once generated.
    pub banner_image_prompt: Option<String>,
    /// Theme audio prompt, if the outline had one.
    pub theme_audio_prompt: Option<String>,
    /// Current status.
    pub status: StoryStatus,
    /// Failure reason when `status` is `Failed`.
    pub error_message: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Stored outline fields of a story.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredOutline {
    /// Story title.
    pub title: String,
    /// Scene-setting description.
    pub description: String,
    /// Cover image prompt.
    pub banner_image_prompt: String,
    /// Optional theme audio prompt.
    pub theme_audio_prompt: Option<String>,
}

/// Stored representation of one flattened story node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredStoryNode {
    /// Node identifier.
    pub id: Uuid,
    /// Owning story.
    pub story_id: Uuid,
    /// Parent node, `None` only for the root.
    pub parent_id: Option<Uuid>,
    /// Pre-order position within the story.
    pub position: i32,
    /// Short situation title.
    pub title: String,
    /// Label of the choice that leads to this node.
    pub choice_label: String,
    /// Description of the choice that leads to this node.
    pub choice_description: String,
    /// Narrative text of the situation.
    pub narrative_text: String,
    /// Illustration prompt.
    pub image_prompt: String,
    /// Whether the story ends here.
    pub is_terminal: bool,
}

/// Repository trait for story records and their flattened nodes.
#[async_trait]
pub trait StoryRepository: Send + Sync {
    /// Insert a new story record.
    async fn insert_story(&self, story: &StoredStory) -> Result<(), DomainError>;

    /// Record the generated outline of an existing story.
    async fn save_outline(
        &self,
        story_id: Uuid,
        outline: &StoredOutline,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DomainError>;

    /// Move a story to `status`, recording `error_message` alongside.
    async fn update_story_status(
        &self,
        story_id: Uuid,
        status: StoryStatus,
        error_message: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DomainError>;

    /// Insert the flattened nodes of a story. Parents precede children.
    async fn insert_nodes(
        &self,
        story_id: Uuid,
        nodes: &[StoredStoryNode],
    ) -> Result<(), DomainError>;

    /// Load a story record, `None` if it does not exist.
    async fn find_story(&self, story_id: Uuid) -> Result<Option<StoredStory>, DomainError>;

    /// Load the nodes of a story ordered by position.
    async fn list_nodes(&self, story_id: Uuid) -> Result<Vec<StoredStoryNode>, DomainError>;

    /// Load every story owned by `user_id`, newest first.
    async fn list_stories_by_user(&self, user_id: &str) -> Result<Vec<StoredStory>, DomainError>;

    /// Delete a story owned by `user_id` together with its nodes. Returns
    /// `DomainError::StoryNotFound` when the user owns no such story.
    async fn delete_story(&self, story_id: Uuid, user_id: &str) -> Result<(), DomainError>;
}

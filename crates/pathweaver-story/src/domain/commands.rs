//! Commands accepted by the story context.

use uuid::Uuid;

/// Command to generate a new story from a prompt.
#[derive(Debug, Clone)]
pub struct GenerateStory {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Owner of the story.
    pub user_id: String,
    /// The premise the story is generated from.
    pub prompt: String,
}

/// Command to delete a story and its nodes.
#[derive(Debug, Clone)]
pub struct DeleteStory {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The story to delete.
    pub story_id: Uuid,
    /// The user the story must belong to.
    pub user_id: String,
}

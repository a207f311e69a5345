//! Test repositories: mock `StoryRepository` implementations for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pathweaver_core::error::DomainError;
use pathweaver_core::repository::{
    StoredOutline, StoredStory, StoredStoryNode, StoryRepository, StoryStatus,
};
use uuid::Uuid;

/// An in-memory story repository that keeps every write and records each
/// status update in order. Node inserts can be made to fail to exercise the
/// persistence error path.
#[derive(Debug, Default)]
pub struct InMemoryStoryRepository {
    stories: Mutex<HashMap<Uuid, StoredStory>>,
    nodes: Mutex<HashMap<Uuid, Vec<StoredStoryNode>>>,
    status_updates: Mutex<Vec<(Uuid, StoryStatus, Option<String>)>>,
    fail_node_inserts: bool,
}

impl InMemoryStoryRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `insert_nodes` call fail with an infrastructure error.
    #[must_use]
    pub fn with_failing_node_inserts(mut self) -> Self {
        self.fail_node_inserts = true;
        self
    }

    /// Returns the stored story, if any.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn story(&self, story_id: Uuid) -> Option<StoredStory> {
        self.stories.lock().unwrap().get(&story_id).cloned()
    }

    /// Returns the stored nodes of a story in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn nodes(&self, story_id: Uuid) -> Vec<StoredStoryNode> {
        self.nodes
            .lock()
            .unwrap()
            .get(&story_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns every status update applied, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn status_updates(&self) -> Vec<(Uuid, StoryStatus, Option<String>)> {
        self.status_updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl StoryRepository for InMemoryStoryRepository {
    async fn insert_story(&self, story: &StoredStory) -> Result<(), DomainError> {
        let mut stories = self.stories.lock().unwrap();
        if stories.contains_key(&story.id) {
            return Err(DomainError::Infrastructure(format!(
                "duplicate story id {}",
                story.id
            )));
        }
        stories.insert(story.id, story.clone());
        Ok(())
    }

    async fn save_outline(
        &self,
        story_id: Uuid,
        outline: &StoredOutline,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let mut stories = self.stories.lock().unwrap();
        let story = stories
            .get_mut(&story_id)
            .ok_or(DomainError::StoryNotFound(story_id))?;
        story.title = Some(outline.title.clone());
        story.description = Some(outline.description.clone());
        story.banner_image_prompt = Some(outline.banner_image_prompt.clone());
        story.theme_audio_prompt.clone_from(&outline.theme_audio_prompt);
        story.updated_at = updated_at;
        Ok(())
    }

    async fn update_story_status(
        &self,
        story_id: Uuid,
        status: StoryStatus,
        error_message: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let mut stories = self.stories.lock().unwrap();
        let story = stories
            .get_mut(&story_id)
            .ok_or(DomainError::StoryNotFound(story_id))?;
        story.status = status;
        story.error_message = error_message.map(str::to_owned);
        story.updated_at = updated_at;
        self.status_updates.lock().unwrap().push((
            story_id,
            status,
            error_message.map(str::to_owned),
        ));
        Ok(())
    }

    async fn insert_nodes(
        &self,
        story_id: Uuid,
        nodes: &[StoredStoryNode],
    ) -> Result<(), DomainError> {
        if self.fail_node_inserts {
            return Err(DomainError::Infrastructure("connection refused".into()));
        }
        self.nodes
            .lock()
            .unwrap()
            .entry(story_id)
            .or_default()
            .extend_from_slice(nodes);
        Ok(())
    }

    async fn find_story(&self, story_id: Uuid) -> Result<Option<StoredStory>, DomainError> {
        Ok(self.story(story_id))
    }

    async fn list_nodes(&self, story_id: Uuid) -> Result<Vec<StoredStoryNode>, DomainError> {
        let mut nodes = self.nodes(story_id);
        nodes.sort_by_key(|node| node.position);
        Ok(nodes)
    }

    async fn list_stories_by_user(&self, user_id: &str) -> Result<Vec<StoredStory>, DomainError> {
        let mut stories: Vec<StoredStory> = self
            .stories
            .lock()
            .unwrap()
            .values()
            .filter(|story| story.user_id == user_id)
            .cloned()
            .collect();
        stories.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(stories)
    }

    async fn delete_story(&self, story_id: Uuid, user_id: &str) -> Result<(), DomainError> {
        let mut stories = self.stories.lock().unwrap();
        match stories.get(&story_id) {
            Some(story) if story.user_id == user_id => {
                stories.remove(&story_id);
                self.nodes.lock().unwrap().remove(&story_id);
                Ok(())
            }
            _ => Err(DomainError::StoryNotFound(story_id)),
        }
    }
}

/// A story repository that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingStoryRepository;

#[async_trait]
impl StoryRepository for FailingStoryRepository {
    async fn insert_story(&self, _story: &StoredStory) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn save_outline(
        &self,
        _story_id: Uuid,
        _outline: &StoredOutline,
        _updated_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn update_story_status(
        &self,
        _story_id: Uuid,
        _status: StoryStatus,
        _error_message: Option<&str>,
        _updated_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn insert_nodes(
        &self,
        _story_id: Uuid,
        _nodes: &[StoredStoryNode],
    ) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn find_story(&self, _story_id: Uuid) -> Result<Option<StoredStory>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn list_nodes(&self, _story_id: Uuid) -> Result<Vec<StoredStoryNode>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn list_stories_by_user(&self, _user_id: &str) -> Result<Vec<StoredStory>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn delete_story(&self, _story_id: Uuid, _user_id: &str) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}

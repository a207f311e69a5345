//! Shared application state.

use std::sync::Arc;

use pathweaver_core::repository::StoryRepository;
use pathweaver_story::application::orchestrator::StoryOrchestrator;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Story persistence, for reads.
    pub story_repository: Arc<dyn StoryRepository>,
    /// Runs submitted stories.
    pub orchestrator: Arc<StoryOrchestrator>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        story_repository: Arc<dyn StoryRepository>,
        orchestrator: Arc<StoryOrchestrator>,
    ) -> Self {
        Self {
            story_repository,
            orchestrator,
        }
    }
}

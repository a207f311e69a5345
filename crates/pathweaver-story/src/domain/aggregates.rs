//! Aggregate root for a generated story.

use std::fmt;

use chrono::{DateTime, Utc};
use pathweaver_core::clock::Clock;
use pathweaver_core::error::DomainError;
use pathweaver_core::repository::{StoredStory, StoryStatus};
use uuid::Uuid;

/// Step of the generation pipeline a story is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationPhase {
    /// Accepted, nothing generated yet.
    Accepted,
    /// Generating the outline from the prompt.
    GeneratingOutline,
    /// Persisting the outline.
    PersistingOutline,
    /// Expanding the choice tree.
    GeneratingTree,
    /// Flattening and persisting the tree.
    PersistingTree,
    /// Sending media requests.
    DispatchingAssets,
    /// Polling for rendered media.
    AwaitingAssets,
    /// Writing the final status.
    Finalizing,
}

impl GenerationPhase {
    /// Human-readable phase name used in logs and error messages.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::GeneratingOutline => "generating outline",
            Self::PersistingOutline => "persisting outline",
            Self::GeneratingTree => "generating choice tree",
            Self::PersistingTree => "persisting choice tree",
            Self::DispatchingAssets => "dispatching assets",
            Self::AwaitingAssets => "awaiting assets",
            Self::Finalizing => "finalizing",
        }
    }
}

impl fmt::Display for GenerationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The aggregate root for a story. Only `PROCESSING` stories change state,
/// and they change exactly once, to `GENERATED` or `FAILED`.
#[derive(Debug, Clone)]
pub struct Story {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Owner of the story.
    pub(crate) user_id: String,
    /// The prompt the story is generated from.
    pub(crate) prompt: String,
    /// Current status.
    pub(crate) status: StoryStatus,
    /// Current pipeline step.
    pub(crate) phase: GenerationPhase,
    /// Failure reason once `FAILED`.
    pub(crate) error_message: Option<String>,
    /// Creation timestamp.
    pub(crate) created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub(crate) updated_at: DateTime<Utc>,
}

impl Story {
    /// Accepts a new story request in `PROCESSING`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the prompt or user is blank.
    pub fn accept(
        id: Uuid,
        user_id: &str,
        prompt: &str,
        clock: &dyn Clock,
    ) -> Result<Self, DomainError> {
        if prompt.trim().is_empty() {
            return Err(DomainError::Validation("prompt must not be blank".into()));
        }
        if user_id.trim().is_empty() {
            return Err(DomainError::Validation("user_id must not be blank".into()));
        }
        let now = clock.now();
        Ok(Self {
            id,
            user_id: user_id.to_owned(),
            prompt: prompt.trim().to_owned(),
            status: StoryStatus::Processing,
            phase: GenerationPhase::Accepted,
            error_message: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Reconstitutes a story from its stored record. The pipeline phase is
    /// not persisted and restarts at `Accepted`.
    #[must_use]
    pub fn from_stored(stored: StoredStory) -> Self {
        Self {
            id: stored.id,
            user_id: stored.user_id,
            prompt: stored.prompt,
            status: stored.status,
            phase: GenerationPhase::Accepted,
            error_message: stored.error_message,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        }
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> StoryStatus {
        self.status
    }

    /// Current pipeline step.
    #[must_use]
    pub fn phase(&self) -> GenerationPhase {
        self.phase
    }

    /// Failure reason, set once `FAILED`.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// The prompt the story is generated from.
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Moves the story into `phase`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the story already reached a
    /// terminal status.
    pub fn enter(&mut self, phase: GenerationPhase) -> Result<(), DomainError> {
        self.ensure_processing()?;
        self.phase = phase;
        Ok(())
    }

    /// Transitions `PROCESSING` → `GENERATED`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the story is not `PROCESSING`.
    pub fn mark_generated(&mut self, clock: &dyn Clock) -> Result<(), DomainError> {
        self.ensure_processing()?;
        self.status = StoryStatus::Generated;
        self.updated_at = clock.now();
        Ok(())
    }

    /// Transitions `PROCESSING` → `FAILED`, recording `message`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the story is not `PROCESSING` or
    /// the message is blank.
    pub fn mark_failed(&mut self, message: &str, clock: &dyn Clock) -> Result<(), DomainError> {
        self.ensure_processing()?;
        if message.trim().is_empty() {
            return Err(DomainError::Validation(
                "failure message must not be blank".into(),
            ));
        }
        self.status = StoryStatus::Failed;
        self.error_message = Some(message.to_owned());
        self.updated_at = clock.now();
        Ok(())
    }

    fn ensure_processing(&self) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::Validation(format!(
                "story {} is already {}",
                self.id, self.status
            )));
        }
        Ok(())
    }

    /// Converts into the stored record (outline fields are written separately).
    #[must_use]
    pub fn to_stored(&self) -> StoredStory {
        StoredStory {
            id: self.id,
            user_id: self.user_id.clone(),
            prompt: self.prompt.clone(),
            title: None,
            description: None,
            banner_image_prompt: None,
            theme_audio_prompt: None,
            status: self.status,
            error_message: self.error_message.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

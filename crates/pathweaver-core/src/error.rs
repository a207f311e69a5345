//! Domain error types.

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A story was not found.
    #[error("story not found: {0}")]
    StoryNotFound(Uuid),

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// The generator returned a response that violates the requested shape
    /// (schema mismatch, wrong choice count, duplicate labels).
    #[error("generation contract violation: {0}")]
    GenerationContract(String),

    /// The generator backend failed (transport error, non-success status).
    #[error("generation error: {0}")]
    Generation(String),

    /// A single call exceeded its deadline.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Rendered media did not show up within the polling budget.
    #[error("{missing} asset(s) still missing after {iterations} polls")]
    AssetsIncomplete {
        /// Number of expected assets not present.
        missing: usize,
        /// Polling iterations spent.
        iterations: u32,
    },

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Returns `true` for failures a later attempt may not repeat.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::GenerationContract(_) | Self::Generation(_) | Self::Timeout(_)
        )
    }
}

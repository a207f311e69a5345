//! Tunables of the generation engine.

use std::str::FromStr;
use std::time::Duration;

use pathweaver_core::error::DomainError;

/// What to do when the polling budget runs out before every asset exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IncompleteAssetsPolicy {
    /// Mark the story `FAILED`.
    #[default]
    Fail,
    /// Mark the story `GENERATED` anyway and log the missing keys.
    Finalize,
}

impl FromStr for IncompleteAssetsPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "finalize" => Ok(Self::Finalize),
            other => Err(DomainError::Validation(format!(
                "unknown incomplete-assets policy: {other}"
            ))),
        }
    }
}

/// Limits and timeouts applied while generating one story.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSettings {
    /// Maximum number of choices between the root and any ending.
    pub max_depth: u32,
    /// Maximum generation calls in flight across the whole tree.
    pub max_concurrent: usize,
    /// Deadline of a single generation attempt.
    pub generation_timeout: Duration,
    /// Deadline of a single asset request.
    pub dispatch_timeout: Duration,
    /// Wait between asset inventory polls.
    pub poll_interval: Duration,
    /// Number of waits before giving up on missing assets.
    pub max_poll_iterations: u32,
    /// Outcome when assets are still missing after the last poll.
    pub incomplete_assets: IncompleteAssetsPolicy,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_concurrent: 50,
            generation_timeout: Duration::from_secs(60),
            dispatch_timeout: Duration::from_secs(1),
            poll_interval: Duration::from_secs(60),
            max_poll_iterations: 30,
            incomplete_assets: IncompleteAssetsPolicy::Fail,
        }
    }
}

//! Barrier that waits for externally produced media assets.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pathweaver_core::assets::AssetInventory;
use pathweaver_core::error::DomainError;
use pathweaver_core::sleeper::Sleeper;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of waiting for a story's assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionReport {
    /// Whether every expected asset was found.
    pub completed: bool,
    /// Expected suffixes still absent at the last check.
    pub missing: BTreeSet<String>,
    /// Waits performed before returning.
    pub iterations: u32,
}

/// Waits until the expected assets of a story exist.
#[async_trait]
pub trait CompletionGate: Send + Sync {
    /// Blocks (cooperatively) until every suffix in `expected` is present or
    /// the gate's budget runs out.
    ///
    /// # Errors
    ///
    /// Implementations return `DomainError::Infrastructure` when waiting
    /// itself is impossible.
    async fn await_completion(
        &self,
        story_id: Uuid,
        expected: &BTreeSet<String>,
    ) -> Result<CompletionReport, DomainError>;
}

/// Polls an `AssetInventory` at a fixed interval for a bounded number of
/// rounds.
pub struct PollingCompletionGate {
    inventory: Arc<dyn AssetInventory>,
    sleeper: Arc<dyn Sleeper>,
    poll_interval: Duration,
    max_iterations: u32,
}

impl PollingCompletionGate {
    /// Creates a gate that waits `poll_interval` between listings, at most
    /// `max_iterations` times.
    #[must_use]
    pub fn new(
        inventory: Arc<dyn AssetInventory>,
        sleeper: Arc<dyn Sleeper>,
        poll_interval: Duration,
        max_iterations: u32,
    ) -> Self {
        Self {
            inventory,
            sleeper,
            poll_interval,
            max_iterations,
        }
    }

    async fn missing(&self, story_id: Uuid, expected: &BTreeSet<String>) -> BTreeSet<String> {
        let present = match self.inventory.list_asset_keys(story_id).await {
            Ok(present) => present,
            Err(err) => {
                warn!(%story_id, error = %err, "asset listing failed, treating as empty");
                HashSet::new()
            }
        };
        expected
            .iter()
            .filter(|key| !present.contains(key.as_str()))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CompletionGate for PollingCompletionGate {
    async fn await_completion(
        &self,
        story_id: Uuid,
        expected: &BTreeSet<String>,
    ) -> Result<CompletionReport, DomainError> {
        let mut missing = self.missing(story_id, expected).await;
        let mut iterations = 0;

        while !missing.is_empty() && iterations < self.max_iterations {
            iterations += 1;
            debug!(%story_id, iterations, missing = missing.len(), "waiting for assets");
            self.sleeper.sleep(self.poll_interval).await;
            missing = self.missing(story_id, expected).await;
        }

        let completed = missing.is_empty();
        if completed {
            info!(%story_id, iterations, "all assets present");
        } else {
            warn!(%story_id, iterations, missing = missing.len(), "asset wait budget exhausted");
        }
        Ok(CompletionReport {
            completed,
            missing,
            iterations,
        })
    }
}

//! Test media collaborators: mock `AssetRenderer` and `AssetInventory`.

use std::collections::HashSet;
use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use pathweaver_core::assets::{AssetInventory, AssetRenderer, AssetRequest};
use pathweaver_core::error::DomainError;
use uuid::Uuid;

/// How the recording renderer answers a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderBehavior {
    /// Accept the request.
    Accept,
    /// Reject the request with an infrastructure error.
    Fail,
    /// Never answer.
    Hang,
}

type Behavior = dyn Fn(&AssetRequest) -> RenderBehavior + Send + Sync;

/// A renderer that records every request it receives.
pub struct RecordingAssetRenderer {
    behavior: Box<Behavior>,
    requests: Mutex<Vec<AssetRequest>>,
}

impl RecordingAssetRenderer {
    /// A renderer that accepts everything.
    #[must_use]
    pub fn accepting() -> Self {
        Self::new(|_| RenderBehavior::Accept)
    }

    /// A renderer whose answer is chosen per request.
    pub fn new(behavior: impl Fn(&AssetRequest) -> RenderBehavior + Send + Sync + 'static) -> Self {
        Self {
            behavior: Box::new(behavior),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of all received requests.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn requests(&self) -> Vec<AssetRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl fmt::Debug for RecordingAssetRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingAssetRenderer")
            .field("requests", &self.requests().len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AssetRenderer for RecordingAssetRenderer {
    async fn render(&self, request: &AssetRequest) -> Result<(), DomainError> {
        self.requests.lock().unwrap().push(request.clone());
        match (self.behavior)(request) {
            RenderBehavior::Accept => Ok(()),
            RenderBehavior::Fail => Err(DomainError::Infrastructure("renderer unavailable".into())),
            RenderBehavior::Hang => std::future::pending().await,
        }
    }
}

/// An inventory that replays a scripted series of listings. Call `n` returns
/// snapshot `n`; once the script runs out, the last snapshot repeats. A `None`
/// snapshot makes that call fail.
#[derive(Debug)]
pub struct ScriptedAssetInventory {
    snapshots: Vec<Option<HashSet<String>>>,
    calls: AtomicUsize,
}

impl ScriptedAssetInventory {
    /// Create an inventory replaying `snapshots`.
    ///
    /// # Panics
    ///
    /// Panics if `snapshots` is empty.
    #[must_use]
    pub fn new(snapshots: Vec<Option<HashSet<String>>>) -> Self {
        assert!(!snapshots.is_empty(), "at least one snapshot is required");
        Self {
            snapshots,
            calls: AtomicUsize::new(0),
        }
    }

    /// An inventory that always lists exactly `keys`.
    #[must_use]
    pub fn fixed<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(vec![Some(keys.into_iter().map(Into::into).collect())])
    }

    /// Number of listings served so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetInventory for ScriptedAssetInventory {
    async fn list_asset_keys(&self, _story_id: Uuid) -> Result<HashSet<String>, DomainError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let index = call.min(self.snapshots.len() - 1);
        self.snapshots[index]
            .clone()
            .ok_or_else(|| DomainError::Infrastructure("listing failed".into()))
    }
}

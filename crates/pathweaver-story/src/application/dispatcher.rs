//! Best-effort fan-out of media render requests.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use pathweaver_core::assets::{AssetKey, AssetRenderer, AssetRequest};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::tree::FlatStoryNode;

/// What happened to one round of asset requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Every key a request was sent for, in dispatch order.
    pub requested: Vec<AssetKey>,
    /// Requests the renderer rejected.
    pub failed: usize,
    /// Requests that did not answer within the dispatch timeout.
    pub timed_out: usize,
}

impl DispatchReport {
    /// The inventory suffixes that will exist once every requested asset has
    /// been produced.
    #[must_use]
    pub fn expected_suffixes(&self) -> BTreeSet<String> {
        self.requested.iter().map(AssetKey::suffix).collect()
    }
}

enum Outcome {
    Accepted,
    Failed,
    TimedOut,
}

/// Sends one render request per node, plus the banner and optional theme.
pub struct AssetRequestDispatcher {
    renderer: Arc<dyn AssetRenderer>,
    timeout: Duration,
}

impl AssetRequestDispatcher {
    /// Creates a dispatcher bounding each request by `timeout`.
    #[must_use]
    pub fn new(renderer: Arc<dyn AssetRenderer>, timeout: Duration) -> Self {
        Self { renderer, timeout }
    }

    /// Sends all requests concurrently. Individual failures and timeouts are
    /// logged and counted, never retried and never returned as errors; the
    /// completion gate decides whether the story can finish.
    pub async fn dispatch(
        &self,
        story_id: Uuid,
        nodes: &[FlatStoryNode],
        banner_prompt: &str,
        theme_prompt: Option<&str>,
    ) -> DispatchReport {
        let mut requests: Vec<AssetRequest> = nodes
            .iter()
            .map(|node| AssetRequest {
                key: AssetKey::node(story_id, node.id),
                prompt: node.image_prompt.clone(),
            })
            .collect();
        requests.push(AssetRequest {
            key: AssetKey::banner(story_id),
            prompt: banner_prompt.to_owned(),
        });
        if let Some(theme) = theme_prompt {
            requests.push(AssetRequest {
                key: AssetKey::theme(story_id),
                prompt: theme.to_owned(),
            });
        }

        let outcomes = join_all(requests.iter().map(|request| self.send(request))).await;

        let mut report = DispatchReport {
            requested: requests.iter().map(|r| r.key).collect(),
            ..DispatchReport::default()
        };
        for outcome in outcomes {
            match outcome {
                Outcome::Accepted => {}
                Outcome::Failed => report.failed += 1,
                Outcome::TimedOut => report.timed_out += 1,
            }
        }

        info!(
            %story_id,
            requested = report.requested.len(),
            failed = report.failed,
            timed_out = report.timed_out,
            "asset requests dispatched"
        );
        report
    }

    async fn send(&self, request: &AssetRequest) -> Outcome {
        match tokio::time::timeout(self.timeout, self.renderer.render(request)).await {
            Ok(Ok(())) => Outcome::Accepted,
            Ok(Err(err)) => {
                warn!(key = %request.key, error = %err, "asset request failed");
                Outcome::Failed
            }
            Err(_) => {
                warn!(key = %request.key, timeout = ?self.timeout, "asset request timed out");
                Outcome::TimedOut
            }
        }
    }
}

//! Test generator: scripted `StructuredGenerator` for tests.

use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pathweaver_core::error::DomainError;
use pathweaver_core::generator::{GenerationRequest, StructuredGenerator};

/// What a scripted call answers with.
#[derive(Debug)]
pub enum ScriptedReply {
    /// Return this JSON value.
    Json(serde_json::Value),
    /// Fail with this error.
    Fail(DomainError),
    /// Never answer; the caller's timeout has to fire.
    Hang,
}

type Handler = dyn Fn(&GenerationRequest, usize) -> ScriptedReply + Send + Sync;

/// A generator that answers through a handler closure. The handler receives
/// each request together with its zero-based call index. All requests are
/// recorded and the peak number of concurrent calls is tracked.
pub struct ScriptedGenerator {
    handler: Box<Handler>,
    latency: Option<Duration>,
    requests: Mutex<Vec<GenerationRequest>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedGenerator {
    /// Create a generator answering through `handler`.
    pub fn new(
        handler: impl Fn(&GenerationRequest, usize) -> ScriptedReply + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            latency: None,
            requests: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Delay every answer by `latency` (tokio time, so paused clocks apply).
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Returns a snapshot of all received requests in arrival order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of calls received so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Highest number of calls that were in flight at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for ScriptedGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedGenerator")
            .field("latency", &self.latency)
            .field("calls", &self.call_count())
            .field("peak_in_flight", &self.peak_in_flight())
            .finish_non_exhaustive()
    }
}

/// Decrements the in-flight counter when a call finishes or is cancelled.
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl StructuredGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<serde_json::Value, DomainError> {
        let call_index = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len() - 1
        };

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match (self.handler)(request, call_index) {
            ScriptedReply::Json(value) => Ok(value),
            ScriptedReply::Fail(err) => Err(err),
            ScriptedReply::Hang => std::future::pending().await,
        }
    }
}

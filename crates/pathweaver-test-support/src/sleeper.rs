//! Test sleeper: returns immediately and records what was requested.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use pathweaver_core::sleeper::Sleeper;

/// A sleeper that never waits. Every requested duration is recorded.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    /// Create a new recording sleeper.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all requested sleeps.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        tokio::task::yield_now().await;
    }
}

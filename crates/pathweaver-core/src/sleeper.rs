//! Cooperative sleep primitive.
//!
//! The completion gate suspends between inventory polls through this trait
//! so a durable-workflow runtime (or a test) can supply its own sleep.

use std::time::Duration;

use async_trait::async_trait;

/// Suspends the current task for a duration.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Sleep for `duration`, yielding to other tasks meanwhile.
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_tokio_sleeper_advances_virtual_time() {
        let start = tokio::time::Instant::now();

        TokioSleeper.sleep(Duration::from_secs(60)).await;

        assert!(start.elapsed() >= Duration::from_secs(60));
    }
}

//! Per-attempt timeout and bounded retry around a generation call.

use std::time::Duration;

use pathweaver_core::error::DomainError;
use pathweaver_core::generator::{GenerationRequest, StructuredGenerator};
use tokio_retry2::strategy::FixedInterval;
use tokio_retry2::{Retry, RetryError};
use tracing::warn;

/// Attempts made for every generation call before giving up.
pub const MAX_GENERATION_ATTEMPTS: u32 = 3;

/// Retries follow a failed attempt immediately.
const RETRY_DELAY_MS: u64 = 0;

/// Issues `request`, bounding each attempt by `timeout`, and turns the reply
/// into `T` with `validate`. Timeouts, backend errors and contract violations
/// raised by `validate` are retried alike, up to `MAX_GENERATION_ATTEMPTS`.
///
/// # Errors
///
/// Returns the last attempt's error once all attempts failed, or the first
/// non-retryable error.
pub async fn generate_validated<T, F>(
    generator: &dyn StructuredGenerator,
    request: &GenerationRequest,
    timeout: Duration,
    validate: F,
) -> Result<T, DomainError>
where
    F: Fn(serde_json::Value) -> Result<T, DomainError> + Send + Sync,
{
    let validate = &validate;
    let strategy =
        FixedInterval::from_millis(RETRY_DELAY_MS).take(MAX_GENERATION_ATTEMPTS as usize - 1);
    let mut attempt = 0;

    Retry::spawn(strategy, || {
        attempt += 1;
        let attempt = attempt;
        async move {
            let outcome = match tokio::time::timeout(timeout, generator.generate(request)).await {
                Ok(Ok(value)) => validate(value),
                Ok(Err(err)) => Err(err),
                Err(_) => Err(DomainError::Timeout(timeout)),
            };
            outcome.map_err(|err| classify(request.task, attempt, err))
        }
    })
    .await
}

/// Transient errors are retried by the strategy; permanent ones end the call.
fn classify(task: &str, attempt: u32, err: DomainError) -> RetryError<DomainError> {
    if !err.is_retryable() {
        warn!(task, attempt, error = %err, "generation failed");
        return RetryError::Permanent(err);
    }
    if attempt < MAX_GENERATION_ATTEMPTS {
        warn!(task, attempt, error = %err, "generation attempt failed, retrying");
    } else {
        warn!(task, attempt, error = %err, "generation failed");
    }
    RetryError::Transient {
        err,
        retry_after: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathweaver_test_support::{ScriptedGenerator, ScriptedReply};
    use serde_json::json;

    fn request() -> GenerationRequest {
        GenerationRequest {
            task: "echo",
            instructions: String::new(),
            prompt: "ping".to_owned(),
            response_schema: json!({}),
        }
    }

    fn as_string(value: serde_json::Value) -> Result<String, DomainError> {
        value
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| DomainError::GenerationContract("expected a string".into()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_timeouts_then_success_is_transparent() {
        // Arrange
        let generator = ScriptedGenerator::new(|_, call| {
            if call < 2 {
                ScriptedReply::Hang
            } else {
                ScriptedReply::Json(json!("pong"))
            }
        });

        // Act
        let result =
            generate_validated(&generator, &request(), Duration::from_secs(5), as_string).await;

        // Assert
        assert_eq!(result.unwrap(), "pong");
        assert_eq!(generator.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_three_timeouts() {
        let generator = ScriptedGenerator::new(|_, _| ScriptedReply::Hang);

        let result =
            generate_validated(&generator, &request(), Duration::from_secs(5), as_string).await;

        match result.unwrap_err() {
            DomainError::Timeout(after) => assert_eq!(after, Duration::from_secs(5)),
            other => panic!("expected Timeout, got {other:?}"),
        }
        assert_eq!(generator.call_count(), 3);
    }

    #[tokio::test]
    async fn test_contract_violations_are_retried() {
        let generator = ScriptedGenerator::new(|_, call| {
            if call == 0 {
                ScriptedReply::Json(json!(42))
            } else {
                ScriptedReply::Json(json!("fixed"))
            }
        });

        let result =
            generate_validated(&generator, &request(), Duration::from_secs(5), as_string).await;

        assert_eq!(result.unwrap(), "fixed");
        assert_eq!(generator.call_count(), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_error_fails_immediately() {
        let generator = ScriptedGenerator::new(|_, _| {
            ScriptedReply::Fail(DomainError::Infrastructure("misconfigured".into()))
        });

        let result =
            generate_validated(&generator, &request(), Duration::from_secs(5), as_string).await;

        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
        assert_eq!(generator.call_count(), 1);
    }
}

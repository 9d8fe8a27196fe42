//! Bounded retry with exponential back-off around single service calls.

use std::future::Future;
use std::time::Duration;

use backlog::{RetryConfig, RetryPolicy, ServiceError, SyncError, WorkItemId};
use tokio::time::Instant;

/// Runs `call` until it succeeds, fails with a non-retryable error, exhausts
/// `retry.max_retries`, or runs into `deadline`.
///
/// A deadline that has already passed prevents the call from being issued at
/// all; a deadline that passes mid-call cancels the in-flight future.
pub(crate) async fn with_retry<T, F, Fut>(
    retry: &RetryConfig,
    deadline: Option<Instant>,
    item: Option<WorkItemId>,
    operation: &'static str,
    mut call: F,
) -> Result<T, SyncError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;

        let outcome = match deadline {
            Some(d) if Instant::now() >= d => return Err(SyncError::DeadlineExceeded),
            Some(d) => tokio::time::timeout_at(d, call())
                .await
                .map_err(|_| SyncError::DeadlineExceeded)?,
            None => call().await,
        };

        let err = match outcome {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let after = match err.retry_policy() {
            RetryPolicy::NonRetryable => return Err(escalate(err, item)),
            RetryPolicy::Retryable { after } => after,
        };

        if attempt > retry.max_retries {
            tracing::warn!(
                operation,
                item = item.map(|id| id.as_u64()),
                attempts = attempt,
                error = %err,
                "Retries exhausted"
            );
            return Err(SyncError::GatewayUnavailable {
                attempts: attempt,
                status: err.status(),
                item,
                message: err.to_string(),
            });
        }

        let delay = retry_delay(retry, attempt, after);
        if let Some(d) = deadline {
            match Instant::now().checked_add(delay) {
                Some(wake) if wake < d => {}
                _ => return Err(SyncError::DeadlineExceeded),
            }
        }
        tracing::warn!(
            operation,
            item = item.map(|id| id.as_u64()),
            attempt,
            max_retries = retry.max_retries,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Transient service failure; retrying"
        );
        tokio::time::sleep(delay).await;
    }
}

/// A service-supplied `Retry-After` wins over the computed back-off but is
/// still capped at `retry.max_backoff_ms`.
fn retry_delay(retry: &RetryConfig, attempt: u32, after: Option<Duration>) -> Duration {
    let cap = Duration::from_millis(retry.max_backoff_ms);
    after
        .unwrap_or_else(|| retry.backoff_for(attempt))
        .min(cap)
}

/// Maps a non-retryable service error into the caller-facing taxonomy.
fn escalate(err: ServiceError, item: Option<WorkItemId>) -> SyncError {
    match err {
        ServiceError::Status {
            status, message, ..
        } => SyncError::RequestRejected {
            status,
            item,
            message,
        },
        ServiceError::Malformed { message } => SyncError::MalformedResponse { item, message },
        // Timeouts and transport failures are always retryable and only reach
        // this point through a misclassification.
        other => SyncError::GatewayUnavailable {
            attempts: 1,
            status: None,
            item,
            message: other.to_string(),
        },
    }
}

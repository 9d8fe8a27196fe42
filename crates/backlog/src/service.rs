//! Port trait for the tracking service.
//!
//! [`WorkItemService`] is the seam between the domain and whatever transport
//! reaches the service. Implementations perform exactly one round trip per
//! call and never retry: retry, batching and concurrency decisions belong to
//! the orchestration layer, which drives them from
//! [`ServiceError::retry_policy`].

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::query::QueryText;
use crate::{ContinuationToken, FieldChange, FieldName, RetryPolicy, WorkItemId, WorkItemRecord};

/// One page of identifiers returned by a query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryPage {
    /// Identifiers in the query's own ORDER BY order.
    pub ids: Vec<WorkItemId>,
    /// Token for the next page; `None` on the last page.
    pub continuation: Option<ContinuationToken>,
}

/// A single failed call to the service, before any retry decision.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    /// The call did not complete within the per-call timeout.
    #[error("Request timed out: {message}")]
    Timeout { message: String },

    /// The connection failed before a response was received.
    #[error("Transport failure: {message}")]
    Transport { message: String },

    /// The service answered with a non-success status.
    #[error("Service responded with status {status}: {message}")]
    Status {
        status: u16,
        message: String,
        /// Delay requested by the service (`Retry-After`), if any.
        retry_after: Option<Duration>,
    },

    /// The service answered successfully but the payload could not be decoded.
    #[error("Malformed response: {message}")]
    Malformed { message: String },
}

impl ServiceError {
    /// Classifies the failure for the retry loop.
    ///
    /// Timeouts, transport failures, 408, 429 and 5xx are transient; any other
    /// status and undecodable payloads are not.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            ServiceError::Timeout { .. } | ServiceError::Transport { .. } => {
                RetryPolicy::Retryable { after: None }
            }
            ServiceError::Status {
                status,
                retry_after,
                ..
            } if *status == 408 || *status == 429 || (500..600).contains(status) => {
                RetryPolicy::Retryable {
                    after: *retry_after,
                }
            }
            ServiceError::Status { .. } | ServiceError::Malformed { .. } => {
                RetryPolicy::NonRetryable
            }
        }
    }

    /// HTTP status, when the failure was a status response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ServiceError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// The tracking service as seen by the domain.
#[async_trait]
pub trait WorkItemService: Send + Sync {
    /// Executes `query`, returning one page of identifiers.
    ///
    /// `continuation` is `None` for the first page and the previous page's
    /// token afterwards.
    async fn query_page(
        &self,
        query: &QueryText,
        continuation: Option<&ContinuationToken>,
    ) -> Result<QueryPage, ServiceError>;

    /// Fetches full records for at most one batch of identifiers.
    ///
    /// Records may come back in any order; identifiers the service no longer
    /// knows may be missing from the result.
    async fn get_batch(
        &self,
        ids: &[WorkItemId],
        fields: &[FieldName],
    ) -> Result<Vec<WorkItemRecord>, ServiceError>;

    /// Applies every change in `changes` to one work item as a single patch
    /// document, returning the updated record.
    async fn patch_item(
        &self,
        id: WorkItemId,
        changes: &[FieldChange],
    ) -> Result<WorkItemRecord, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> ServiceError {
        ServiceError::Status {
            status: code,
            message: String::new(),
            retry_after: None,
        }
    }

    #[test]
    fn test_transient_failures_are_retryable() {
        for err in [
            status(500),
            status(503),
            status(429),
            status(408),
            ServiceError::Timeout {
                message: "slow".into(),
            },
            ServiceError::Transport {
                message: "reset".into(),
            },
        ] {
            assert!(err.retry_policy().is_retryable(), "{err}");
        }
    }

    #[test]
    fn test_client_errors_are_not_retryable() {
        for code in [400, 401, 403, 404, 409] {
            assert_eq!(status(code).retry_policy(), RetryPolicy::NonRetryable);
        }
        let malformed = ServiceError::Malformed {
            message: "eof".into(),
        };
        assert_eq!(malformed.retry_policy(), RetryPolicy::NonRetryable);
    }

    #[test]
    fn test_retry_after_is_carried_into_policy() {
        let err = ServiceError::Status {
            status: 429,
            message: "slow down".into(),
            retry_after: Some(Duration::from_secs(2)),
        };
        assert_eq!(
            err.retry_policy(),
            RetryPolicy::Retryable {
                after: Some(Duration::from_secs(2))
            }
        );
    }
}

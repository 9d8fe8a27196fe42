//! Top-level error and retry-policy types for the backlog sync domain.
//!
//! [`SyncError`] is the taxonomy surfaced to callers of a sync workflow.
//! Component-level errors ([`crate::order::ReorderError`] for intent
//! preconditions, [`crate::service::ServiceError`] for raw transport failures)
//! are defined in their respective modules and folded into [`SyncError`] at the
//! boundary where retry decisions have been made.
//!
//! [`RetryPolicy`] is a cross-cutting concern: any error type that participates
//! in retry decisions must be able to produce a [`RetryPolicy`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::order::ReorderError;
use crate::WorkItemId;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// Returned by [`crate::service::ServiceError::retry_policy`] so the gateway
/// can decide whether to re-issue a call without escalating.
///
/// - `Retryable` errors: timeouts, connection failures, 5xx responses,
///   rate-limit (429) responses.
/// - `NonRetryable` errors: any other 4xx, undecodable payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    ///
    /// `after` optionally specifies the minimum delay before retrying (e.g.
    /// derived from a `Retry-After` response header).
    Retryable {
        /// Minimum back-off before the next attempt. `None` means apply the
        /// caller's own back-off schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried; the error propagates immediately.
    NonRetryable,
}

impl RetryPolicy {
    /// Returns `true` for [`RetryPolicy::Retryable`].
    pub fn is_retryable(&self) -> bool {
        matches!(self, RetryPolicy::Retryable { .. })
    }
}

// ---------------------------------------------------------------------------
// Workflow-level errors
// ---------------------------------------------------------------------------

/// Errors surfaced by the sync workflow to its caller.
///
/// Transport-level transient errors never appear here until their retry budget
/// is exhausted; everything else propagates immediately with enough detail
/// (identifier, field, underlying status) to retry or report.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum SyncError {
    /// Malformed caller input (query spec, field name, reorder request).
    ///
    /// Never retried; surfaced immediately.
    #[error("Invalid spec: {message}")]
    InvalidSpec {
        /// Description of what is wrong with the input.
        message: String,
    },

    /// The service refused the request (authorization, not-found, bad request).
    ///
    /// Never retried.
    #[error("Request rejected with status {status}{}: {message}", fmt_item(.item))]
    RequestRejected {
        /// HTTP status reported by the service.
        status: u16,
        /// The work item the rejected request targeted, when it targeted one.
        item: Option<WorkItemId>,
        /// Message extracted from the service's error payload.
        message: String,
    },

    /// A transient transport failure persisted after every retry was spent.
    #[error("Gateway unavailable after {attempts} attempt(s){}: {message}", fmt_item(.item))]
    GatewayUnavailable {
        /// Total number of attempts made, including the first.
        attempts: u32,
        /// Last HTTP status seen, if the failure was a status response.
        status: Option<u16>,
        /// The work item the failing request targeted, when it targeted one.
        item: Option<WorkItemId>,
        /// Description of the last failure.
        message: String,
    },

    /// The service answered with a payload that could not be interpreted.
    #[error("Malformed response{}: {message}", fmt_item(.item))]
    MalformedResponse {
        /// The work item whose record was malformed, if known.
        item: Option<WorkItemId>,
        /// Description of the decoding problem.
        message: String,
    },

    /// A reorder precondition was violated.
    #[error(transparent)]
    Reorder(#[from] ReorderError),

    /// The caller-supplied deadline passed before the operation completed.
    #[error("Deadline exceeded before the operation completed")]
    DeadlineExceeded,

    /// The runtime configuration is invalid.
    ///
    /// Produced at load time; no workflow starts with an invalid config.
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Description of the configuration problem.
        message: String,
    },
}

impl SyncError {
    /// Shorthand for [`SyncError::InvalidSpec`].
    pub fn invalid_spec(message: impl Into<String>) -> Self {
        SyncError::InvalidSpec {
            message: message.into(),
        }
    }

    /// Shorthand for [`SyncError::ConfigurationError`].
    pub fn configuration(message: impl Into<String>) -> Self {
        SyncError::ConfigurationError {
            message: message.into(),
        }
    }
}

fn fmt_item(item: &Option<WorkItemId>) -> String {
    match item {
        Some(id) => format!(" for work item {id}"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_display_includes_item() {
        let err = SyncError::RequestRejected {
            status: 404,
            item: WorkItemId::new(9),
            message: "not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Request rejected with status 404 for work item 9: not found"
        );
    }

    #[test]
    fn test_unavailable_display_without_item() {
        let err = SyncError::GatewayUnavailable {
            attempts: 4,
            status: Some(503),
            item: None,
            message: "service unavailable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Gateway unavailable after 4 attempt(s): service unavailable"
        );
    }

    #[test]
    fn test_reorder_error_is_transparent() {
        let err = SyncError::from(ReorderError::EmptyIntent);
        assert_eq!(err.to_string(), ReorderError::EmptyIntent.to_string());
    }
}

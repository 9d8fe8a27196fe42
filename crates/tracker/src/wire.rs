//! JSON shapes exchanged with the work item REST API, plus the pure helpers
//! that translate between them and the domain.

use std::time::Duration;

use backlog::{ContinuationToken, FieldChange, WorkItemId, WorkItemRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response header carrying the next-page token for WIQL queries.
pub const CONTINUATION_HEADER: &str = "x-ms-continuationtoken";

/// Content type the service requires for patch documents.
pub const JSON_PATCH: &str = "application/json-patch+json";

#[derive(Debug, Serialize)]
pub struct WiqlRequest<'a> {
    pub query: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct WorkItemReference {
    pub id: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WiqlResponse {
    #[serde(default)]
    pub work_items: Vec<WorkItemReference>,
    #[serde(default)]
    pub continuation_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchRequest<'a> {
    pub ids: Vec<u64>,
    pub fields: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
pub struct BatchResponse {
    #[serde(default)]
    pub value: Vec<WorkItemRecord>,
}

/// One JSON Patch operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchOp<'a> {
    pub op: &'static str,
    pub path: String,
    pub value: &'a Value,
}

/// Error body returned with most non-success statuses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Builds the JSON Patch document for one item. Every change is an `add`,
/// which the service treats as set-or-replace.
pub fn patch_document(changes: &[FieldChange]) -> Vec<PatchOp<'_>> {
    changes
        .iter()
        .map(|change| PatchOp {
            op: "add",
            path: format!("/fields/{}", change.field),
            value: &change.value,
        })
        .collect()
}

/// Converts WIQL references into identifiers, rejecting the invalid id `0`.
pub fn query_ids(refs: &[WorkItemReference]) -> Result<Vec<WorkItemId>, String> {
    refs.iter()
        .map(|r| WorkItemId::new(r.id).ok_or_else(|| format!("invalid work item id {}", r.id)))
        .collect()
}

/// Picks the continuation token, preferring the response header over the body.
/// Blank tokens mean there is no further page.
pub fn continuation(header: Option<&str>, body: Option<String>) -> Option<ContinuationToken> {
    let present = |t: &String| !t.trim().is_empty();
    header
        .map(str::to_string)
        .filter(present)
        .or(body.filter(present))
        .and_then(ContinuationToken::new)
}

/// Parses a `Retry-After` value given in (possibly fractional) seconds.
/// HTTP-date values are ignored and fall back to computed back-off.
pub fn parse_retry_after(raw: &str) -> Option<Duration> {
    let secs: f64 = raw.trim().parse().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}

/// Extracts a human-readable message from an error response body.
pub fn error_message(body: &str) -> String {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| body.trim().to_string());
    if message.is_empty() {
        "no response body".to_string()
    } else {
        message
    }
}

//! Update Batcher: one patch document per work item, dispatched concurrently.
//!
//! The tracking service updates one item per call and has no cross-item
//! transaction, so a batch is never atomic. Each identifier's outcome is
//! recorded independently and the report covers every identifier submitted.

use std::collections::BTreeMap;

use backlog::{
    FieldChange, FieldName, PatchOperation, RetryConfig, SyncError, WorkItemId, WorkItemService,
};
use futures_util::stream::{self, StreamExt};
use serde_json::Value;
use tokio::time::Instant;

use crate::report::{BatchReport, PatchOutcome};
use crate::retry::with_retry;

/// Groups and dispatches [`PatchOperation`]s.
pub struct UpdateBatcher<'a, S: ?Sized> {
    service: &'a S,
    retry: RetryConfig,
    concurrency: usize,
}

impl<'a, S> UpdateBatcher<'a, S>
where
    S: WorkItemService + ?Sized,
{
    pub fn new(service: &'a S, retry: RetryConfig, concurrency: usize) -> Self {
        Self {
            service,
            retry,
            concurrency: concurrency.max(1),
        }
    }

    /// Applies `operations`, returning one outcome per distinct identifier.
    ///
    /// Operations on the same identifier are merged into one patch document;
    /// when the same field is assigned twice the later assignment wins.
    /// A failure on one identifier never prevents the others from being
    /// attempted, and nothing is rolled back.
    pub async fn apply(
        &self,
        operations: Vec<PatchOperation>,
        deadline: Option<Instant>,
    ) -> BatchReport {
        let grouped = group_by_item(operations);
        tracing::info!(
            items = grouped.len(),
            concurrency = self.concurrency,
            "Dispatching patches"
        );

        let outcomes: BTreeMap<WorkItemId, PatchOutcome> = stream::iter(grouped)
            .map(|(id, changes)| async move {
                let result = with_retry(&self.retry, deadline, Some(id), "patch", || {
                    self.service.patch_item(id, &changes)
                })
                .await;
                (id, outcome_of(id, result.map(|_| ())))
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let report = BatchReport { outcomes };
        tracing::info!(
            applied = report.applied().len(),
            failed = report.failed().len(),
            cancelled = report.cancelled().len(),
            "Patch dispatch finished"
        );
        report
    }
}

fn outcome_of(id: WorkItemId, result: Result<(), SyncError>) -> PatchOutcome {
    match result {
        Ok(()) => PatchOutcome::Applied,
        Err(SyncError::DeadlineExceeded) => {
            tracing::warn!(%id, "Patch cancelled by deadline");
            PatchOutcome::Cancelled
        }
        Err(error) => {
            tracing::warn!(%id, %error, "Patch failed");
            PatchOutcome::Failed { error }
        }
    }
}

/// Merges operations into one ordered change list per identifier.
fn group_by_item(operations: Vec<PatchOperation>) -> BTreeMap<WorkItemId, Vec<FieldChange>> {
    let mut by_item: BTreeMap<WorkItemId, BTreeMap<FieldName, Value>> = BTreeMap::new();
    for op in operations {
        by_item.entry(op.id).or_default().insert(op.field, op.value);
    }
    by_item
        .into_iter()
        .map(|(id, fields)| {
            let changes = fields
                .into_iter()
                .map(|(field, value)| FieldChange { field, value })
                .collect();
            (id, changes)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn op(id: u64, field: &str, value: Value) -> PatchOperation {
        PatchOperation {
            id: WorkItemId::new(id).unwrap(),
            field: FieldName::new(field).unwrap(),
            value,
        }
    }

    #[test]
    fn test_group_merges_fields_per_item() {
        let grouped = group_by_item(vec![
            op(2, "Rank", json!(1.0)),
            op(1, "Rank", json!(5.0)),
            op(2, "State", json!("Active")),
        ]);

        assert_eq!(grouped.len(), 2);
        let two = &grouped[&WorkItemId::new(2).unwrap()];
        assert_eq!(two.len(), 2);
    }

    #[test]
    fn test_group_keeps_last_write_per_field() {
        let grouped = group_by_item(vec![op(1, "Rank", json!(1.0)), op(1, "Rank", json!(2.0))]);
        let one = &grouped[&WorkItemId::new(1).unwrap()];
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].value, json!(2.0));
    }

    #[test]
    fn test_deadline_maps_to_cancelled() {
        let id = WorkItemId::new(1).unwrap();
        assert_eq!(
            outcome_of(id, Err(SyncError::DeadlineExceeded)),
            PatchOutcome::Cancelled
        );
        assert_eq!(outcome_of(id, Ok(())), PatchOutcome::Applied);
    }
}

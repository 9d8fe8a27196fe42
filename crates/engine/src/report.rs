//! Structured results of patch dispatch and of whole workflow runs.
//!
//! Partial success is an expected outcome of a multi-item update, so it is
//! reported here rather than raised as an error.

use std::collections::BTreeMap;

use backlog::{Resolution, SyncError, SyncRunId, WorkItemId};
use serde::{Deserialize, Serialize};

/// What happened to the patch for one work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum PatchOutcome {
    /// The service accepted the patch.
    Applied,
    /// The patch failed; retrying it wholesale is safe.
    Failed { error: SyncError },
    /// The caller's deadline passed before the patch was issued or while it
    /// was in flight. An in-flight patch may or may not have landed.
    Cancelled,
}

/// Per-identifier outcomes of one batcher run.
///
/// Every identifier that was submitted appears exactly once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub outcomes: BTreeMap<WorkItemId, PatchOutcome>,
}

impl BatchReport {
    /// Identifiers whose patch was applied.
    pub fn applied(&self) -> Vec<WorkItemId> {
        self.select(|o| matches!(o, PatchOutcome::Applied))
    }

    /// Identifiers whose patch failed, with the reason.
    pub fn failed(&self) -> Vec<(WorkItemId, &SyncError)> {
        self.outcomes
            .iter()
            .filter_map(|(id, outcome)| match outcome {
                PatchOutcome::Failed { error } => Some((*id, error)),
                _ => None,
            })
            .collect()
    }

    /// Identifiers whose patch was cancelled by the deadline.
    pub fn cancelled(&self) -> Vec<WorkItemId> {
        self.select(|o| matches!(o, PatchOutcome::Cancelled))
    }

    /// Returns `true` when every submitted patch was applied.
    pub fn all_applied(&self) -> bool {
        self.outcomes
            .values()
            .all(|o| matches!(o, PatchOutcome::Applied))
    }

    /// Number of identifiers reported.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Returns `true` when nothing was submitted.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    fn select(&self, pred: impl Fn(&PatchOutcome) -> bool) -> Vec<WorkItemId> {
        self.outcomes
            .iter()
            .filter(|(_, o)| pred(o))
            .map(|(id, _)| *id)
            .collect()
    }
}

/// Result of one `reorder` or `reprioritize` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub run_id: SyncRunId,
    /// Values computed by the resolver.
    pub resolution: Resolution,
    /// Items the query matched but the detail fetch no longer returned
    /// (deleted or moved out of reach in between). They were left out of the
    /// ordering context.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<WorkItemId>,
    /// Outcome of the renumber phase, when one was needed and dispatched.
    pub renumber: Option<BatchReport>,
    /// Outcome of the placement phase. `None` when nothing was dispatched:
    /// either a dry run, or the renumber phase did not fully apply.
    pub placement: Option<BatchReport>,
    /// `true` when the run only resolved values and patched nothing.
    pub dry_run: bool,
}

impl SyncReport {
    /// Returns `true` when placement was skipped because the renumber phase
    /// left some items unpatched.
    pub fn placement_aborted(&self) -> bool {
        !self.dry_run && self.placement.is_none()
    }

    /// Returns `true` when every dispatched patch was applied.
    pub fn is_complete(&self) -> bool {
        !self.placement_aborted()
            && self.renumber.as_ref().map_or(true, BatchReport::all_applied)
            && self.placement.as_ref().map_or(true, BatchReport::all_applied)
    }
}

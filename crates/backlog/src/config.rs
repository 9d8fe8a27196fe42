//! Runtime configuration consumed by the domain and orchestration layers.
//!
//! Every section deserialises from TOML with per-field defaults, so an empty
//! table is a valid configuration. [`SyncConfig::validate`] must be called
//! before any workflow starts; invalid values produce
//! [`SyncError::ConfigurationError`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{FieldName, SyncError};

// ---------------------------------------------------------------------------
// Field mapping
// ---------------------------------------------------------------------------

/// Maps each logical work item field to the service's field reference name.
///
/// Defaults target the Azure DevOps Agile process template. Scrum projects
/// typically override `order` with `Microsoft.VSTS.Common.BacklogPriority`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMap {
    pub id: FieldName,
    pub work_item_type: FieldName,
    pub title: FieldName,
    pub state: FieldName,
    pub assignee: FieldName,
    pub area_path: FieldName,
    pub iteration_path: FieldName,
    pub tags: FieldName,
    pub changed_date: FieldName,
    pub project: FieldName,
    /// The numeric rank field used for relative ordering.
    pub order: FieldName,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            id: field("System.Id"),
            work_item_type: field("System.WorkItemType"),
            title: field("System.Title"),
            state: field("System.State"),
            assignee: field("System.AssignedTo"),
            area_path: field("System.AreaPath"),
            iteration_path: field("System.IterationPath"),
            tags: field("System.Tags"),
            changed_date: field("System.ChangedDate"),
            project: field("System.TeamProject"),
            order: field("Microsoft.VSTS.Common.StackRank"),
        }
    }
}

impl FieldMap {
    /// Fields requested by a detail fetch.
    pub fn detail_fields(&self) -> Vec<FieldName> {
        vec![
            self.id.clone(),
            self.work_item_type.clone(),
            self.title.clone(),
            self.state.clone(),
            self.assignee.clone(),
            self.area_path.clone(),
            self.iteration_path.clone(),
            self.tags.clone(),
            self.changed_date.clone(),
            self.order.clone(),
        ]
    }

    fn all(&self) -> [(&'static str, &FieldName); 11] {
        [
            ("id", &self.id),
            ("work_item_type", &self.work_item_type),
            ("title", &self.title),
            ("state", &self.state),
            ("assignee", &self.assignee),
            ("area_path", &self.area_path),
            ("iteration_path", &self.iteration_path),
            ("tags", &self.tags),
            ("changed_date", &self.changed_date),
            ("project", &self.project),
            ("order", &self.order),
        ]
    }
}

fn field(name: &'static str) -> FieldName {
    FieldName::from_static(name)
}

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Request-size and concurrency limits for gateway calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum identifiers per batch-get call.
    pub batch_size: usize,
    /// Maximum number of gateway calls in flight at once.
    pub concurrency: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            batch_size: 200,
            concurrency: 4,
        }
    }
}

// ---------------------------------------------------------------------------
// Retry
// ---------------------------------------------------------------------------

/// Bounded exponential back-off applied to transient gateway failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt. `0` disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_backoff_ms: u64,
    /// Upper bound for any single delay.
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 10_000,
        }
    }
}

impl RetryConfig {
    /// Back-off before retry number `retry` (1-based): doubles each time,
    /// capped at `max_backoff_ms`.
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(32);
        let millis = self
            .initial_backoff_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_backoff_ms);
        Duration::from_millis(millis)
    }
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// How TOP placement picks a value below the current minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopStrategy {
    /// `min - step`; values may go negative.
    #[default]
    Subtract,
    /// Subdivide `(0, min)`; keeps values positive for services that require it.
    Halve,
}

/// Parameters of the fractional-rank placement algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderingPolicy {
    /// Smallest interval between adjacent assigned values before a renumber
    /// is forced.
    pub min_gap: f64,
    /// Spacing between consecutive values after a renumber.
    pub renumber_stride: f64,
    /// Distance past the current minimum/maximum used by TOP and BOTTOM.
    pub step: f64,
    /// TOP placement convention.
    pub top_strategy: TopStrategy,
}

impl Default for OrderingPolicy {
    fn default() -> Self {
        Self {
            min_gap: 1e-6,
            renumber_stride: 1000.0,
            step: 1.0,
            top_strategy: TopStrategy::Subtract,
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregate
// ---------------------------------------------------------------------------

/// Service-agnostic configuration for one sync engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub fields: FieldMap,
    pub limits: Limits,
    pub retry: RetryConfig,
    pub ordering: OrderingPolicy,
}

impl SyncConfig {
    /// Checks every section, returning the first problem found.
    pub fn validate(&self) -> Result<(), SyncError> {
        for (key, name) in self.fields.all() {
            let raw = name.as_str();
            if raw.trim().is_empty() || raw.contains(['[', ']']) {
                return Err(SyncError::configuration(format!(
                    "fields.{key} is not a valid field reference: '{raw}'"
                )));
            }
        }
        if self.limits.batch_size == 0 {
            return Err(SyncError::configuration("limits.batch_size must be at least 1"));
        }
        if self.limits.concurrency == 0 {
            return Err(SyncError::configuration("limits.concurrency must be at least 1"));
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(SyncError::configuration(
                "retry.initial_backoff_ms exceeds retry.max_backoff_ms",
            ));
        }
        let o = &self.ordering;
        for (key, value) in [
            ("min_gap", o.min_gap),
            ("renumber_stride", o.renumber_stride),
            ("step", o.step),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(SyncError::configuration(format!(
                    "ordering.{key} must be a positive number, got {value}"
                )));
            }
        }
        if o.renumber_stride <= o.min_gap * 2.0 {
            return Err(SyncError::configuration(
                "ordering.renumber_stride must be well above ordering.min_gap",
            ));
        }
        Ok(())
    }
}

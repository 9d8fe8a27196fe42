//! Shared value types for the backlog sync domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! meaningful values with invariants (order values are finite, a reorder
//! intent never names an item twice) and participate in domain computations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::FieldMap;
use crate::{FieldName, SyncError, WorkItemId};

// ---------------------------------------------------------------------------
// Order values
// ---------------------------------------------------------------------------

/// Numeric rank that positions a work item within a sorted backlog view.
///
/// The field that stores it is process-template dependent, so the domain
/// treats it as an opaque, finite real number: it is not assumed to start at
/// zero, to be integral, or to be contiguous.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderValue(f64);

impl OrderValue {
    /// Creates an [`OrderValue`], returning `None` if `value` is infinite or NaN.
    #[must_use]
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Returns the underlying `f64` value.
    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// Total ordering over order values; finite values make this exact.
    pub fn total_cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl std::fmt::Display for OrderValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Parses an RFC 3339 timestamp as emitted by the tracking service.
    pub fn parse_rfc3339(raw: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| Self(dt.with_timezone(&Utc)))
    }}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

// ---------------------------------------------------------------------------
// Work items
// ---------------------------------------------------------------------------

/// A raw record as returned by the service's batch-get endpoint.
///
/// Field values are kept as JSON; [`WorkItem::from_record`] interprets them
/// through the configured [`FieldMap`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItemRecord {
    /// Service-assigned identifier.
    pub id: WorkItemId,
    /// Revision counter, when the service reports one.
    #[serde(default, rename = "rev")]
    pub revision: Option<u64>,
    /// Field reference name → value.
    #[serde(default)]
    pub fields: Map<String, Value>,
}

/// A work item as seen by the backlog sync domain.
///
/// Records are owned by the tracking service; the domain never creates or
/// deletes them, it only reads order values and proposes new ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Service-assigned identifier.
    pub id: WorkItemId,
    /// Work item type (`"User Story"`, `"Bug"`, `"Task"`, ...). Open-ended.
    pub work_item_type: String,
    /// Title text.
    pub title: String,
    /// Workflow state; the set of states is service-defined.
    pub state: String,
    /// Display name (or unique name) of the assignee, if any.
    pub assignee: Option<String>,
    /// Area path, if the service reports one.
    pub area_path: Option<String>,
    /// Iteration path, if the service reports one.
    pub iteration_path: Option<String>,
    /// Tags, split from the service's `;`-separated tag field.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Current order value. `None` for items that were never ranked.
    pub order: Option<OrderValue>,
    /// Last-changed timestamp.
    pub changed: Option<Timestamp>,
    /// Revision counter.
    pub revision: Option<u64>,
}

impl WorkItem {
    /// Interprets a raw service record through `fields`.
    ///
    /// Type, title and state are required; everything else is optional. An
    /// order value that is present but not a finite number is an error rather
    /// than being silently treated as unranked.
    pub fn from_record(record: &WorkItemRecord, fields: &FieldMap) -> Result<Self, SyncError> {
        let id = record.id;
        let malformed = |message: String| SyncError::MalformedResponse {
            item: Some(id),
            message,
        };

        let text = |name: &FieldName| -> Option<String> {
            record
                .fields
                .get(name.as_str())
                .and_then(value_as_text)
        };
        let required = |name: &FieldName| -> Result<String, SyncError> {
            text(name).ok_or_else(|| malformed(format!("missing required field '{name}'")))
        };

        let order = match record.fields.get(fields.order.as_str()) {
            None | Some(Value::Null) => None,
            Some(raw) => Some(value_as_order(raw).ok_or_else(|| {
                malformed(format!(
                    "order field '{}' holds a non-numeric value: {raw}",
                    fields.order
                ))
            })?),
        };

        let tags = text(&fields.tags)
            .map(|raw| {
                raw.split(';')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            id,
            work_item_type: required(&fields.work_item_type)?,
            title: required(&fields.title)?,
            state: required(&fields.state)?,
            assignee: record
                .fields
                .get(fields.assignee.as_str())
                .and_then(identity_display_name),
            area_path: text(&fields.area_path),
            iteration_path: text(&fields.iteration_path),
            tags,
            order,
            changed: text(&fields.changed_date).and_then(|raw| Timestamp::parse_rfc3339(&raw)),
            revision: record.revision,
        })
    }
}

fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_as_order(value: &Value) -> Option<OrderValue> {
    match value {
        Value::Number(n) => n.as_f64().and_then(OrderValue::new),
        Value::String(s) => s.trim().parse::<f64>().ok().and_then(OrderValue::new),
        _ => None,
    }
}

// Identity fields arrive either as plain strings or as identity objects.
fn identity_display_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(obj) => obj
            .get("displayName")
            .or_else(|| obj.get("uniqueName"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// A caller-defined equality filter on a field outside the built-in set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFilter {
    /// Field reference name. Validated by the query builder.
    pub field: String,
    /// Literal value to compare against.
    pub value: String,
}

/// Filter specification for one backlog view.
///
/// Transient: constructed per invocation and discarded after the query text
/// has been built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    /// Project scope. Required; an empty project is rejected.
    pub project: String,
    /// Work item types to include. Empty means all types.
    #[serde(default)]
    pub types: Vec<String>,
    /// Exact workflow state.
    pub state: Option<String>,
    /// Iteration path; matches the path and everything under it.
    pub iteration_path: Option<String>,
    /// Area path; matches the path and everything under it.
    pub area_path: Option<String>,
    /// Tags that must all be present.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Exact assignee.
    pub assignee: Option<String>,
    /// Additional equality filters on custom fields.
    #[serde(default)]
    pub custom: Vec<FieldFilter>,
    /// Sort key. Defaults to the configured order field.
    pub sort_by: Option<String>,
}

impl QuerySpec {
    /// Creates a spec scoped to `project` with no filters.
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            ..Self::default()
        }
    }

    /// Restricts the view to the given work item types.
    pub fn with_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Restricts the view to one workflow state.
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Restricts the view to an iteration path subtree.
    pub fn with_iteration_path(mut self, path: impl Into<String>) -> Self {
        self.iteration_path = Some(path.into());
        self
    }

    /// Restricts the view to an area path subtree.
    pub fn with_area_path(mut self, path: impl Into<String>) -> Self {
        self.area_path = Some(path.into());
        self
    }

    /// Requires a tag to be present.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Restricts the view to one assignee.
    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    /// Adds an equality filter on a custom field.
    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom.push(FieldFilter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Overrides the sort key.
    pub fn sorted_by(mut self, field: impl Into<String>) -> Self {
        self.sort_by = Some(field.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Reordering
// ---------------------------------------------------------------------------

/// Where the moved items should land relative to the rest of the backlog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum Anchor {
    /// Ahead of every other item in the view.
    Top,
    /// Behind every other item in the view.
    Bottom,
    /// Immediately after the given item.
    After(WorkItemId),
    /// Immediately before the given item.
    Before(WorkItemId),
}

impl std::fmt::Display for Anchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Anchor::Top => write!(f, "top"),
            Anchor::Bottom => write!(f, "bottom"),
            Anchor::After(id) => write!(f, "after {id}"),
            Anchor::Before(id) => write!(f, "before {id}"),
        }
    }
}

/// A structured reorder request: move `targets`, in this order, to `anchor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderIntent {
    /// Items to move, in their desired relative order.
    pub targets: Vec<WorkItemId>,
    /// Placement relative to the rest of the view.
    pub anchor: Anchor,
}

impl ReorderIntent {
    /// Creates an intent.
    pub fn new(targets: Vec<WorkItemId>, anchor: Anchor) -> Self {
        Self { targets, anchor }
    }
}

// ---------------------------------------------------------------------------
// Patches
// ---------------------------------------------------------------------------

/// A last-write assignment of one field on one work item.
///
/// Reapplying the same operation is always safe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    /// Target item.
    pub id: WorkItemId,
    /// Field to assign.
    pub field: FieldName,
    /// New value.
    pub value: Value,
}

/// One field assignment inside a per-item patch document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    /// Field to assign.
    pub field: FieldName,
    /// New value.
    pub value: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(fields: Value) -> WorkItemRecord {
        serde_json::from_value(json!({ "id": 5, "rev": 3, "fields": fields })).unwrap()
    }

    #[test]
    fn test_order_value_rejects_non_finite() {
        assert!(OrderValue::new(f64::NAN).is_none());
        assert!(OrderValue::new(f64::INFINITY).is_none());
        assert_eq!(OrderValue::new(1.5).map(OrderValue::as_f64), Some(1.5));
    }

    #[test]
    fn test_from_record_maps_configured_fields() {
        let rec = record(json!({
            "System.WorkItemType": "Bug",
            "System.Title": "Crash on save",
            "System.State": "Active",
            "System.AssignedTo": { "displayName": "Sam Doe", "uniqueName": "sam@example.com" },
            "System.AreaPath": "Fabrikam\\Web",
            "System.IterationPath": "Fabrikam\\Sprint 3",
            "System.Tags": "ux; hotfix ;",
            "System.ChangedDate": "2024-03-01T10:00:00Z",
            "Microsoft.VSTS.Common.StackRank": 1999.5
        }));

        let item = WorkItem::from_record(&rec, &FieldMap::default()).unwrap();

        assert_eq!(item.id.as_u64(), 5);
        assert_eq!(item.work_item_type, "Bug");
        assert_eq!(item.assignee.as_deref(), Some("Sam Doe"));
        assert_eq!(item.tags, vec!["ux".to_string(), "hotfix".to_string()]);
        assert_eq!(item.order.map(OrderValue::as_f64), Some(1999.5));
        assert_eq!(item.revision, Some(3));
        assert!(item.changed.is_some());
    }

    #[test]
    fn test_from_record_treats_missing_order_as_unranked() {
        let rec = record(json!({
            "System.WorkItemType": "Task",
            "System.Title": "t",
            "System.State": "New"
        }));
        let item = WorkItem::from_record(&rec, &FieldMap::default()).unwrap();
        assert!(item.order.is_none());
        assert!(item.tags.is_empty());
    }

    #[test]
    fn test_from_record_rejects_non_numeric_order() {
        let rec = record(json!({
            "System.WorkItemType": "Task",
            "System.Title": "t",
            "System.State": "New",
            "Microsoft.VSTS.Common.StackRank": "high"
        }));
        let err = WorkItem::from_record(&rec, &FieldMap::default()).unwrap_err();
        assert!(matches!(err, SyncError::MalformedResponse { .. }));
    }

    #[test]
    fn test_from_record_requires_title() {
        let rec = record(json!({ "System.WorkItemType": "Task", "System.State": "New" }));
        assert!(WorkItem::from_record(&rec, &FieldMap::default()).is_err());
    }

    #[test]
    fn test_anchor_serialises_with_kind_tag() {
        let anchor = Anchor::After(WorkItemId::new(3).unwrap());
        assert_eq!(
            serde_json::to_value(anchor).unwrap(),
            json!({ "kind": "after", "id": 3 })
        );
        assert_eq!(serde_json::to_value(Anchor::Top).unwrap(), json!({ "kind": "top" }));
    }
}

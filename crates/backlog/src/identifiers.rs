//! Newtype domain identifiers.
//!
//! Every domain concept that has an identity is represented as a distinct newtype
//! wrapping a primitive. This prevents accidentally interchanging, for example,
//! a [`WorkItemId`] with a revision number even though both are integers under
//! the hood, or a [`FieldName`] with a free-text filter value.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Service-assigned integer identifiers
// ---------------------------------------------------------------------------

/// Identifies a work item in the tracking service.
///
/// Wraps the positive integer assigned by the service; unique within one
/// service instance. The domain never mints these, it only reads them back.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct WorkItemId(u64);

impl WorkItemId {
    /// Creates a new identifier, returning `None` for zero.
    pub fn new(value: u64) -> Option<Self> {
        if value == 0 {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Returns the underlying integer value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for WorkItemId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: u64 = s
            .trim()
            .parse()
            .map_err(|_| format!("'{s}' is not a work item id"))?;
        Self::new(raw).ok_or_else(|| "work item ids are positive integers".to_string())
    }
}

// ---------------------------------------------------------------------------
// UUID-backed identifiers (generated locally)
// ---------------------------------------------------------------------------

/// Identifies a single sync workflow run (one `list`, `reorder` or
/// `reprioritize` invocation).
///
/// Generated fresh for every invocation; recorded on the workflow span so all
/// gateway calls from a single run can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncRunId(Uuid);

impl SyncRunId {
    /// Generates a new random run identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SyncRunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// String-backed identifiers (service names and tokens)
// ---------------------------------------------------------------------------

string_id! {
    /// A field reference name as understood by the tracking service
    /// (e.g. `"System.State"`, `"Microsoft.VSTS.Common.StackRank"`).
    ///
    /// Field names vary by process template, so they are always configuration.
    FieldName
}

impl FieldName {
    /// Builds a field name from a non-empty literal.
    pub(crate) fn from_static(name: &'static str) -> Self {
        debug_assert!(!name.is_empty());
        Self(name.to_string())
    }
}

string_id! {
    /// Opaque continuation token returned by the service when a query result
    /// spans more than one page.
    ContinuationToken
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_item_id_rejects_zero() {
        assert!(WorkItemId::new(0).is_none());
        assert_eq!(WorkItemId::new(7).map(WorkItemId::as_u64), Some(7));
    }

    #[test]
    fn test_work_item_id_parses_from_str() {
        assert_eq!("42".parse::<WorkItemId>().ok(), WorkItemId::new(42));
        assert!("0".parse::<WorkItemId>().is_err());
        assert!("abc".parse::<WorkItemId>().is_err());
    }

    #[test]
    fn test_field_name_rejects_empty() {
        assert!(FieldName::new("").is_none());
        assert_eq!(
            FieldName::new("System.Id").map(|f| f.to_string()),
            Some("System.Id".to_string())
        );
    }

    #[test]
    fn test_work_item_id_serialises_as_plain_integer() {
        let id = WorkItemId::new(12).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "12");
    }
}

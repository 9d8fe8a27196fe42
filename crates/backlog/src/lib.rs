//! Backlog ordering domain.
//!
//! This crate contains every domain concept, newtype identifier, shared value
//! type, and error type used throughout backlog sync, together with the two
//! pure components of the workflow: the Query Builder and the Order Resolver.
//! Infrastructure crates implement the [`WorkItemService`] port defined here;
//! they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`WorkItemId`, `FieldName`, etc.) |
//! | [`types`] | Value types (`WorkItem`, `QuerySpec`, `ReorderIntent`, etc.) |
//! | [`errors`] | Top-level error and retry-policy types |
//! | [`config`] | Field mapping, limits, retry and ordering configuration |
//! | [`query`] | Query Builder |
//! | [`order`] | Order Resolver |
//! | [`service`] | The `WorkItemService` port trait |

pub mod config;
pub mod errors;
pub mod identifiers;
pub mod order;
pub mod query;
pub mod service;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use config::{FieldMap, Limits, OrderingPolicy, RetryConfig, SyncConfig, TopStrategy};
pub use errors::{RetryPolicy, SyncError};
pub use identifiers::{ContinuationToken, FieldName, SyncRunId, WorkItemId};
pub use order::{ContextEntry, OrderAssignment, OrderResolver, ReorderError, Resolution};
pub use query::{QueryBuilder, QueryText};
pub use service::{QueryPage, ServiceError, WorkItemService};
pub use types::{
    Anchor, FieldChange, FieldFilter, OrderValue, PatchOperation, QuerySpec, ReorderIntent,
    Timestamp, WorkItem, WorkItemRecord,
};

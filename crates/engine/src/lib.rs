//! Backlog sync orchestration.
//!
//! This crate provides the Work Item Gateway, the Update Batcher, and the
//! [`BacklogSync`] workflow that drives them around the pure components in
//! [`backlog`] (Query Builder, Order Resolver).
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** Components here sequence calls between business
//! logic in the [`backlog`] crate and the [`backlog::WorkItemService`] port.
//! Retry, batching, concurrency and deadlines live here; domain rules do not.

pub mod batcher;
pub mod gateway;
pub mod report;
mod retry;
pub mod sync;

pub use batcher::UpdateBatcher;
pub use gateway::Gateway;
pub use report::{BatchReport, PatchOutcome, SyncReport};
pub use sync::{BacklogSync, RunOptions};

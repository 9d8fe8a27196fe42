//! Backlog sync REST adapter.
//!
//! Implements [`backlog::WorkItemService`] over an Azure-DevOps-style work
//! item REST API using `reqwest`.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules.
//! Endpoint layout, authentication headers, JSON shapes and status
//! classification live here; the [`backlog`] crate never sees them. Retry is
//! not performed here: each trait method is exactly one HTTP round trip and
//! failures are reported as [`backlog::ServiceError`] for the orchestration
//! layer to classify.
//!
//! ## Endpoints
//!
//! | Operation | Request |
//! |-----------|---------|
//! | query page | `POST {base}/{project}/_apis/wit/wiql` |
//! | batch fetch | `POST {base}/{project}/_apis/wit/workitemsbatch` |
//! | patch | `PATCH {base}/_apis/wit/workitems/{id}` (`application/json-patch+json`) |

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod wire;

pub use auth::{AuthScheme, Credential};
pub use client::TrackerClient;
pub use config::TrackerConfig;
pub use error::TrackerError;

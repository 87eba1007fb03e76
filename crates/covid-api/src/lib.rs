//! JSON query API over the province case store.
//!
//! Exposes an axum [`Router`] backed by a [`SyncGate`], so that a query for a
//! window nothing local covers is filled from upstream before it is answered.
//! TLS and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", covid_api::api_router(gate.clone()))
//! ```

pub mod error;
pub mod stats;

use std::sync::Arc;

use axum::{Router, routing::post};
use covid_core::store::CaseStore;
use covid_sync::{SyncGate, Upstream};

pub use error::ApiError;

/// Build a fully-materialised API router for `gate`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, U>(gate: Arc<SyncGate<S, U>>) -> Router<()>
where
  S: CaseStore + 'static,
  U: Upstream + 'static,
{
  Router::new()
    .route("/v1/covid/stats", post(stats::handler::<S, U>))
    .with_state(gate)
}

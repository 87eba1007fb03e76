//! Lazy synchronisation between the PCM-DPC province feed and a local
//! [`CaseStore`](covid_core::store::CaseStore).
//!
//! - [`upstream`] issues the outbound GET requests.
//! - [`sanitize`] turns one raw upstream entry into a storable record.
//! - [`fetcher`] pulls a window of data, deduplicates it and persists it.
//! - [`gate`] wraps reads so that missing data is fetched before the read.

pub mod error;
pub mod fetcher;
pub mod gate;
pub mod sanitize;
pub mod upstream;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};
pub use fetcher::{FetchOutcome, FetchRequest, Fetcher};
pub use gate::SyncGate;
pub use upstream::{Endpoint, HttpUpstream, Upstream, UpstreamConfig};

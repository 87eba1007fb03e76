//! The `CaseStore` trait and the sync marker carried on gated reads.
//!
//! The trait is implemented by storage backends (e.g. `covid-store-sqlite`).
//! Higher layers (`covid-sync`, `covid-api`) depend on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use crate::{
  filter::{Filter, OrderBy},
  record::{CaseRecord, NewCaseRecord},
};

// ─── Sync marker ─────────────────────────────────────────────────────────────

/// Whether a read may trigger a remote fetch before it runs.
///
/// Every read that goes through the sync gate names one of these explicitly.
/// The gate's own existence checks, and every read the fetcher makes, go to
/// the undecorated [`CaseStore`], which is the `Skip` path by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMarker {
  /// Pull missing data from upstream before reading.
  Sync,
  /// Read local data only.
  Skip,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a case-record store backend.
///
/// Records are append-only. Implementations must enforce uniqueness of
/// `(date, province_code)` themselves; callers deduplicate only as an
/// optimisation.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait CaseStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Whether at least one record matches `filter`.
  fn exists<'a>(
    &'a self,
    filter: &'a Filter,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// All records matching `filter`, sorted by `order` and then by
  /// [`DEFAULT_ORDER`](crate::filter::DEFAULT_ORDER).
  fn search<'a>(
    &'a self,
    filter: &'a Filter,
    order: &'a [OrderBy],
  ) -> impl Future<Output = Result<Vec<CaseRecord>, Self::Error>> + Send + 'a;

  /// Persist `records` atomically and return how many were written.
  ///
  /// Either every record is committed or none is: any failure (including a
  /// uniqueness violation) rolls the whole batch back.
  fn insert_batch(
    &self,
    records: Vec<NewCaseRecord>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}

//! The sync-on-read gate.
//!
//! [`SyncGate`] sits in front of a [`CaseStore`]. A read marked
//! [`SyncMarker::Sync`] first makes sure the local store has data for the
//! requested day (or for today, when the read names no single day), fetching
//! it from upstream if not. Sync is best-effort: whatever happens during the
//! fetch, the read itself always runs.
//!
//! Every check the gate makes, and every read the fetcher makes, goes to the
//! wrapped store directly. Nothing inside a sync can re-enter the gate.

use chrono::NaiveDate;
use covid_core::{
  filter::{Filter, OrderBy},
  record::CaseRecord,
  store::{CaseStore, SyncMarker},
};
use tracing::{error, info};

use crate::{
  fetcher::{FetchRequest, Fetcher},
  upstream::Upstream,
};

pub struct SyncGate<S, U> {
  store:   S,
  fetcher: Fetcher<U>,
}

impl<S, U> SyncGate<S, U>
where
  S: CaseStore,
  U: Upstream,
{
  pub fn new(store: S, fetcher: Fetcher<U>) -> Self { Self { store, fetcher } }

  /// The wrapped store; reads through it never sync.
  pub fn store(&self) -> &S { &self.store }

  pub fn fetcher(&self) -> &Fetcher<U> { &self.fetcher }

  pub fn today(&self) -> NaiveDate { self.fetcher.clock().today() }

  /// Read records matching `filter`, syncing first unless `marker` is
  /// [`SyncMarker::Skip`]. The filter reaches the store unmodified.
  pub async fn search(
    &self,
    filter: &Filter,
    order: &[OrderBy],
    marker: SyncMarker,
  ) -> Result<Vec<CaseRecord>, S::Error> {
    if marker == SyncMarker::Sync {
      self.sync(filter).await;
    }
    self.store.search(filter, order).await
  }

  /// Whether any record matches `filter`, syncing first unless `marker` is
  /// [`SyncMarker::Skip`].
  pub async fn exists(&self, filter: &Filter, marker: SyncMarker) -> Result<bool, S::Error> {
    if marker == SyncMarker::Sync {
      self.sync(filter).await;
    }
    self.store.exists(filter).await
  }

  /// Read a date window for the query API.
  ///
  /// The read is synced like any open read (today, then the latest
  /// publication when the store is empty). If nothing local matches `filter`
  /// afterwards, the whole window is fetched from the history file and read
  /// again. Windows starting today or later skip that second fetch: the sync
  /// has just tried the latest file, and later days cannot exist yet.
  pub async fn search_window(
    &self,
    filter: &Filter,
    order: &[OrderBy],
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result<Vec<CaseRecord>, S::Error> {
    let records = self.search(filter, order, SyncMarker::Sync).await?;
    if !records.is_empty() || start >= self.today() {
      return Ok(records);
    }

    self
      .fetcher
      .fetch(&self.store, FetchRequest::Range { start, end })
      .await;
    self.search(filter, order, SyncMarker::Skip).await
  }

  async fn sync(&self, filter: &Filter) {
    if let Err(e) = self.try_sync(filter).await {
      error!(error = %e, "sync failed; reading local data only");
    }
  }

  async fn try_sync(&self, filter: &Filter) -> Result<(), S::Error> {
    if let Some(target) = filter.exact_date() {
      if !self.store.exists(&Filter::on(target)).await? {
        self.fetcher.fetch(&self.store, FetchRequest::Date(target)).await;
      }
      return Ok(());
    }

    let today = self.today();
    if self.store.exists(&Filter::on(today)).await? {
      return Ok(());
    }

    let fetched = self.fetcher.fetch(&self.store, FetchRequest::Date(today)).await;
    if !fetched && !self.store.exists(&Filter::all()).await? {
      info!("no data for today and the store is empty; fetching latest available");
      self.fetcher.fetch(&self.store, FetchRequest::Latest).await;
    }
    Ok(())
  }
}

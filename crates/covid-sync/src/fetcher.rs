//! The remote fetcher: download a window of upstream data, sanitise it,
//! deduplicate it against the store, and persist what is new.

use std::collections::HashSet;

use chrono::NaiveDate;
use covid_core::{
  clock::Clock,
  filter::Filter,
  record::{NewCaseRecord, RecordKey},
  store::CaseStore,
};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::{
  Error, Result,
  sanitize::{Rejection, entry_date, sanitize_value},
  upstream::{Endpoint, Upstream},
};

// ─── Request ─────────────────────────────────────────────────────────────────

/// Which slice of upstream data to pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchRequest {
  /// Whatever the latest file holds; no date filtering.
  Latest,
  /// Exactly one day.
  Date(NaiveDate),
  /// An inclusive date range.
  Range { start: NaiveDate, end: NaiveDate },
}

impl FetchRequest {
  /// The full history is only downloaded when the request cannot be served
  /// from the latest file: a range, or a single day other than today.
  pub fn endpoint(&self, today: NaiveDate) -> Endpoint {
    match self {
      Self::Range { .. } => Endpoint::History,
      Self::Date(date) if *date != today => Endpoint::History,
      Self::Date(_) | Self::Latest => Endpoint::Latest,
    }
  }

  fn matches(&self, date: Option<NaiveDate>) -> bool {
    match (self, date) {
      (Self::Latest, _) => true,
      (Self::Date(target), Some(d)) => d == *target,
      (Self::Range { start, end }, Some(d)) => *start <= d && d <= *end,
      (_, None) => false,
    }
  }
}

/// What one fetch did, for logging and the CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOutcome {
  /// Entries in the downloaded payload.
  pub received:   usize,
  /// Entries inside the requested window.
  pub matched:    usize,
  /// Entries rejected by sanitisation.
  pub rejected:   usize,
  /// Sanitised records whose key was already stored (or repeated in the
  /// payload).
  pub duplicates: usize,
  pub inserted:   usize,
}

// ─── Fetcher ─────────────────────────────────────────────────────────────────

pub struct Fetcher<U> {
  upstream: U,
  clock:    Clock,
}

impl<U: Upstream> Fetcher<U> {
  pub fn new(upstream: U, clock: Clock) -> Self { Self { upstream, clock } }

  pub fn upstream(&self) -> &U { &self.upstream }

  pub fn clock(&self) -> Clock { self.clock }

  /// Fetch and persist `request`, reporting only success.
  ///
  /// `false` means "no new data available": the download failed, the window
  /// was empty, or the batch could not be written. Nothing is propagated.
  pub async fn fetch<S: CaseStore>(&self, store: &S, request: FetchRequest) -> bool {
    match self.try_fetch(store, request).await {
      Ok(outcome) => {
        info!(
          ?request,
          received = outcome.received,
          matched = outcome.matched,
          rejected = outcome.rejected,
          duplicates = outcome.duplicates,
          inserted = outcome.inserted,
          "fetch complete"
        );
        true
      }
      Err(Error::EmptyWindow) => {
        info!(?request, "no upstream data for requested window");
        false
      }
      Err(e) => {
        error!(?request, error = %e, "fetch failed");
        false
      }
    }
  }

  /// Fetch and persist `request`, reporting what happened.
  ///
  /// `store` must be the undecorated store: the existing-key lookup made here
  /// never goes through a sync gate.
  pub async fn try_fetch<S: CaseStore>(
    &self,
    store: &S,
    request: FetchRequest,
  ) -> Result<FetchOutcome> {
    let today    = self.clock.today();
    let endpoint = request.endpoint(today);
    debug!(?request, ?endpoint, "fetching upstream");

    let entries  = self.upstream.fetch(endpoint).await?;
    let received = entries.len();

    let matched: Vec<Value> = entries
      .into_iter()
      .filter(|e| request.matches(entry_date(e)))
      .collect();
    if matched.is_empty() {
      return Err(Error::EmptyWindow);
    }

    let mut outcome = FetchOutcome { received, matched: matched.len(), ..Default::default() };

    let mut candidates = Vec::with_capacity(matched.len());
    for entry in matched {
      match sanitize_value(entry, today) {
        Ok(record) => candidates.push(record),
        Err(Rejection::Malformed(why)) => {
          warn!(%why, "skipping malformed upstream entry");
          outcome.rejected += 1;
        }
        Err(rejection) => {
          debug!(%rejection, "skipping upstream entry");
          outcome.rejected += 1;
        }
      }
    }

    let mut seen = existing_keys(store, request, &candidates).await?;
    let fresh: Vec<NewCaseRecord> = candidates
      .into_iter()
      .filter(|r| seen.insert(r.key()))
      .collect();
    outcome.duplicates = outcome.matched - outcome.rejected - fresh.len();

    outcome.inserted = store
      .insert_batch(fresh)
      .await
      .map_err(|e| Error::Store(Box::new(e)))?;

    Ok(outcome)
  }
}

/// Keys already stored for the window `request` covers. For
/// [`FetchRequest::Latest`] the window is the span of the batch itself.
async fn existing_keys<S: CaseStore>(
  store: &S,
  request: FetchRequest,
  candidates: &[NewCaseRecord],
) -> Result<HashSet<RecordKey>> {
  let window = match request {
    FetchRequest::Date(date) => Filter::on(date),
    FetchRequest::Range { start, end } => Filter::between(start, end),
    FetchRequest::Latest => {
      let dates = candidates.iter().map(|r| r.date);
      match (dates.clone().min(), dates.max()) {
        (Some(start), Some(end)) => Filter::between(start, end),
        _ => return Ok(HashSet::new()),
      }
    }
  };

  let existing = store
    .search(&window, &[])
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;
  Ok(existing.iter().map(|r| r.key()).collect())
}

#[cfg(test)]
mod tests {
  use std::future::Future;

  use covid_core::{filter::OrderBy, record::CaseRecord};
  use covid_store_sqlite::SqliteStore;
  use serde_json::json;

  use super::*;
  use crate::testing::{MockUpstream, d, day, entry};

  fn today() -> Clock { Clock::Fixed(d(2020, 3, 10)) }

  async fn store() -> SqliteStore { SqliteStore::open_in_memory().await.unwrap() }

  fn history() -> Vec<Value> {
    let mut all = day(d(2020, 3, 1));
    all.extend(day(d(2020, 3, 2)));
    all.extend(day(d(2020, 3, 3)));
    all
  }

  #[test]
  fn endpoint_selection() {
    let today = d(2020, 3, 10);
    assert_eq!(FetchRequest::Latest.endpoint(today), Endpoint::Latest);
    assert_eq!(FetchRequest::Date(today).endpoint(today), Endpoint::Latest);
    assert_eq!(FetchRequest::Date(d(2020, 3, 1)).endpoint(today), Endpoint::History);
    assert_eq!(
      FetchRequest::Range { start: today, end: today }.endpoint(today),
      Endpoint::History
    );
  }

  #[tokio::test]
  async fn date_fetch_inserts_only_that_day() {
    let s = store().await;
    let fetcher = Fetcher::new(MockUpstream::new().serving(Endpoint::History, history()), today());

    let outcome = fetcher.try_fetch(&s, FetchRequest::Date(d(2020, 3, 2))).await.unwrap();
    assert_eq!(outcome.received, 9);
    assert_eq!(outcome.matched, 3);
    assert_eq!(outcome.rejected, 1);
    assert_eq!(outcome.inserted, 2);

    let stored = s.search(&Filter::all(), &[]).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|r| r.date == d(2020, 3, 2)));
    assert_eq!(fetcher.upstream().calls(), vec![Endpoint::History]);
  }

  #[tokio::test]
  async fn range_fetch_is_inclusive() {
    let s = store().await;
    let fetcher = Fetcher::new(MockUpstream::new().serving(Endpoint::History, history()), today());

    let request = FetchRequest::Range { start: d(2020, 3, 2), end: d(2020, 3, 3) };
    assert!(fetcher.fetch(&s, request).await);
    assert_eq!(s.count().await.unwrap(), 4);
  }

  #[tokio::test]
  async fn second_fetch_of_same_day_adds_nothing() {
    let s = store().await;
    let fetcher = Fetcher::new(MockUpstream::new().serving(Endpoint::History, history()), today());
    let request = FetchRequest::Date(d(2020, 3, 1));

    let first = fetcher.try_fetch(&s, request).await.unwrap();
    assert_eq!(first.inserted, 2);

    let second = fetcher.try_fetch(&s, request).await.unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.duplicates, 2);
    assert!(fetcher.fetch(&s, request).await, "a fully deduplicated fetch still succeeds");
    assert_eq!(s.count().await.unwrap(), 2);
  }

  #[tokio::test]
  async fn repeated_keys_within_payload_collapse() {
    let s = store().await;
    let payload = vec![
      entry(d(2020, 3, 10), "Veneto", 26, "Treviso", "TV", 10),
      entry(d(2020, 3, 10), "Veneto", 26, "Treviso", "TV", 11),
    ];
    let fetcher = Fetcher::new(MockUpstream::new().serving(Endpoint::Latest, payload), today());

    let outcome = fetcher.try_fetch(&s, FetchRequest::Latest).await.unwrap();
    assert_eq!(outcome.inserted, 1);
    assert_eq!(outcome.duplicates, 1);

    let stored = s.search(&Filter::all(), &[]).await.unwrap();
    assert_eq!(stored[0].total_cases, 10);
  }

  #[tokio::test]
  async fn sanitisation_applies_to_stored_rows() {
    let s = store().await;
    let mut malformed = entry(d(2020, 3, 10), "Veneto", 28, "Padova", "PD", 5);
    malformed["totale_casi"] = json!("lots");
    let payload = vec![
      entry(d(2020, 3, 10), "Veneto", 26, "Treviso", "TV", -4),
      entry(d(2020, 3, 11), "Veneto", 27, "Venezia", "VE", 3),
      entry(d(2020, 3, 10), "Veneto", 25, "In fase di definizione", "", 9),
      entry(d(2020, 3, 10), "Veneto", 999, "Fuori Regione", "FR", 9),
      malformed,
    ];
    let fetcher = Fetcher::new(MockUpstream::new().serving(Endpoint::Latest, payload), today());

    let outcome = fetcher.try_fetch(&s, FetchRequest::Latest).await.unwrap();
    assert_eq!(outcome.rejected, 4);
    assert_eq!(outcome.inserted, 1);

    let stored = s.search(&Filter::all(), &[]).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].province_name, "Treviso");
    assert_eq!(stored[0].total_cases, 0);
  }

  #[tokio::test]
  async fn empty_window_fails_without_writing() {
    let s = store().await;
    let fetcher = Fetcher::new(
      MockUpstream::new().serving(Endpoint::Latest, day(d(2020, 3, 9))),
      today(),
    );

    assert!(!fetcher.fetch(&s, FetchRequest::Date(d(2020, 3, 10))).await);
    assert!(matches!(
      fetcher.try_fetch(&s, FetchRequest::Date(d(2020, 3, 10))).await,
      Err(Error::EmptyWindow)
    ));
    assert_eq!(s.count().await.unwrap(), 0);
  }

  #[tokio::test]
  async fn upstream_failure_is_absorbed() {
    let s = store().await;
    let fetcher = Fetcher::new(MockUpstream::new(), today());
    assert!(!fetcher.fetch(&s, FetchRequest::Latest).await);
    assert_eq!(fetcher.upstream().calls(), vec![Endpoint::Latest]);
  }

  #[tokio::test]
  async fn entries_without_readable_date_never_match_a_window() {
    let s = store().await;
    let mut undated = entry(d(2020, 3, 1), "Veneto", 26, "Treviso", "TV", 1);
    undated["data"] = json!(null);
    let fetcher = Fetcher::new(
      MockUpstream::new().serving(Endpoint::History, vec![undated]),
      today(),
    );

    assert!(!fetcher.fetch(&s, FetchRequest::Date(d(2020, 3, 1))).await);
  }

  #[tokio::test]
  async fn rows_are_readable_in_requested_order() {
    let s = store().await;
    let fetcher = Fetcher::new(MockUpstream::new().serving(Endpoint::History, history()), today());
    fetcher
      .fetch(&s, FetchRequest::Range { start: d(2020, 3, 1), end: d(2020, 3, 3) })
      .await;

    let stored = s
      .search(&Filter::all(), &[OrderBy::desc(covid_core::filter::OrderField::TotalCases)])
      .await
      .unwrap();
    assert_eq!(stored.len(), 6);
    assert_eq!(stored[0].total_cases, 20);
  }

  /// A store whose reads see nothing, as if another writer committed after
  /// the existing-key lookup. Writes reach the real store.
  struct StaleReads(SqliteStore);

  impl CaseStore for StaleReads {
    type Error = covid_store_sqlite::Error;

    fn exists<'a>(
      &'a self,
      _filter: &'a Filter,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a {
      async { Ok(false) }
    }

    fn search<'a>(
      &'a self,
      _filter: &'a Filter,
      _order: &'a [OrderBy],
    ) -> impl Future<Output = Result<Vec<CaseRecord>, Self::Error>> + Send + 'a {
      async { Ok(Vec::new()) }
    }

    fn insert_batch(
      &self,
      records: Vec<NewCaseRecord>,
    ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_ {
      self.0.insert_batch(records)
    }
  }

  #[tokio::test]
  async fn losing_a_write_race_rolls_back_the_whole_batch() {
    let s = store().await;
    let fetcher = Fetcher::new(MockUpstream::new().serving(Endpoint::History, history()), today());

    // Another writer already stored Treviso for the day.
    let seeded = entry(d(2020, 3, 1), "Veneto", 26, "Treviso", "TV", 10);
    let treviso = sanitize_value(seeded, d(2020, 3, 10)).unwrap();
    s.insert_batch(vec![treviso]).await.unwrap();

    let stale = StaleReads(s.clone());
    let request = FetchRequest::Date(d(2020, 3, 1));
    assert!(matches!(
      fetcher.try_fetch(&stale, request).await,
      Err(Error::Store(_))
    ));
    assert!(!fetcher.fetch(&stale, request).await);

    // Venezia was not written on its own; no key is stored twice.
    let stored = s.search(&Filter::all(), &[]).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].province_code, "26");
  }
}

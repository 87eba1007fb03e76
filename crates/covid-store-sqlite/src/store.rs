//! [`SqliteStore`], the SQLite implementation of [`CaseStore`].

use std::path::Path;

use covid_core::{
  filter::{Filter, OrderBy},
  record::{CaseRecord, NewCaseRecord},
  store::CaseStore,
};

use crate::{
  encode::{order_clause, where_clause, RawCaseRecord, RawNewRecord, COLUMNS},
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A case-record store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Total number of stored records.
  pub async fn count(&self) -> Result<u64> {
    let n: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM case_records", [], |r| r.get(0))?)
      })
      .await?;
    u64::try_from(n).map_err(|_| Error::Corrupt(format!("row count {n}")))
  }
}

// ─── CaseStore impl ──────────────────────────────────────────────────────────

impl CaseStore for SqliteStore {
  type Error = Error;

  async fn exists(&self, filter: &Filter) -> Result<bool> {
    let (where_sql, params) = where_clause(filter);

    let found = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT EXISTS (SELECT 1 FROM case_records {where_sql})");
        Ok(conn.query_row(&sql, rusqlite::params_from_iter(params.iter()), |r| {
          r.get::<_, bool>(0)
        })?)
      })
      .await?;

    Ok(found)
  }

  async fn search(&self, filter: &Filter, order: &[OrderBy]) -> Result<Vec<CaseRecord>> {
    let (where_sql, params) = where_clause(filter);
    let order_sql = order_clause(order);

    let raws: Vec<RawCaseRecord> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {COLUMNS} FROM case_records {where_sql} {order_sql}");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), RawCaseRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCaseRecord::into_record).collect()
  }

  async fn insert_batch(&self, records: Vec<NewCaseRecord>) -> Result<usize> {
    if records.is_empty() {
      return Ok(0);
    }

    let rows: Vec<RawNewRecord> = records
      .into_iter()
      .map(RawNewRecord::encode)
      .collect::<Result<_>>()?;

    // The transaction rolls back when dropped, so any `?` below leaves the
    // table exactly as it was.
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO case_records (
               date, state, region_code, region_name,
               province_code, province_name, province_acronym,
               latitude, longitude, total_cases, note,
               nuts_code_1, nuts_code_2, nuts_code_3
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
          )?;
          for row in &rows {
            stmt.execute(rusqlite::params![
              row.date,
              row.state,
              row.region_code,
              row.region_name,
              row.province_code,
              row.province_name,
              row.province_acronym,
              row.latitude,
              row.longitude,
              row.total_cases,
              row.note,
              row.nuts_code_1,
              row.nuts_code_2,
              row.nuts_code_3,
            ])?;
          }
        }
        tx.commit()?;
        Ok(rows.len())
      })
      .await
      .map_err(Error::from_write)
  }
}

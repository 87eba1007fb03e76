//! Case records: one row per (date, province) pair.
//!
//! Records are append-only history: the store never updates or deletes them.
//! A [`NewCaseRecord`] is what the sanitiser produces from an upstream entry;
//! a [`CaseRecord`] is what the store hands back after persisting it.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ─── Key ─────────────────────────────────────────────────────────────────────

/// The natural key of a case record. At most one record exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
  pub date:          NaiveDate,
  pub province_code: String,
}

impl RecordKey {
  pub fn new(date: NaiveDate, province_code: impl Into<String>) -> Self {
    Self { date, province_code: province_code.into() }
  }
}

impl fmt::Display for RecordKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}_{}", self.date, self.province_code)
  }
}

// ─── NewCaseRecord ───────────────────────────────────────────────────────────

/// A sanitised record that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCaseRecord {
  pub date:             NaiveDate,
  /// Country code (`stato` upstream), e.g. `"ITA"`.
  pub state:            Option<String>,
  pub region_code:      Option<String>,
  pub region_name:      String,
  pub province_code:    String,
  pub province_name:    String,
  /// Two-letter province acronym (`sigla_provincia`).
  pub province_acronym: Option<String>,
  pub latitude:         f64,
  pub longitude:        f64,
  pub total_cases:      u64,
  pub note:             Option<String>,
  pub nuts_code_1:      Option<String>,
  pub nuts_code_2:      Option<String>,
  pub nuts_code_3:      Option<String>,
}

impl NewCaseRecord {
  pub fn key(&self) -> RecordKey {
    RecordKey::new(self.date, self.province_code.clone())
  }
}

// ─── CaseRecord ──────────────────────────────────────────────────────────────

/// A persisted record. `id` is assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
  pub id:               i64,
  pub date:             NaiveDate,
  pub state:            Option<String>,
  pub region_code:      Option<String>,
  pub region_name:      String,
  pub province_code:    String,
  pub province_name:    String,
  pub province_acronym: Option<String>,
  pub latitude:         f64,
  pub longitude:        f64,
  pub total_cases:      u64,
  pub note:             Option<String>,
  pub nuts_code_1:      Option<String>,
  pub nuts_code_2:      Option<String>,
  pub nuts_code_3:      Option<String>,
}

impl CaseRecord {
  pub fn key(&self) -> RecordKey {
    RecordKey::new(self.date, self.province_code.clone())
  }

  /// Attach a store-assigned id to a sanitised record.
  pub fn from_new(id: i64, new: NewCaseRecord) -> Self {
    Self {
      id,
      date: new.date,
      state: new.state,
      region_code: new.region_code,
      region_name: new.region_name,
      province_code: new.province_code,
      province_name: new.province_name,
      province_acronym: new.province_acronym,
      latitude: new.latitude,
      longitude: new.longitude,
      total_cases: new.total_cases,
      note: new.note,
      nuts_code_1: new.nuts_code_1,
      nuts_code_2: new.nuts_code_2,
      nuts_code_3: new.nuts_code_3,
    }
  }
}

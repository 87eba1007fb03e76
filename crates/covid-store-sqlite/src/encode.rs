//! Encoding and decoding helpers between domain types and the plain values
//! stored in SQLite columns.
//!
//! Dates are stored as `YYYY-MM-DD` text so that lexical order matches
//! chronological order. Case counts are `u64` in the domain and `INTEGER`
//! (i64) in SQLite.

use chrono::NaiveDate;
use covid_core::{
  filter::{Filter, OrderBy, OrderField, Predicate, Direction, DEFAULT_ORDER},
  record::{CaseRecord, NewCaseRecord},
};

use crate::{Error, Result};

// ─── NaiveDate ───────────────────────────────────────────────────────────────

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(date: NaiveDate) -> String { date.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Case counts ─────────────────────────────────────────────────────────────

pub fn encode_count(n: u64) -> Result<i64> {
  i64::try_from(n).map_err(|_| Error::Corrupt(format!("case count {n} out of range")))
}

pub fn decode_count(n: i64) -> Result<u64> {
  u64::try_from(n).map_err(|_| Error::Corrupt(format!("negative case count {n}")))
}

// ─── Filter / order → SQL ────────────────────────────────────────────────────

fn order_column(field: OrderField) -> &'static str {
  match field {
    OrderField::TotalCases => "total_cases",
    OrderField::ProvinceCode => "province_code",
    OrderField::Date => "date",
    OrderField::RegionName => "region_name",
    OrderField::Name => "province_name",
  }
}

/// Build a `WHERE` clause (empty for an empty filter) and its positional
/// parameters. Column names never come from caller input.
pub fn where_clause(filter: &Filter) -> (String, Vec<String>) {
  let mut conds  = Vec::with_capacity(filter.predicates().len());
  let mut params = Vec::with_capacity(filter.predicates().len());

  for predicate in filter.predicates() {
    let (cond, value) = match predicate {
      Predicate::DateEq(d) => ("date = ?", encode_date(*d)),
      Predicate::DateFrom(d) => ("date >= ?", encode_date(*d)),
      Predicate::DateUntil(d) => ("date <= ?", encode_date(*d)),
      Predicate::RegionCode(c) => ("region_code = ?", c.clone()),
      Predicate::RegionName(n) => ("region_name = ?", n.clone()),
      Predicate::ProvinceCode(c) => ("province_code = ?", c.clone()),
      Predicate::ProvinceName(n) => ("province_name = ?", n.clone()),
    };
    conds.push(cond);
    params.push(value);
  }

  let clause = if conds.is_empty() {
    String::new()
  } else {
    format!("WHERE {}", conds.join(" AND "))
  };
  (clause, params)
}

/// `ORDER BY` clause for `order`, always followed by the default ordering.
pub fn order_clause(order: &[OrderBy]) -> String {
  let terms: Vec<String> = order
    .iter()
    .chain(DEFAULT_ORDER.iter())
    .map(|o| {
      let dir = match o.direction {
        Direction::Asc => "ASC",
        Direction::Desc => "DESC",
      };
      format!("{} {dir}", order_column(o.field))
    })
    .collect();
  format!("ORDER BY {}", terms.join(", "))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list shared by every `SELECT`, in [`RawCaseRecord`] field order.
pub const COLUMNS: &str = "record_id, date, state, region_code, region_name,
  province_code, province_name, province_acronym, latitude, longitude,
  total_cases, note, nuts_code_1, nuts_code_2, nuts_code_3";

/// Raw values read directly from a `case_records` row.
pub struct RawCaseRecord {
  pub record_id:        i64,
  pub date:             String,
  pub state:            Option<String>,
  pub region_code:      Option<String>,
  pub region_name:      String,
  pub province_code:    String,
  pub province_name:    String,
  pub province_acronym: Option<String>,
  pub latitude:         f64,
  pub longitude:        f64,
  pub total_cases:      i64,
  pub note:             Option<String>,
  pub nuts_code_1:      Option<String>,
  pub nuts_code_2:      Option<String>,
  pub nuts_code_3:      Option<String>,
}

impl RawCaseRecord {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:        row.get(0)?,
      date:             row.get(1)?,
      state:            row.get(2)?,
      region_code:      row.get(3)?,
      region_name:      row.get(4)?,
      province_code:    row.get(5)?,
      province_name:    row.get(6)?,
      province_acronym: row.get(7)?,
      latitude:         row.get(8)?,
      longitude:        row.get(9)?,
      total_cases:      row.get(10)?,
      note:             row.get(11)?,
      nuts_code_1:      row.get(12)?,
      nuts_code_2:      row.get(13)?,
      nuts_code_3:      row.get(14)?,
    })
  }

  pub fn into_record(self) -> Result<CaseRecord> {
    Ok(CaseRecord {
      id:               self.record_id,
      date:             decode_date(&self.date)?,
      state:            self.state,
      region_code:      self.region_code,
      region_name:      self.region_name,
      province_code:    self.province_code,
      province_name:    self.province_name,
      province_acronym: self.province_acronym,
      latitude:         self.latitude,
      longitude:        self.longitude,
      total_cases:      decode_count(self.total_cases)?,
      note:             self.note,
      nuts_code_1:      self.nuts_code_1,
      nuts_code_2:      self.nuts_code_2,
      nuts_code_3:      self.nuts_code_3,
    })
  }
}

/// Column values for one `INSERT`, owned so they can cross into the
/// connection thread.
pub struct RawNewRecord {
  pub date:             String,
  pub state:            Option<String>,
  pub region_code:      Option<String>,
  pub region_name:      String,
  pub province_code:    String,
  pub province_name:    String,
  pub province_acronym: Option<String>,
  pub latitude:         f64,
  pub longitude:        f64,
  pub total_cases:      i64,
  pub note:             Option<String>,
  pub nuts_code_1:      Option<String>,
  pub nuts_code_2:      Option<String>,
  pub nuts_code_3:      Option<String>,
}

impl RawNewRecord {
  pub fn encode(record: NewCaseRecord) -> Result<Self> {
    Ok(Self {
      date:             encode_date(record.date),
      total_cases:      encode_count(record.total_cases)?,
      state:            record.state,
      region_code:      record.region_code,
      region_name:      record.region_name,
      province_code:    record.province_code,
      province_name:    record.province_name,
      province_acronym: record.province_acronym,
      latitude:         record.latitude,
      longitude:        record.longitude,
      note:             record.note,
      nuts_code_1:      record.nuts_code_1,
      nuts_code_2:      record.nuts_code_2,
      nuts_code_3:      record.nuts_code_3,
    })
  }
}

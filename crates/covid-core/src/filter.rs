//! Typed query predicates and ordering for case-record reads.
//!
//! A [`Filter`] is a conjunction of [`Predicate`] leaves. Storage backends
//! translate each leaf into their own query language; the sync gate only ever
//! inspects a filter through [`Filter::exact_date`].

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::Error;

// ─── Predicates ──────────────────────────────────────────────────────────────

/// A single filter leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
  /// `date = value`
  DateEq(NaiveDate),
  /// `date >= value`
  DateFrom(NaiveDate),
  /// `date <= value`
  DateUntil(NaiveDate),
  RegionCode(String),
  RegionName(String),
  ProvinceCode(String),
  ProvinceName(String),
}

/// A conjunction of predicates. An empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
  predicates: Vec<Predicate>,
}

impl Filter {
  /// Match every record.
  pub fn all() -> Self { Self::default() }

  /// Match records for exactly `date`.
  pub fn on(date: NaiveDate) -> Self {
    Self::all().and(Predicate::DateEq(date))
  }

  /// Match records with `start <= date <= end`.
  pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
    Self::all()
      .and(Predicate::DateFrom(start))
      .and(Predicate::DateUntil(end))
  }

  /// Add another leaf to the conjunction.
  pub fn and(mut self, predicate: Predicate) -> Self {
    self.predicates.push(predicate);
    self
  }

  pub fn predicates(&self) -> &[Predicate] { &self.predicates }

  pub fn is_empty(&self) -> bool { self.predicates.is_empty() }

  /// The first exact-date equality in the filter, if there is one.
  pub fn exact_date(&self) -> Option<NaiveDate> {
    self.predicates.iter().find_map(|p| match p {
      Predicate::DateEq(date) => Some(*date),
      _ => None,
    })
  }
}

impl FromIterator<Predicate> for Filter {
  fn from_iter<I: IntoIterator<Item = Predicate>>(iter: I) -> Self {
    Self { predicates: iter.into_iter().collect() }
  }
}

// ─── Ordering ────────────────────────────────────────────────────────────────

/// The fields a caller may sort by. Anything else is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderField {
  TotalCases,
  ProvinceCode,
  Date,
  RegionName,
  /// The province name.
  Name,
}

impl OrderField {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::TotalCases => "total_cases",
      Self::ProvinceCode => "province_code",
      Self::Date => "date",
      Self::RegionName => "region_name",
      Self::Name => "name",
    }
  }
}

impl fmt::Display for OrderField {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderField {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "total_cases" => Ok(Self::TotalCases),
      "province_code" => Ok(Self::ProvinceCode),
      "date" => Ok(Self::Date),
      "region_name" => Ok(Self::RegionName),
      "name" => Ok(Self::Name),
      other => Err(Error::UnknownOrderField(other.to_owned())),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
  Asc,
  #[default]
  Desc,
}

/// One `ORDER BY` term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
  pub field:     OrderField,
  pub direction: Direction,
}

impl OrderBy {
  pub fn asc(field: OrderField) -> Self {
    Self { field, direction: Direction::Asc }
  }

  pub fn desc(field: OrderField) -> Self {
    Self { field, direction: Direction::Desc }
  }
}

/// Ordering applied when a caller supplies none, and appended as a
/// tie-breaker otherwise: newest first, then province name.
pub const DEFAULT_ORDER: [OrderBy; 2] = [
  OrderBy { field: OrderField::Date, direction: Direction::Desc },
  OrderBy { field: OrderField::Name, direction: Direction::Asc },
];

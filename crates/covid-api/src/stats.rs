//! Handler for `POST /v1/covid/stats`.
//!
//! The JSON body selects a date window, optional region/province filters, a
//! sort field, and optionally `group_by=region`. Every field is optional:
//!
//! ```json
//! {
//!   "start_date": "2020-02-24",
//!   "end_date": "2020-03-01",
//!   "data": "2020-02-25T17:00:00",
//!   "codice_regione": 5,
//!   "denominazione_regione": "Veneto",
//!   "codice_provincia": 26,
//!   "denominazione_provincia": "Treviso",
//!   "order_by": "total_cases",
//!   "group_by": "region"
//! }
//! ```

use std::sync::Arc;

use axum::{Json, extract::State};
use chrono::NaiveDate;
use covid_core::{
  filter::{Filter, OrderBy, OrderField, Predicate},
  record::CaseRecord,
  store::CaseStore,
  summary::{RegionTotal, group_by_region},
};
use covid_sync::{SyncGate, Upstream, sanitize::parse_entry_date};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::ApiError;

// ─── Request ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct StatsParams {
  pub start_date:              Option<String>,
  pub end_date:                Option<String>,
  /// Upstream-style timestamp; only its date part is used, as a fallback
  /// for `start_date`.
  pub data:                    Option<String>,
  /// Number or string.
  pub codice_regione:          Option<Value>,
  pub denominazione_regione:   Option<String>,
  /// Number or string.
  pub codice_provincia:        Option<Value>,
  pub denominazione_provincia: Option<String>,
  /// One of `total_cases` (default), `province_code`, `date`,
  /// `region_name`, `name`. Always sorted descending.
  pub order_by:                Option<String>,
  /// `"region"` to aggregate totals per region.
  pub group_by:                Option<String>,
}

fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
  NaiveDate::parse_from_str(raw, "%Y-%m-%d")
    .map_err(|e| ApiError::BadRequest(format!("Invalid date format: {raw:?}: {e}")))
}

/// Resolve the inclusive date window. `start_date` falls back to the date
/// part of `data`, then to `today`; `end_date` falls back to the start.
pub fn date_window(
  params: &StatsParams,
  today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate), ApiError> {
  let start = match (&params.start_date, &params.data) {
    (Some(raw), _) => parse_date(raw)?,
    (None, Some(raw)) => parse_entry_date(raw)
      .ok_or_else(|| ApiError::BadRequest(format!("Invalid date format: {raw:?}")))?,
    (None, None) => today,
  };
  let end = match &params.end_date {
    Some(raw) => parse_date(raw)?,
    None => start,
  };

  if end < start {
    return Err(ApiError::BadRequest(
      "end_date cannot be before start_date".to_owned(),
    ));
  }
  Ok((start, end))
}

fn code_param(name: &str, value: &Value) -> Result<String, ApiError> {
  match value {
    Value::String(s) => Ok(s.clone()),
    Value::Number(n) => Ok(n.to_string()),
    other => Err(ApiError::BadRequest(format!("Invalid {name}: {other}"))),
  }
}

/// The window plus any region/province filters from `params`.
pub fn build_filter(
  params: &StatsParams,
  start: NaiveDate,
  end: NaiveDate,
) -> Result<Filter, ApiError> {
  let mut filter = Filter::between(start, end);
  if let Some(code) = &params.codice_regione {
    filter = filter.and(Predicate::RegionCode(code_param("codice_regione", code)?));
  }
  if let Some(name) = &params.denominazione_regione {
    filter = filter.and(Predicate::RegionName(name.clone()));
  }
  if let Some(code) = &params.codice_provincia {
    filter = filter.and(Predicate::ProvinceCode(code_param("codice_provincia", code)?));
  }
  if let Some(name) = &params.denominazione_provincia {
    filter = filter.and(Predicate::ProvinceName(name.clone()));
  }
  Ok(filter)
}

/// The whitelisted sort field; anything outside the whitelist is rejected.
pub fn order_field(params: &StatsParams) -> Result<OrderField, ApiError> {
  match &params.order_by {
    None => Ok(OrderField::TotalCases),
    Some(raw) => raw
      .parse()
      .map_err(|_| ApiError::BadRequest("Invalid order_by field".to_owned())),
  }
}

// ─── Response ─────────────────────────────────────────────────────────────────

/// One province-day in the default (ungrouped) output.
#[derive(Debug, Serialize)]
pub struct CaseRow {
  pub date:          NaiveDate,
  pub region:        String,
  pub province:      String,
  pub province_code: String,
  pub total_cases:   u64,
}

impl From<CaseRecord> for CaseRow {
  fn from(r: CaseRecord) -> Self {
    Self {
      date:          r.date,
      region:        r.region_name,
      province:      r.province_name,
      province_code: r.province_code,
      total_cases:   r.total_cases,
    }
  }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum StatsData {
  Rows(Vec<CaseRow>),
  Regions(Vec<RegionTotal>),
}

impl StatsData {
  fn len(&self) -> usize {
    match self {
      Self::Rows(rows) => rows.len(),
      Self::Regions(regions) => regions.len(),
    }
  }
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
  pub status: &'static str,
  pub count:  usize,
  pub data:   StatsData,
}

// ─── Handler ──────────────────────────────────────────────────────────────────

/// `POST /v1/covid/stats`
pub async fn handler<S, U>(
  State(gate): State<Arc<SyncGate<S, U>>>,
  Json(params): Json<StatsParams>,
) -> Result<Json<StatsResponse>, ApiError>
where
  S: CaseStore,
  U: Upstream,
{
  let (start, end) = date_window(&params, gate.today())?;
  let field        = order_field(&params)?;
  let filter       = build_filter(&params, start, end)?;
  debug!(%start, %end, order_by = %field, "stats query");

  let records = gate
    .search_window(&filter, &[OrderBy::desc(field)], start, end)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  let data = if params.group_by.as_deref() == Some("region") {
    StatsData::Regions(group_by_region(&records))
  } else {
    StatsData::Rows(records.into_iter().map(CaseRow::from).collect())
  };

  Ok(Json(StatsResponse { status: "success", count: data.len(), data }))
}

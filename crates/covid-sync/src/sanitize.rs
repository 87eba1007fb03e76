//! Validation and type coercion for single upstream entries.
//!
//! Upstream is loosely typed: codes arrive as numbers or strings, case counts
//! occasionally as strings, coordinates as `null`. Every entry is checked on
//! its own; a rejection skips that entry and nothing else.

use std::fmt;

use chrono::NaiveDate;
use covid_core::record::NewCaseRecord;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Acronyms that mark placeholder rows ("in fase di definizione", "fuori
/// regione") rather than real provinces.
pub const PLACEHOLDER_ACRONYMS: [&str; 3] = ["", "FT", "null"];

/// Province code used upstream for cases attributed outside any region.
pub const OUT_OF_REGION_CODE: &str = "999";

/// One element of the upstream JSON array, before coercion.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamEntry {
  pub data:                    Option<String>,
  pub stato:                   Option<String>,
  pub codice_regione:          Option<Value>,
  pub denominazione_regione:   Option<String>,
  pub codice_provincia:        Option<Value>,
  pub denominazione_provincia: Option<String>,
  pub sigla_provincia:         Option<String>,
  pub lat:                     Option<Value>,
  pub long:                    Option<Value>,
  /// `None` when the key is absent; an explicit `null` is `Some(Null)`.
  #[serde(default, deserialize_with = "present")]
  pub totali_casi:             Option<Value>,
  #[serde(default, deserialize_with = "present")]
  pub totale_casi:             Option<Value>,
  pub note:                    Option<String>,
  pub codice_nuts_1:           Option<String>,
  pub codice_nuts_2:           Option<String>,
  pub codice_nuts_3:           Option<String>,
}

/// Keep an explicit `null` distinct from a missing key.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
  Value::deserialize(deserializer).map(Some)
}

/// Why an entry was not turned into a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
  /// A field could not be parsed or had the wrong type.
  Malformed(String),
  /// The province acronym is missing or a placeholder.
  Placeholder,
  /// The province code is [`OUT_OF_REGION_CODE`].
  OutOfRegion,
  /// The entry is dated after today.
  FutureDate(NaiveDate),
}

impl fmt::Display for Rejection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Malformed(why) => write!(f, "malformed entry: {why}"),
      Self::Placeholder => f.write_str("placeholder province"),
      Self::OutOfRegion => f.write_str("out-of-region province code"),
      Self::FutureDate(d) => write!(f, "future date {d}"),
    }
  }
}

fn malformed(why: impl Into<String>) -> Rejection { Rejection::Malformed(why.into()) }

// ─── Field coercion ──────────────────────────────────────────────────────────

/// Parse the calendar date from the first ten characters of a
/// `YYYY-MM-DDTHH:MM:SS` timestamp.
pub fn parse_entry_date(raw: &str) -> Option<NaiveDate> {
  let day = raw.get(..10).unwrap_or(raw);
  NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// The date of a raw JSON entry, if it has a readable one.
pub fn entry_date(entry: &Value) -> Option<NaiveDate> {
  entry.get("data").and_then(Value::as_str).and_then(parse_entry_date)
}

/// Whether a JSON value counts as "present" (not null, zero, or empty).
fn is_truthy(value: &Value) -> bool {
  match value {
    Value::Null => false,
    Value::Bool(b) => *b,
    Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
    Value::String(s) => !s.is_empty(),
    Value::Array(a) => !a.is_empty(),
    Value::Object(o) => !o.is_empty(),
  }
}

fn code_to_string(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

fn to_int(value: &Value) -> Result<i64, Rejection> {
  match value {
    Value::Number(n) => n
      .as_i64()
      .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
      .ok_or_else(|| malformed(format!("case count {n} out of range"))),
    Value::String(s) => s
      .trim()
      .parse()
      .map_err(|_| malformed(format!("case count {s:?} is not an integer"))),
    other => Err(malformed(format!("case count has type {}", type_name(other)))),
  }
}

fn to_coordinate(value: Option<&Value>, name: &str) -> Result<f64, Rejection> {
  let Some(value) = value.filter(|v| is_truthy(v)) else {
    return Ok(0.0);
  };
  let parsed = match value {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  };
  parsed
    .filter(|f: &f64| f.is_finite())
    .ok_or_else(|| malformed(format!("{name} {value} is not a number")))
}

fn type_name(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "bool",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

// ─── Sanitise ────────────────────────────────────────────────────────────────

/// Decode and sanitise one raw entry.
pub fn sanitize_value(value: Value, today: NaiveDate) -> Result<NewCaseRecord, Rejection> {
  let entry: UpstreamEntry =
    serde_json::from_value(value).map_err(|e| malformed(e.to_string()))?;
  sanitize(entry, today)
}

/// Turn an upstream entry into a storable record, or say why not.
///
/// - the case count is `totali_casi`, or `totale_casi` when that is absent,
///   null or zero, clamped at zero; a missing `totale_casi` counts as zero
///   but an explicit `null` one is malformed;
/// - missing coordinates become `0.0`;
/// - placeholder and out-of-region provinces are rejected;
/// - entries dated after `today` are rejected.
pub fn sanitize(entry: UpstreamEntry, today: NaiveDate) -> Result<NewCaseRecord, Rejection> {
  let province_code = entry
    .codice_provincia
    .as_ref()
    .and_then(code_to_string)
    .ok_or_else(|| malformed("missing codice_provincia"))?;

  let raw_date = entry.data.as_deref().ok_or_else(|| malformed("missing data"))?;
  let date = parse_entry_date(raw_date)
    .ok_or_else(|| malformed(format!("unparseable data {raw_date:?}")))?;

  let cases_raw = match &entry.totali_casi {
    Some(v) if is_truthy(v) => Some(v),
    _ => entry.totale_casi.as_ref(),
  };
  let cases = match cases_raw {
    Some(v) => to_int(v)?,
    None => 0,
  };
  let total_cases = u64::try_from(cases.max(0)).unwrap_or_default();

  let latitude  = to_coordinate(entry.lat.as_ref(), "lat")?;
  let longitude = to_coordinate(entry.long.as_ref(), "long")?;

  let region_name = entry
    .denominazione_regione
    .ok_or_else(|| malformed("missing denominazione_regione"))?;

  let acronym_is_placeholder = entry
    .sigla_provincia
    .as_deref()
    .is_none_or(|s| PLACEHOLDER_ACRONYMS.contains(&s.trim()));
  if acronym_is_placeholder {
    return Err(Rejection::Placeholder);
  }
  if province_code == OUT_OF_REGION_CODE {
    return Err(Rejection::OutOfRegion);
  }
  if date > today {
    return Err(Rejection::FutureDate(date));
  }

  Ok(NewCaseRecord {
    date,
    state: entry.stato,
    region_code: entry.codice_regione.as_ref().and_then(code_to_string),
    region_name,
    province_code,
    province_name: entry.denominazione_provincia.unwrap_or_default(),
    province_acronym: entry.sigla_provincia,
    latitude,
    longitude,
    total_cases,
    note: entry.note,
    nuts_code_1: entry.codice_nuts_1,
    nuts_code_2: entry.codice_nuts_2,
    nuts_code_3: entry.codice_nuts_3,
  })
}

//! Test doubles shared by the fetcher and gate tests.

use std::{collections::HashMap, sync::Mutex};

use chrono::NaiveDate;
use reqwest::StatusCode;
use serde_json::{Value, json};

use crate::{
  Error, Result,
  upstream::{Endpoint, Upstream},
};

/// An [`Upstream`] serving canned payloads and recording every request.
/// Endpoints without a payload answer 404.
#[derive(Default)]
pub struct MockUpstream {
  payloads: HashMap<&'static str, Vec<Value>>,
  calls:    Mutex<Vec<Endpoint>>,
}

impl MockUpstream {
  pub fn new() -> Self { Self::default() }

  pub fn serving(mut self, endpoint: Endpoint, entries: Vec<Value>) -> Self {
    self.payloads.insert(endpoint.file_name(), entries);
    self
  }

  pub fn calls(&self) -> Vec<Endpoint> {
    self.calls.lock().unwrap().clone()
  }
}

impl Upstream for MockUpstream {
  async fn fetch(&self, endpoint: Endpoint) -> Result<Vec<Value>> {
    self.calls.lock().unwrap().push(endpoint);
    self
      .payloads
      .get(endpoint.file_name())
      .cloned()
      .ok_or_else(|| Error::Status {
        url:    format!("mock://{}", endpoint.file_name()),
        status: StatusCode::NOT_FOUND,
      })
  }
}

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// A well-formed upstream entry.
pub fn entry(
  date: NaiveDate,
  region: &str,
  province_code: u32,
  province: &str,
  acronym: &str,
  cases: i64,
) -> Value {
  json!({
    "data": format!("{date}T17:00:00"),
    "stato": "ITA",
    "codice_regione": 5,
    "denominazione_regione": region,
    "codice_provincia": province_code,
    "denominazione_provincia": province,
    "sigla_provincia": acronym,
    "lat": 45.6,
    "long": 12.2,
    "totale_casi": cases,
    "note": null,
    "codice_nuts_1": "ITH",
    "codice_nuts_2": "ITH3",
    "codice_nuts_3": null
  })
}

/// Two real provinces and one placeholder row for `date`.
pub fn day(date: NaiveDate) -> Vec<Value> {
  vec![
    entry(date, "Veneto", 26, "Treviso", "TV", 10),
    entry(date, "Veneto", 27, "Venezia", "VE", 20),
    entry(date, "Veneto", 999, "Fuori Regione / Provincia Autonoma", "", 1),
  ]
}

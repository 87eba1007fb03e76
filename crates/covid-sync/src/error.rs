//! Error types for `covid-sync`.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("GET {url} returned {status}")]
  Status { url: String, status: StatusCode },

  #[error("invalid upstream payload: {0}")]
  Json(#[from] serde_json::Error),

  /// The upstream payload had no entries for the requested window.
  #[error("no upstream entries in the requested window")]
  EmptyWindow,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

//! Error types for `covid-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown order field: {0:?}")]
  UnknownOrderField(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

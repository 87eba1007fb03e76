//! Error type for `covid-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// A batch tried to write a `(date, province_code)` pair that already
  /// exists. The whole batch was rolled back.
  #[error("duplicate record: {0}")]
  Duplicate(String),

  #[error("date parse error: {0}")]
  DateParse(String),

  /// A stored or incoming value does not fit its column.
  #[error("corrupt value: {0}")]
  Corrupt(String),
}

impl Error {
  /// Route UNIQUE violations to [`Error::Duplicate`]; everything else stays a
  /// plain database error.
  pub(crate) fn from_write(err: tokio_rusqlite::Error) -> Self {
    if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(
      ffi_err,
      msg,
    )) = &err
      && ffi_err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    {
      return Error::Duplicate(msg.clone().unwrap_or_else(|| ffi_err.to_string()));
    }
    Error::Database(err)
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

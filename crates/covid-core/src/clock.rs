//! Source of "today" for the sync pipeline and the query API.

use chrono::{Local, NaiveDate};

/// Where the current calendar date comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Clock {
  /// The host's local date.
  #[default]
  System,
  /// A pinned date; used by tests and replays.
  Fixed(NaiveDate),
}

impl Clock {
  pub fn today(&self) -> NaiveDate {
    match self {
      Self::System => Local::now().date_naive(),
      Self::Fixed(date) => *date,
    }
  }
}

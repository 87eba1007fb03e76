//! Aggregations over case records.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::record::CaseRecord;

/// Total cases summed over every record of one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionTotal {
  pub region:      String,
  pub total_cases: u64,
}

/// Sum `total_cases` per region name, highest total first. Ties are broken by
/// region name so the output is stable.
pub fn group_by_region(records: &[CaseRecord]) -> Vec<RegionTotal> {
  let mut totals: HashMap<&str, u64> = HashMap::new();
  for record in records {
    *totals.entry(record.region_name.as_str()).or_default() += record.total_cases;
  }

  let mut grouped: Vec<RegionTotal> = totals
    .into_iter()
    .map(|(region, total_cases)| RegionTotal { region: region.to_owned(), total_cases })
    .collect();
  grouped.sort_by(|a, b| {
    b.total_cases
      .cmp(&a.total_cases)
      .then_with(|| a.region.cmp(&b.region))
  });
  grouped
}

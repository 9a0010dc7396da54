use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tally_schemas::{CanonicalRecord, PlaceType};

use crate::resolver::{most_recent_entries, most_recent_state_entry};

/// Summed totals over one or more region-total entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateTotals {
    pub confirmed: i64,
    pub deaths: i64,
    /// Sum of known populations; `None` when no entry carries one.
    pub population: Option<i64>,
    pub last_date: Option<NaiveDate>,
}

impl AggregateTotals {
    fn empty() -> Self {
        Self {
            confirmed: 0,
            deaths: 0,
            population: None,
            last_date: None,
        }
    }

    fn absorb(&mut self, record: &CanonicalRecord) {
        self.confirmed += record.confirmed;
        self.deaths += record.deaths;
        if let Some(p) = record.population {
            self.population = Some(self.population.unwrap_or(0) + p);
        }
        self.last_date = match self.last_date {
            Some(d) if d >= record.date => Some(d),
            _ => Some(record.date),
        };
    }

    pub fn confirmed_per_100k(&self) -> Option<f64> {
        per_100k(self.confirmed, self.population)
    }

    pub fn deaths_per_100k(&self) -> Option<f64> {
        per_100k(self.deaths, self.population)
    }

    pub fn death_rate_percent(&self) -> Option<f64> {
        death_rate_percent(self.deaths, self.confirmed)
    }
}

/// Cases per 100k inhabitants. `None` when the population is unknown or
/// zero — the rate is undefined, not infinite.
pub fn per_100k(count: i64, population: Option<i64>) -> Option<f64> {
    match population {
        Some(p) if p > 0 => Some(100_000.0 * count as f64 / p as f64),
        _ => None,
    }
}

/// Deaths as a percentage of confirmed cases. `None` when nothing is
/// confirmed yet.
pub fn death_rate_percent(deaths: i64, confirmed: i64) -> Option<f64> {
    if confirmed > 0 {
        Some(100.0 * deaths as f64 / confirmed as f64)
    } else {
        None
    }
}

/// Region totals as of a date: the latest region-total entry, summed into
/// [`AggregateTotals`] (empty totals when the region has no entry yet).
pub fn region_totals(
    records: &[CanonicalRecord],
    region: &str,
    as_of: NaiveDate,
) -> AggregateTotals {
    let mut totals = AggregateTotals::empty();
    if let Some(entry) = most_recent_state_entry(records, region, as_of) {
        totals.absorb(&entry);
    }
    totals
}

/// Nationwide totals as of a date: one latest region-total entry per region,
/// summed.
pub fn nationwide_totals(records: &[CanonicalRecord], as_of: NaiveDate) -> AggregateTotals {
    let regions: BTreeSet<&str> = records.iter().map(|r| r.region.as_str()).collect();

    let mut totals = AggregateTotals::empty();
    for region in regions {
        if let Some(entry) = most_recent_state_entry(records, region, as_of) {
            totals.absorb(&entry);
        }
    }
    totals
}

/// Number of distinct cities in a region with at least one canonical record
/// before `as_of`.
pub fn affected_cities(records: &[CanonicalRecord], region: &str, as_of: NaiveDate) -> usize {
    most_recent_entries(records, region, as_of, PlaceType::City)
        .iter()
        .filter(|r| r.place_code.is_some())
        .count()
}

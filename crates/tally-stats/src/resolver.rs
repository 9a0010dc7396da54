use std::collections::BTreeMap;

use chrono::NaiveDate;
use tally_schemas::{CanonicalRecord, PlaceType};

/// Most recent valid entry per place, as of a date.
///
/// Filters the canonical dataset to `region`, `date < as_of` (strict), and
/// `place_type`; groups by place identity; and keeps the record with the
/// maximum `order_for_place` in each group. City-level: one entry per city
/// with at least one qualifying record. State-level: zero or one entry.
///
/// Output order follows the grouping key (place code, then name), so equal
/// inputs always produce equal output.
pub fn most_recent_entries(
    records: &[CanonicalRecord],
    region: &str,
    as_of: NaiveDate,
    place_type: PlaceType,
) -> Vec<CanonicalRecord> {
    let mut latest: BTreeMap<(Option<i64>, Option<String>), &CanonicalRecord> = BTreeMap::new();

    for record in records {
        if record.region != region || record.place_type != place_type || record.date >= as_of {
            continue;
        }
        let key = (record.place_code, record.place_name.clone());
        match latest.get(&key) {
            Some(current) if current.order_for_place >= record.order_for_place => {}
            _ => {
                latest.insert(key, record);
            }
        }
    }

    latest.into_values().cloned().collect()
}

/// The single region-total entry as of a date, if any exists.
pub fn most_recent_state_entry(
    records: &[CanonicalRecord],
    region: &str,
    as_of: NaiveDate,
) -> Option<CanonicalRecord> {
    let mut entries = most_recent_entries(records, region, as_of, PlaceType::State);
    debug_assert!(entries.len() <= 1, "multiple state-total places for {region}");
    entries.pop()
}

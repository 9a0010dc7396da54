//! Version sequencing and storage-key derivation.
//!
//! A submitter who re-uploads for the same region+date supersedes their
//! earlier upload: the old one is cancelled and the new one gets the next
//! version number. The version feeds the storage key so uploads from
//! different users (or retries from the same user) never collide on a path.
//!
//! The counting and cancelling itself is transactional and lives in the
//! store implementations; the pure derivations live here so both backends
//! share them.

use chrono::NaiveDate;

/// File suffix for stored sheets. Parsing happens upstream, so the store
/// only ever sees normalized tables; the suffix is kept for the object key.
pub const STORAGE_SUFFIX: &str = ".csv";

/// Version for a submission with `prior` earlier submissions (cancelled
/// included) on the same (owner, region, date) key. Versions start at 1.
pub fn version_from_prior_count(prior: u64) -> i32 {
    prior as i32 + 1
}

/// Non-colliding storage identifier:
/// `{REGION}/cases-{REGION}-{date}-{owner}-{version}{suffix}`.
pub fn storage_key_for(region: &str, report_date: NaiveDate, owner: &str, version: i32) -> String {
    let region = region.to_uppercase();
    format!(
        "{region}/cases-{region}-{date}-{owner}-{version}{STORAGE_SUFFIX}",
        date = report_date.format("%Y-%m-%d"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_version_is_one() {
        assert_eq!(version_from_prior_count(0), 1);
        assert_eq!(version_from_prior_count(3), 4);
    }

    #[test]
    fn storage_key_encodes_key_and_version() {
        let date = NaiveDate::from_ymd_opt(2020, 5, 1).unwrap();
        assert_eq!(
            storage_key_for("sp", date, "alice", 2),
            "SP/cases-SP-2020-05-01-alice-2.csv"
        );
    }

    #[test]
    fn keys_differ_across_owners_and_versions() {
        let date = NaiveDate::from_ymd_opt(2020, 5, 1).unwrap();
        let a = storage_key_for("SP", date, "alice", 1);
        let b = storage_key_for("SP", date, "bob", 1);
        let c = storage_key_for("SP", date, "alice", 2);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}

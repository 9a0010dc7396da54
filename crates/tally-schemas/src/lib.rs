//! tally-schemas
//!
//! Shared data model for the submission reconciliation pipeline:
//! - [`Submission`] — one uploaded case-count table for one region+date
//!   from one submitter.
//! - [`PlaceRow`] — one normalized line of a submission's table.
//! - [`CanonicalRecord`] — a deployed, immutable observation in the
//!   append-only canonical dataset.
//! - [`SubmissionStatus`] — the status state machine (see `status`).
//!
//! Plain serde structs only. No IO, no storage coupling.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

mod status;

pub use status::SubmissionStatus;

/// Classification of one table row: the region-wide total, a single
/// locality, or the "imported/undefined" bucket that some bulletins carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceType {
    State,
    City,
    Undefined,
}

impl PlaceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaceType::State => "state",
            PlaceType::City => "city",
            PlaceType::Undefined => "undefined",
        }
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "state" => Ok(PlaceType::State),
            "city" => Ok(PlaceType::City),
            "undefined" => Ok(PlaceType::Undefined),
            other => Err(anyhow::anyhow!("invalid place type: {}", other)),
        }
    }
}

/// One normalized line of a submission table.
///
/// Validation (non-negative counts, code present iff `place_type == City`)
/// happens at the ingestion boundary; everything downstream trusts the shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceRow {
    pub place_type: PlaceType,
    /// Numeric place code for City rows; absent for State/Undefined rows.
    pub place_code: Option<i64>,
    /// Display name for City/Undefined rows; absent for the State row.
    pub place_name: Option<String>,
    pub confirmed: i64,
    pub deaths: i64,
}

impl PlaceRow {
    pub fn state_total(confirmed: i64, deaths: i64) -> Self {
        Self {
            place_type: PlaceType::State,
            place_code: None,
            place_name: None,
            confirmed,
            deaths,
        }
    }

    pub fn city(code: i64, name: impl Into<String>, confirmed: i64, deaths: i64) -> Self {
        Self {
            place_type: PlaceType::City,
            place_code: Some(code),
            place_name: Some(name.into()),
            confirmed,
            deaths,
        }
    }

    pub fn undefined(name: impl Into<String>, confirmed: i64, deaths: i64) -> Self {
        Self {
            place_type: PlaceType::Undefined,
            place_code: None,
            place_name: Some(name.into()),
            confirmed,
            deaths,
        }
    }

    /// Name used in discrepancy messages: "Total" for the state row,
    /// otherwise the place name (falling back to the code).
    pub fn display_name(&self) -> String {
        match self.place_type {
            PlaceType::State => "Total".to_string(),
            _ => match (&self.place_name, self.place_code) {
                (Some(name), _) => name.clone(),
                (None, Some(code)) => code.to_string(),
                (None, None) => "(unnamed)".to_string(),
            },
        }
    }
}

/// One uploaded dataset for one region+date from one submitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    /// Submitter identity (username). Authn is an external collaborator.
    pub owner: String,
    /// Two-letter uppercase region code, e.g. "SP".
    pub region: String,
    pub report_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    /// Version sequence for this (owner, region, date) key, starting at 1.
    pub version: i32,
    /// Non-colliding storage identifier derived from key + version.
    pub storage_key: String,
    pub status: SubmissionStatus,
    /// True once superseded by a newer version from the same owner/region/date.
    pub cancelled: bool,
    /// Peer-review link; symmetric once set (a.peer_id = b ⇒ b.peer_id = a).
    pub peer_id: Option<Uuid>,
    pub rows: Vec<PlaceRow>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Source bulletin URLs backing the numbers.
    pub source_urls: Vec<String>,
    /// Free-form caveats, e.g. "secretariat later posted one more death".
    pub notes: String,
}

impl Submission {
    pub fn active(&self) -> bool {
        !self.cancelled
    }

    /// Deployable: received, active, and peer-linked.
    pub fn ready_to_publish(&self) -> bool {
        self.status == SubmissionStatus::Received && !self.cancelled && self.peer_id.is_some()
    }

    /// Codes of all City rows (the key set for comparison step 2).
    pub fn city_codes(&self) -> BTreeSet<i64> {
        self.rows
            .iter()
            .filter(|r| r.place_type == PlaceType::City)
            .filter_map(|r| r.place_code)
            .collect()
    }

    pub fn city_row(&self, code: i64) -> Option<&PlaceRow> {
        self.rows
            .iter()
            .find(|r| r.place_type == PlaceType::City && r.place_code == Some(code))
    }

    /// The unique region-total row, if the table carries one.
    pub fn state_row(&self) -> Option<&PlaceRow> {
        self.rows.iter().find(|r| r.place_type == PlaceType::State)
    }

    pub fn undefined_row(&self) -> Option<&PlaceRow> {
        self.rows
            .iter()
            .find(|r| r.place_type == PlaceType::Undefined)
    }
}

/// A deployed, immutable case observation for a place+date.
///
/// `order_for_place` increases monotonically per place at deployment time,
/// so the newest record for a place always carries the highest value even
/// when several records share a date (same-day corrections).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub id: Uuid,
    pub region: String,
    pub place_type: PlaceType,
    pub place_code: Option<i64>,
    pub place_name: Option<String>,
    pub date: NaiveDate,
    pub confirmed: i64,
    pub deaths: i64,
    /// Estimated population; filled by an external backfill, absent for
    /// records deployed straight from submissions.
    pub population: Option<i64>,
    pub order_for_place: i32,
    pub created_at: DateTime<Utc>,
}

impl CanonicalRecord {
    /// Grouping identity for "most recent entry per place" resolution.
    pub fn place_key(&self) -> (PlaceType, String, Option<i64>, Option<String>) {
        (
            self.place_type,
            self.region.clone(),
            self.place_code,
            self.place_name.clone(),
        )
    }
}

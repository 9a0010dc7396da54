//! Request/response payloads for the tally-daemon HTTP API.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tally_schemas::{PlaceRow, Submission};
use uuid::Uuid;

/// POST /v1/submissions — a normalized upload from the validator
/// collaborator. Rows arrive already parsed and field-checked.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubmissionRequest {
    pub owner: String,
    pub region: String,
    pub report_date: NaiveDate,
    pub rows: Vec<PlaceRow>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub source_urls: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

/// 202 body for an accepted submission; reconciliation runs out-of-band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionAccepted {
    pub id: Uuid,
    pub version: i32,
    pub storage_key: String,
    pub status: String,
}

/// GET /v1/submissions/:id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionView {
    pub id: Uuid,
    pub owner: String,
    pub region: String,
    pub report_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub version: i32,
    pub status: String,
    pub cancelled: bool,
    pub peer_id: Option<Uuid>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl From<Submission> for SubmissionView {
    fn from(sub: Submission) -> Self {
        Self {
            id: sub.id,
            owner: sub.owner,
            region: sub.region,
            report_date: sub.report_date,
            created_at: sub.created_at,
            version: sub.version,
            status: sub.status.as_str().to_string(),
            cancelled: sub.cancelled,
            peer_id: sub.peer_id,
            errors: sub.errors,
            warnings: sub.warnings,
        }
    }
}

/// GET /v1/regions/:region/totals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TotalsResponse {
    pub region: String,
    pub as_of: NaiveDate,
    pub confirmed: i64,
    pub deaths: i64,
    pub population: Option<i64>,
    pub last_date: Option<NaiveDate>,
    pub confirmed_per_100k: Option<f64>,
    pub deaths_per_100k: Option<f64>,
    pub death_rate_percent: Option<f64>,
    pub affected_cities: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

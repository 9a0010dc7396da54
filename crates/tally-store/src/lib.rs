//! tally-store
//!
//! Persistence seam for submissions and the canonical dataset.
//!
//! [`SubmissionStore`] is the trait the engine orchestrates against; the
//! production implementation is [`PgStore`] (Postgres over sqlx, embedded
//! migrations). The in-memory implementation used by scenario tests lives in
//! `tally-testkit`.
//!
//! Transactional contract (every implementation must honor it):
//! - `register` — scan-and-cancel of older versions plus the insert is one
//!   atomic unit; concurrent writers for the same (submitter, region, date)
//!   key are serialized.
//! - `record_mismatch`, `link_pair`, `deploy_pair` — both rows of the pair
//!   change together or not at all; a reader never observes half a pair.
//! - Any backend failure rolls back without partial writes and is safe to
//!   retry.

use async_trait::async_trait;
use chrono::NaiveDate;
use tally_schemas::{CanonicalRecord, PlaceRow, Submission};
use uuid::Uuid;

mod pg;
pub mod versioning;

pub use pg::PgStore;

/// Environment variable holding the Postgres DSN.
pub const ENV_DB_URL: &str = "TALLY_DATABASE_URL";

/// Errors surfaced by store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No submission with this id.
    #[error("not found: submission {0}")]
    NotFound(Uuid),

    /// Precondition violation (e.g. deploying an unlinked submission or
    /// re-deploying a terminal one). The operation performed no mutation.
    /// Should never occur under normal ingestion flow — a defect if seen.
    #[error("invalid state: {reason}")]
    InvalidState { reason: String },

    /// Transient backend failure. No partial writes; safe to retry.
    #[error("storage backend error: {0}")]
    Backend(#[source] anyhow::Error),
}

impl StoreError {
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        StoreError::InvalidState {
            reason: reason.into(),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::Backend(anyhow::anyhow!("row not found")),
            other => StoreError::Backend(anyhow::Error::new(other)),
        }
    }
}

/// A normalized upload handed over by the ingestion boundary. The validator
/// collaborator has already parsed and field-checked the table.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub owner: String,
    pub region: String,
    pub report_date: NaiveDate,
    pub rows: Vec<PlaceRow>,
    pub warnings: Vec<String>,
    pub source_urls: Vec<String>,
    pub notes: String,
}

/// Persistence operations for submissions and canonical records.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Register a new submission: cancel all prior active submissions for
    /// the same (owner, region, date) key, assign the version sequence
    /// number and storage key, and insert. Atomic; serializes concurrent
    /// writers on the same key. Returns the stored submission.
    async fn register(&self, new: NewSubmission) -> Result<Submission, StoreError>;

    async fn fetch(&self, id: Uuid) -> Result<Submission, StoreError>;

    /// Sibling candidates for reconciliation: active submissions for the
    /// same region+date, status Received or CheckFailed, different owner,
    /// excluding `sub` itself. Ordered by `created_at` descending with `id`
    /// descending as the tie-break (deterministic search order).
    async fn siblings_of(&self, sub: &Submission) -> Result<Vec<Submission>, StoreError>;

    /// Record a failed comparison: store `errors` on both submissions and
    /// move both to CheckFailed. Atomic across the pair.
    async fn record_mismatch(
        &self,
        a: Uuid,
        b: Uuid,
        errors: &[String],
    ) -> Result<(), StoreError>;

    /// Link a matched pair: set mutual peer ids, clear errors, and reset
    /// both to Received. Atomic across the pair.
    async fn link_pair(&self, a: Uuid, b: Uuid) -> Result<(), StoreError>;

    /// Deploy a matched pair: both submissions become Deployed and the
    /// published submission's rows are appended to the canonical dataset
    /// with per-place monotonic `order_for_place`. Atomic. Fails with
    /// `InvalidState` (no mutation) unless `published` is Received, active,
    /// and mutually linked to `peer`.
    async fn deploy_pair(&self, published: Uuid, peer: Uuid) -> Result<(), StoreError>;

    /// All submissions for one (owner, region, date) key, oldest first.
    async fn submissions_for_key(
        &self,
        owner: &str,
        region: &str,
        report_date: NaiveDate,
    ) -> Result<Vec<Submission>, StoreError>;

    /// Read-only canonical dataset query for one region, ordered by date
    /// then `order_for_place`. Never mutates.
    async fn canonical_for_region(
        &self,
        region: &str,
    ) -> Result<Vec<CanonicalRecord>, StoreError>;
}

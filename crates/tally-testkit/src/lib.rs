//! tally-testkit
//!
//! Deterministic in-memory [`SubmissionStore`] implementation plus sheet
//! builders, for scenario tests that exercise the full register → reconcile
//! → publish pipeline without a database.
//!
//! [`MemStore`] honors the same transactional contract as the Postgres
//! store: every mutation happens under one mutex-guarded critical section,
//! so a pair is never observed half-linked or half-deployed, and any error
//! leaves the maps untouched.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use tally_schemas::{CanonicalRecord, PlaceRow, Submission, SubmissionStatus};
use tally_store::versioning::{storage_key_for, version_from_prior_count};
use tally_store::{NewSubmission, StoreError, SubmissionStore};
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    submissions: BTreeMap<Uuid, Submission>,
    canonical: Vec<CanonicalRecord>,
    /// Logical clock: each registration gets a strictly later created_at,
    /// so sibling ordering is reproducible within a test.
    seq: i64,
}

#[derive(Default)]
pub struct MemStore {
    inner: Mutex<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("mem store mutex poisoned")
    }

    /// Snapshot of one submission without going through the trait (handy
    /// for synchronous assertions).
    pub fn snapshot(&self, id: Uuid) -> Option<Submission> {
        self.lock().submissions.get(&id).cloned()
    }

    pub fn canonical_len(&self) -> usize {
        self.lock().canonical.len()
    }

    fn tick(inner: &mut Inner) -> DateTime<Utc> {
        inner.seq += 1;
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap() + Duration::milliseconds(inner.seq)
    }
}

fn require_transition(sub: &Submission, to: SubmissionStatus) -> Result<(), StoreError> {
    if !sub.status.can_become(to) {
        return Err(StoreError::invalid_state(format!(
            "submission {} cannot move {} -> {}",
            sub.id,
            sub.status.as_str(),
            to.as_str()
        )));
    }
    Ok(())
}

#[async_trait]
impl SubmissionStore for MemStore {
    async fn register(&self, new: NewSubmission) -> Result<Submission, StoreError> {
        let mut inner = self.lock();

        let prior = inner
            .submissions
            .values()
            .filter(|s| {
                s.owner == new.owner && s.region == new.region && s.report_date == new.report_date
            })
            .count() as u64;

        for s in inner.submissions.values_mut() {
            if s.owner == new.owner
                && s.region == new.region
                && s.report_date == new.report_date
                && !s.cancelled
            {
                s.cancelled = true;
            }
        }

        let version = version_from_prior_count(prior);
        let created_at = Self::tick(&mut inner);
        let sub = Submission {
            id: Uuid::new_v4(),
            storage_key: storage_key_for(&new.region, new.report_date, &new.owner, version),
            owner: new.owner,
            region: new.region,
            report_date: new.report_date,
            created_at,
            version,
            status: SubmissionStatus::Received,
            cancelled: false,
            peer_id: None,
            rows: new.rows,
            errors: Vec::new(),
            warnings: new.warnings,
            source_urls: new.source_urls,
            notes: new.notes,
        };
        inner.submissions.insert(sub.id, sub.clone());
        Ok(sub)
    }

    async fn fetch(&self, id: Uuid) -> Result<Submission, StoreError> {
        self.lock()
            .submissions
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn siblings_of(&self, sub: &Submission) -> Result<Vec<Submission>, StoreError> {
        let inner = self.lock();
        let mut siblings: Vec<Submission> = inner
            .submissions
            .values()
            .filter(|s| {
                s.region == sub.region
                    && s.report_date == sub.report_date
                    && !s.cancelled
                    && matches!(
                        s.status,
                        SubmissionStatus::Received | SubmissionStatus::CheckFailed
                    )
                    && s.id != sub.id
                    && s.owner != sub.owner
            })
            .cloned()
            .collect();
        // Most recent first; id descending breaks created_at ties.
        siblings.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(siblings)
    }

    async fn record_mismatch(
        &self,
        a: Uuid,
        b: Uuid,
        errors: &[String],
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        for id in [a, b] {
            let sub = inner.submissions.get(&id).ok_or(StoreError::NotFound(id))?;
            require_transition(sub, SubmissionStatus::CheckFailed)?;
        }
        for id in [a, b] {
            let sub = inner.submissions.get_mut(&id).expect("checked above");
            sub.status = SubmissionStatus::CheckFailed;
            sub.errors = errors.to_vec();
        }
        Ok(())
    }

    async fn link_pair(&self, a: Uuid, b: Uuid) -> Result<(), StoreError> {
        let mut inner = self.lock();
        for id in [a, b] {
            let sub = inner.submissions.get(&id).ok_or(StoreError::NotFound(id))?;
            require_transition(sub, SubmissionStatus::Received)?;
        }
        for (id, peer) in [(a, b), (b, a)] {
            let sub = inner.submissions.get_mut(&id).expect("checked above");
            sub.status = SubmissionStatus::Received;
            sub.errors.clear();
            sub.peer_id = Some(peer);
        }
        Ok(())
    }

    async fn deploy_pair(&self, published: Uuid, peer: Uuid) -> Result<(), StoreError> {
        let mut inner = self.lock();

        let sub = inner
            .submissions
            .get(&published)
            .ok_or(StoreError::NotFound(published))?
            .clone();
        let peer_sub = inner
            .submissions
            .get(&peer)
            .ok_or(StoreError::NotFound(peer))?
            .clone();

        if !sub.ready_to_publish() || sub.peer_id != Some(peer) {
            return Err(StoreError::invalid_state(format!(
                "submission {} is not ready to deploy (status={}, cancelled={}, peer={:?})",
                sub.id,
                sub.status.as_str(),
                sub.cancelled,
                sub.peer_id,
            )));
        }
        if peer_sub.peer_id != Some(published) {
            return Err(StoreError::invalid_state(format!(
                "peer link is not mutual between {} and {}",
                published, peer
            )));
        }
        require_transition(&sub, SubmissionStatus::Deployed)?;
        require_transition(&peer_sub, SubmissionStatus::Deployed)?;

        let created_at = Self::tick(&mut inner);
        let mut records = Vec::with_capacity(sub.rows.len());
        for row in &sub.rows {
            let next_order = inner
                .canonical
                .iter()
                .filter(|r| {
                    r.region == sub.region
                        && r.place_type == row.place_type
                        && r.place_code == row.place_code
                        && r.place_name == row.place_name
                })
                .map(|r| r.order_for_place)
                .max()
                .unwrap_or(0)
                + 1;
            records.push(CanonicalRecord {
                id: Uuid::new_v4(),
                region: sub.region.clone(),
                place_type: row.place_type,
                place_code: row.place_code,
                place_name: row.place_name.clone(),
                date: sub.report_date,
                confirmed: row.confirmed,
                deaths: row.deaths,
                population: None,
                order_for_place: next_order,
                created_at,
            });
        }

        for id in [published, peer] {
            inner
                .submissions
                .get_mut(&id)
                .expect("checked above")
                .status = SubmissionStatus::Deployed;
        }
        inner.canonical.extend(records);
        Ok(())
    }

    async fn submissions_for_key(
        &self,
        owner: &str,
        region: &str,
        report_date: NaiveDate,
    ) -> Result<Vec<Submission>, StoreError> {
        let inner = self.lock();
        let mut subs: Vec<Submission> = inner
            .submissions
            .values()
            .filter(|s| s.owner == owner && s.region == region && s.report_date == report_date)
            .cloned()
            .collect();
        subs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(subs)
    }

    async fn canonical_for_region(
        &self,
        region: &str,
    ) -> Result<Vec<CanonicalRecord>, StoreError> {
        let inner = self.lock();
        let mut records: Vec<CanonicalRecord> = inner
            .canonical
            .iter()
            .filter(|r| r.region == region)
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| a.order_for_place.cmp(&b.order_for_place))
        });
        Ok(records)
    }
}

/// Builder for normalized uploads in scenario tests.
pub struct SheetBuilder {
    new: NewSubmission,
}

impl SheetBuilder {
    pub fn new(owner: &str, region: &str, report_date: NaiveDate) -> Self {
        Self {
            new: NewSubmission {
                owner: owner.to_string(),
                region: region.to_string(),
                report_date,
                rows: Vec::new(),
                warnings: Vec::new(),
                source_urls: vec!["https://example.org/bulletin".to_string()],
                notes: String::new(),
            },
        }
    }

    pub fn row(mut self, row: PlaceRow) -> Self {
        self.new.rows.push(row);
        self
    }

    pub fn rows(mut self, rows: impl IntoIterator<Item = PlaceRow>) -> Self {
        self.new.rows.extend(rows);
        self
    }

    pub fn notes(mut self, notes: &str) -> Self {
        self.new.notes = notes.to_string();
        self
    }

    pub fn build(self) -> NewSubmission {
        self.new
    }
}

use tally_schemas::SubmissionStatus;
use tally_store::{StoreError, SubmissionStore};
use uuid::Uuid;

/// Outcome of one reconciliation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A sibling agreed; both submissions are now mutually linked and back
    /// to Received.
    Matched { peer: Uuid },
    /// Every candidate disagreed. Carries the error list from the last
    /// candidate tried (candidates run newest-first, so this reflects the
    /// oldest one); the same list is persisted on both submissions.
    Mismatched { errors: Vec<String> },
    /// No sibling to compare against yet. Not an error: the caller
    /// notifies and the submission stays pending.
    NoSiblings,
    /// Nothing to do: the submission is cancelled or already Deployed.
    /// Re-dispatching a processed submission is a no-op by contract.
    Skipped,
}

/// Run one reconciliation attempt for `id`.
///
/// Candidates are the active, pending submissions for the same region+date
/// from other owners, most recent first (store-enforced ordering, id as the
/// tie-break). The first candidate whose comparison comes back empty is
/// linked as the peer; every mismatching candidate gets the discrepancy
/// list recorded on both sides before the next one is tried.
pub async fn reconcile<S>(store: &S, id: Uuid) -> Result<ReconcileOutcome, StoreError>
where
    S: SubmissionStore + ?Sized,
{
    let sub = store.fetch(id).await?;
    if sub.cancelled || sub.status == SubmissionStatus::Deployed {
        tracing::debug!(submission = %id, cancelled = sub.cancelled, "reconcile skipped");
        return Ok(ReconcileOutcome::Skipped);
    }

    let siblings = store.siblings_of(&sub).await?;
    if siblings.is_empty() {
        tracing::info!(submission = %id, region = %sub.region, "no siblings to compare against");
        return Ok(ReconcileOutcome::NoSiblings);
    }

    let mut last_errors = Vec::new();
    for candidate in &siblings {
        let errors = tally_compare::compare(&sub, candidate);
        if errors.is_empty() {
            store.link_pair(sub.id, candidate.id).await?;
            tracing::info!(
                submission = %sub.id,
                peer = %candidate.id,
                region = %sub.region,
                "submissions matched and linked"
            );
            return Ok(ReconcileOutcome::Matched { peer: candidate.id });
        }
        store.record_mismatch(sub.id, candidate.id, &errors).await?;
        tracing::warn!(
            submission = %sub.id,
            candidate = %candidate.id,
            discrepancies = errors.len(),
            "comparison failed"
        );
        last_errors = errors;
    }

    Ok(ReconcileOutcome::Mismatched {
        errors: last_errors,
    })
}

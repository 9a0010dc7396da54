use tally_store::{StoreError, SubmissionStore};
use uuid::Uuid;

use crate::notify::NotificationSink;
use crate::publish::publish;
use crate::reconcile::{reconcile, ReconcileOutcome};

/// Background processing for a freshly registered submission.
///
/// This is the body of the fire-and-forget task the ingestion path spawns
/// per upload. Idempotent-safe: re-running it on a cancelled or already
/// deployed submission is a no-op.
///
/// A storage error aborts the attempt with statuses unchanged; the caller
/// may re-dispatch later. Sink calls happen after the state change they
/// report and cannot roll it back.
pub async fn process_new_submission<S>(
    store: &S,
    sink: &dyn NotificationSink,
    id: Uuid,
) -> Result<ReconcileOutcome, StoreError>
where
    S: SubmissionStore + ?Sized,
{
    let outcome = reconcile(store, id).await?;
    match &outcome {
        ReconcileOutcome::Skipped => {}
        ReconcileOutcome::NoSiblings => {
            let sub = store.fetch(id).await?;
            sink.no_siblings_found(&sub);
        }
        ReconcileOutcome::Mismatched { errors } => {
            let sub = store.fetch(id).await?;
            sink.mismatch_found(&sub, errors);
        }
        ReconcileOutcome::Matched { .. } => {
            publish(store, id).await?;
            let sub = store.fetch(id).await?;
            sink.import_succeeded(&sub);
        }
    }
    Ok(outcome)
}

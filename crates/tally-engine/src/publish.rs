use tally_store::{StoreError, SubmissionStore};
use uuid::Uuid;

/// Deploy a matched pair into the canonical dataset.
///
/// Preconditions (checked here and re-checked inside the store
/// transaction): status Received, not cancelled, peer link set. Violations
/// fail with `InvalidState` and mutate nothing. On success both sides of
/// the pair are Deployed and the published submission's rows are canonical
/// — a single atomic unit.
pub async fn publish<S>(store: &S, id: Uuid) -> Result<(), StoreError>
where
    S: SubmissionStore + ?Sized,
{
    let sub = store.fetch(id).await?;
    let peer = match sub.peer_id {
        Some(peer) if sub.ready_to_publish() => peer,
        _ => {
            return Err(StoreError::invalid_state(format!(
                "submission {} is not ready to publish (status={}, cancelled={}, peer={:?})",
                sub.id,
                sub.status.as_str(),
                sub.cancelled,
                sub.peer_id,
            )))
        }
    };

    store.deploy_pair(id, peer).await?;
    tracing::info!(
        submission = %id,
        peer = %peer,
        region = %sub.region,
        date = %sub.report_date,
        "pair deployed to canonical dataset"
    );
    Ok(())
}

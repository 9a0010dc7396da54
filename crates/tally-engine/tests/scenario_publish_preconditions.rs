use chrono::NaiveDate;
use tally_engine::{publish, reconcile, ReconcileOutcome};
use tally_schemas::{PlaceRow, SubmissionStatus};
use tally_store::{StoreError, SubmissionStore};
use tally_testkit::{MemStore, SheetBuilder};

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 5, 1).unwrap()
}

fn sheet(owner: &str) -> tally_store::NewSubmission {
    SheetBuilder::new(owner, "SP", date())
        .row(PlaceRow::state_total(10, 1))
        .row(PlaceRow::city(1, "Alpha", 10, 1))
        .build()
}

#[tokio::test]
async fn publish_without_peer_link_is_rejected() -> anyhow::Result<()> {
    let store = MemStore::new();
    let sub = store.register(sheet("alice")).await?;

    let err = publish(&store, sub.id).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidState { .. }));
    assert_eq!(store.fetch(sub.id).await?.status, SubmissionStatus::Received);
    assert_eq!(store.canonical_len(), 0);

    Ok(())
}

#[tokio::test]
async fn publish_deploys_both_sides_and_is_terminal() -> anyhow::Result<()> {
    let store = MemStore::new();
    let a = store.register(sheet("alice")).await?;
    let b = store.register(sheet("bob")).await?;

    let outcome = reconcile(&store, b.id).await?;
    assert_eq!(outcome, ReconcileOutcome::Matched { peer: a.id });

    publish(&store, b.id).await?;
    assert_eq!(store.fetch(a.id).await?.status, SubmissionStatus::Deployed);
    assert_eq!(store.fetch(b.id).await?.status, SubmissionStatus::Deployed);

    // Terminal: a repeat publish is rejected, not re-applied.
    let before = store.canonical_len();
    let err = publish(&store, b.id).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidState { .. }));
    assert_eq!(store.canonical_len(), before);

    Ok(())
}

#[tokio::test]
async fn publish_on_cancelled_submission_is_rejected() -> anyhow::Result<()> {
    let store = MemStore::new();
    let a = store.register(sheet("alice")).await?;
    let b = store.register(sheet("bob")).await?;
    reconcile(&store, b.id).await?;

    // Alice re-uploads after the link but before the deploy: her linked
    // submission is superseded and must no longer deploy.
    store.register(sheet("alice")).await?;
    assert!(store.fetch(a.id).await?.cancelled);

    let err = publish(&store, a.id).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidState { .. }));
    assert_eq!(store.canonical_len(), 0);

    Ok(())
}

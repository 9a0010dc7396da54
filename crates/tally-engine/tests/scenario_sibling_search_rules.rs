use chrono::NaiveDate;
use tally_engine::{reconcile, ReconcileOutcome};
use tally_schemas::PlaceRow;
use tally_store::SubmissionStore;
use tally_testkit::{MemStore, SheetBuilder};

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 5, day).unwrap()
}

fn sheet(owner: &str, region: &str, day: u32) -> tally_store::NewSubmission {
    SheetBuilder::new(owner, region, d(day))
        .row(PlaceRow::city(1, "Alpha", 10, 1))
        .build()
}

#[tokio::test]
async fn same_owner_submissions_are_not_siblings() -> anyhow::Result<()> {
    let store = MemStore::new();

    // Alice's older upload for the same key is cancelled by registration,
    // but even a same-owner submission for the key must never be a
    // comparison candidate.
    store.register(sheet("alice", "SP", 1)).await?;
    let second = store.register(sheet("alice", "SP", 1)).await?;

    let outcome = reconcile(&store, second.id).await?;
    assert_eq!(outcome, ReconcileOutcome::NoSiblings);

    Ok(())
}

#[tokio::test]
async fn other_regions_and_dates_are_not_siblings() -> anyhow::Result<()> {
    let store = MemStore::new();

    store.register(sheet("bob", "RJ", 1)).await?;
    store.register(sheet("carol", "SP", 2)).await?;
    let incoming = store.register(sheet("alice", "SP", 1)).await?;

    let outcome = reconcile(&store, incoming.id).await?;
    assert_eq!(outcome, ReconcileOutcome::NoSiblings);

    Ok(())
}

#[tokio::test]
async fn deployed_pairs_are_not_candidates_again() -> anyhow::Result<()> {
    let store = MemStore::new();

    // Bob and Carol agree and get deployed.
    let b = store.register(sheet("bob", "SP", 1)).await?;
    let c = store.register(sheet("carol", "SP", 1)).await?;
    reconcile(&store, c.id).await?;
    tally_engine::publish(&store, c.id).await?;

    // Alice arrives later with the same numbers: nothing left to pair with.
    let a = store.register(sheet("alice", "SP", 1)).await?;
    let outcome = reconcile(&store, a.id).await?;
    assert_eq!(outcome, ReconcileOutcome::NoSiblings);

    // Deployed rows untouched.
    assert_eq!(store.fetch(b.id).await?.peer_id, Some(c.id));

    Ok(())
}

use chrono::{NaiveDate, Utc};
use tally_compare::compare;
use tally_schemas::{PlaceRow, Submission, SubmissionStatus};
use uuid::Uuid;

fn sheet(owner: &str, rows: Vec<PlaceRow>) -> Submission {
    Submission {
        id: Uuid::new_v4(),
        owner: owner.to_string(),
        region: "SP".to_string(),
        report_date: NaiveDate::from_ymd_opt(2020, 5, 1).unwrap(),
        created_at: Utc::now(),
        version: 1,
        storage_key: String::new(),
        status: SubmissionStatus::Received,
        cancelled: false,
        peer_id: None,
        rows,
        errors: vec![],
        warnings: vec![],
        source_urls: vec![],
        notes: String::new(),
    }
}

#[test]
fn identical_tables_compare_clean() {
    let rows = vec![
        PlaceRow::state_total(120, 7),
        PlaceRow::city(3550308, "Sao Paulo", 100, 6),
        PlaceRow::city(3509502, "Campinas", 20, 1),
    ];
    let a = sheet("alice", rows.clone());
    let b = sheet("bob", rows);

    assert!(compare(&a, &b).is_empty());
    assert!(compare(&b, &a).is_empty());
}

#[test]
fn row_order_is_irrelevant() {
    let a = sheet(
        "alice",
        vec![
            PlaceRow::state_total(30, 2),
            PlaceRow::city(1, "Alpha", 10, 1),
            PlaceRow::city(2, "Beta", 20, 1),
        ],
    );
    let b = sheet(
        "bob",
        vec![
            PlaceRow::city(2, "Beta", 20, 1),
            PlaceRow::city(1, "Alpha", 10, 1),
            PlaceRow::state_total(30, 2),
        ],
    );

    assert!(compare(&a, &b).is_empty());
}

#[test]
fn undefined_bucket_matches_by_kind() {
    let a = sheet(
        "alice",
        vec![
            PlaceRow::state_total(15, 1),
            PlaceRow::city(1, "Alpha", 10, 1),
            PlaceRow::undefined("Imported/Undefined", 5, 0),
        ],
    );
    let b = sheet(
        "bob",
        vec![
            PlaceRow::undefined("Imported/Undefined", 5, 0),
            PlaceRow::state_total(15, 1),
            PlaceRow::city(1, "Alpha", 10, 1),
        ],
    );

    assert!(compare(&a, &b).is_empty());
}

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
fn city_only_in_one_sheet_is_named_with_both_owners() {
    let a = sheet(
        "alice",
        vec![
            PlaceRow::city(1, "Springfield", 10, 1),
            PlaceRow::city(2, "Shelbyville", 5, 0),
        ],
    );
    let b = sheet("bob", vec![PlaceRow::city(2, "Shelbyville", 5, 0)]);

    let errors = compare(&a, &b);
    assert_eq!(
        errors,
        vec![
            "Springfield is in the imported sheet (by alice) but not in the comparison sheet (by bob).".to_string()
        ]
    );

    // Swapped roles: same discrepancy, mirrored message.
    let errors = compare(&b, &a);
    assert_eq!(
        errors,
        vec![
            "Springfield is in the comparison sheet (by alice) but not in the imported sheet (by bob).".to_string()
        ]
    );
}

#[test]
fn extras_on_both_sides_are_all_reported() {
    let a = sheet(
        "alice",
        vec![
            PlaceRow::city(1, "Alpha", 10, 1),
            PlaceRow::city(3, "Gamma", 3, 0),
        ],
    );
    let b = sheet(
        "bob",
        vec![
            PlaceRow::city(1, "Alpha", 10, 1),
            PlaceRow::city(2, "Beta", 2, 0),
        ],
    );

    let errors = compare(&a, &b);
    assert_eq!(errors.len(), 2);
    assert!(errors[0].starts_with("Gamma is in the imported sheet (by alice)"));
    assert!(errors[1].starts_with("Beta is in the comparison sheet (by bob)"));
}

#[test]
fn shared_cities_still_checked_when_extras_exist() {
    // Alpha's counts drift while Gamma is an extra: both reported.
    let a = sheet(
        "alice",
        vec![
            PlaceRow::city(1, "Alpha", 11, 1),
            PlaceRow::city(3, "Gamma", 3, 0),
        ],
    );
    let b = sheet("bob", vec![PlaceRow::city(1, "Alpha", 10, 1)]);

    let errors = compare(&a, &b);
    assert!(errors
        .iter()
        .any(|e| e.starts_with("Gamma is in the imported sheet")));
    assert!(errors
        .iter()
        .any(|e| e == "Confirmed cases or deaths differ for Alpha."));
}

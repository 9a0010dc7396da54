use std::collections::BTreeSet;

use tally_schemas::{PlaceRow, PlaceType, Submission};

/// Compare two submissions field-by-field and return human-readable
/// discrepancies. An empty list means the sheets agree.
///
/// Check precedence is fixed:
/// 1. Region / report-date mismatch — one top-level error each, and no
///    further checks run (comparing rows across keys is meaningless).
/// 2. Set difference of City place codes, both directions, one error per
///    extra place, naming the place and both owners.
/// 3. If the place sets agree but the total row counts differ, a single
///    count-mismatch error (catches duplicated or missing State/Undefined
///    rows that the code sets cannot see).
/// 4. Per-row confirmed/death comparison for places present on both sides.
///    State rows match the other side's unique State row, Undefined rows
///    the other side's Undefined row, City rows by code. The State row is
///    reported as "Total".
///
/// Output order is deterministic: set-difference errors follow ascending
/// code order, row errors follow `a`'s row order.
pub fn compare(a: &Submission, b: &Submission) -> Vec<String> {
    let mut errors = Vec::new();

    if a.report_date != b.report_date {
        errors.push("Report dates differ between the two sheets.".to_string());
    }
    if a.region != b.region {
        errors.push("Regions differ between the two sheets.".to_string());
    }
    if !errors.is_empty() {
        return errors;
    }

    let a_codes = a.city_codes();
    let b_codes = b.city_codes();

    let only_in_a: BTreeSet<i64> = a_codes.difference(&b_codes).copied().collect();
    let only_in_b: BTreeSet<i64> = b_codes.difference(&a_codes).copied().collect();

    for code in &only_in_a {
        errors.push(format!(
            "{} is in the imported sheet (by {}) but not in the comparison sheet (by {}).",
            place_label(a, *code),
            a.owner,
            b.owner,
        ));
    }
    for code in &only_in_b {
        errors.push(format!(
            "{} is in the comparison sheet (by {}) but not in the imported sheet (by {}).",
            place_label(b, *code),
            b.owner,
            a.owner,
        ));
    }

    if errors.is_empty() && a.rows.len() != b.rows.len() {
        errors.push(format!(
            "Final entry counts diverge. The comparison sheet (by {}) has {} entries but the imported one (by {}) has {}.",
            b.owner,
            b.rows.len(),
            a.owner,
            a.rows.len(),
        ));
    }

    for row in &a.rows {
        // Rows already reported as set-difference extras are skipped here.
        if row.place_type == PlaceType::City {
            match row.place_code {
                Some(code) if only_in_a.contains(&code) => continue,
                _ => {}
            }
        }
        let counterpart = match row.place_type {
            PlaceType::State => b.state_row(),
            PlaceType::Undefined => b.undefined_row(),
            PlaceType::City => row.place_code.and_then(|code| b.city_row(code)),
        };
        if !counts_match(row, counterpart) {
            errors.push(format!(
                "Confirmed cases or deaths differ for {}.",
                row.display_name()
            ));
        }
    }

    errors
}

fn counts_match(row: &PlaceRow, other: Option<&PlaceRow>) -> bool {
    match other {
        Some(other) => row.confirmed == other.confirmed && row.deaths == other.deaths,
        None => false,
    }
}

/// Display label for a City code, taken from the sheet that carries it.
fn place_label(sheet: &Submission, code: i64) -> String {
    sheet
        .city_row(code)
        .map(|r| r.display_name())
        .unwrap_or_else(|| code.to_string())
}

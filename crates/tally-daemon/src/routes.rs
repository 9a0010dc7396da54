//! Axum router and all HTTP handlers for tally-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and
//! attaches middleware layers. Handlers stay `pub(crate)`; the scenario
//! tests compose the bare router directly.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tally_engine::process_new_submission;
use tally_schemas::{PlaceType, SubmissionStatus};
use tally_store::{NewSubmission, StoreError};
use uuid::Uuid;

use crate::api_types::{
    CreateSubmissionRequest, ErrorResponse, SubmissionAccepted, SubmissionView, TotalsResponse,
};
use crate::state::AppState;

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are not applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/submissions", post(create_submission))
        .route("/v1/submissions/:id", get(get_submission))
        .route("/v1/regions/:region/latest", get(latest_entries))
        .route("/v1/regions/:region/totals", get(region_totals))
        .with_state(state)
}

/// Map store errors onto HTTP statuses.
fn error_response(err: StoreError) -> Response {
    let (status, msg) = match &err {
        StoreError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        StoreError::InvalidState { .. } => (StatusCode::CONFLICT, err.to_string()),
        StoreError::Backend(_) => {
            tracing::error!(error = %err, "storage backend failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage backend failure".to_string(),
            )
        }
    };
    (status, Json(ErrorResponse { error: msg })).into_response()
}

pub(crate) async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "ok": true })))
}

// ---------------------------------------------------------------------------
// POST /v1/submissions
// ---------------------------------------------------------------------------

pub(crate) async fn create_submission(
    State(st): State<Arc<AppState>>,
    Json(req): Json<CreateSubmissionRequest>,
) -> Response {
    if let Err(msg) = validate_request(&req) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse { error: msg }),
        )
            .into_response();
    }

    let new = NewSubmission {
        owner: req.owner,
        region: req.region.to_uppercase(),
        report_date: req.report_date,
        rows: req.rows,
        warnings: req.warnings,
        source_urls: req.source_urls,
        notes: req.notes,
    };

    let sub = match st.store.register(new).await {
        Ok(sub) => sub,
        Err(err) => return error_response(err),
    };

    // Fire-and-forget: reconciliation runs outside the request path.
    let store = Arc::clone(&st.store);
    let sink = Arc::clone(&st.sink);
    let id = sub.id;
    tokio::spawn(async move {
        if let Err(err) = process_new_submission(store.as_ref(), sink.as_ref(), id).await {
            tracing::error!(submission = %id, error = %err, "submission processing failed");
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(SubmissionAccepted {
            id: sub.id,
            version: sub.version,
            storage_key: sub.storage_key,
            status: SubmissionStatus::Received.as_str().to_string(),
        }),
    )
        .into_response()
}

/// Ingress sanity checks. Full field validation happens upstream in the
/// validator collaborator; this only rejects payloads that violate the
/// normalized-table shape outright.
fn validate_request(req: &CreateSubmissionRequest) -> Result<(), String> {
    if req.owner.trim().is_empty() {
        return Err("owner must not be empty".to_string());
    }
    if req.region.trim().is_empty() {
        return Err("region must not be empty".to_string());
    }
    for row in &req.rows {
        if row.confirmed < 0 || row.deaths < 0 {
            return Err(format!("negative counts for {}", row.display_name()));
        }
        if row.place_type == PlaceType::City && row.place_code.is_none() {
            return Err(format!("city row {} has no place code", row.display_name()));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// GET /v1/submissions/:id
// ---------------------------------------------------------------------------

pub(crate) async fn get_submission(
    State(st): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Response {
    match st.store.fetch(id).await {
        Ok(sub) => (StatusCode::OK, Json(SubmissionView::from(sub))).into_response(),
        Err(err) => error_response(err),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/regions/:region/latest
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct LatestQuery {
    pub as_of: NaiveDate,
    /// "city" (default) or "state".
    pub place_type: Option<String>,
}

pub(crate) async fn latest_entries(
    State(st): State<Arc<AppState>>,
    Path(region): Path<String>,
    Query(q): Query<LatestQuery>,
) -> Response {
    let place_type = match q.place_type.as_deref() {
        None => PlaceType::City,
        Some(raw) => match PlaceType::parse(raw) {
            Ok(pt) => pt,
            Err(err) => {
                return (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(ErrorResponse {
                        error: err.to_string(),
                    }),
                )
                    .into_response()
            }
        },
    };

    let region = region.to_uppercase();
    let records = match st.store.canonical_for_region(&region).await {
        Ok(records) => records,
        Err(err) => return error_response(err),
    };

    let entries = tally_stats::most_recent_entries(&records, &region, q.as_of, place_type);
    (StatusCode::OK, Json(entries)).into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/regions/:region/totals
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct TotalsQuery {
    pub as_of: NaiveDate,
}

pub(crate) async fn region_totals(
    State(st): State<Arc<AppState>>,
    Path(region): Path<String>,
    Query(q): Query<TotalsQuery>,
) -> Response {
    let region = region.to_uppercase();
    let records = match st.store.canonical_for_region(&region).await {
        Ok(records) => records,
        Err(err) => return error_response(err),
    };

    let totals = tally_stats::region_totals(&records, &region, q.as_of);
    let resp = TotalsResponse {
        region: region.clone(),
        as_of: q.as_of,
        confirmed: totals.confirmed,
        deaths: totals.deaths,
        population: totals.population,
        last_date: totals.last_date,
        confirmed_per_100k: totals.confirmed_per_100k(),
        deaths_per_100k: totals.deaths_per_100k(),
        death_rate_percent: totals.death_rate_percent(),
        affected_cities: tally_stats::affected_cities(&records, &region, q.as_of),
    };
    (StatusCode::OK, Json(resp)).into_response()
}

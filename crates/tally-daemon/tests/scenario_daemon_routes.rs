//! In-process scenario tests for tally-daemon HTTP endpoints.
//!
//! These tests spin up the Axum router without binding a TCP socket: each
//! test composes `routes::build_router` over the in-memory store and
//! drives it via `tower::ServiceExt::oneshot` — no network I/O, no
//! database required.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::json;
use tally_daemon::{routes, state};
use tally_engine::TracingSink;
use tally_testkit::MemStore;
use tower::ServiceExt; // oneshot

fn make_router() -> axum::Router {
    let st = Arc::new(state::AppState::new(
        Arc::new(MemStore::new()),
        Arc::new(TracingSink),
    ));
    routes::build_router(st)
}

async fn call(
    router: axum::Router,
    req: Request<axum::body::Body>,
) -> (StatusCode, serde_json::Value) {
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    let value = serde_json::from_slice(&body).expect("body is not valid JSON");
    (status, value)
}

fn post_submission(owner: &str) -> Request<axum::body::Body> {
    let body = json!({
        "owner": owner,
        "region": "SP",
        "report_date": "2020-05-01",
        "rows": [
            { "place_type": "state", "place_code": null, "place_name": null, "confirmed": 12, "deaths": 2 },
            { "place_type": "city", "place_code": 3550308, "place_name": "Sao Paulo", "confirmed": 12, "deaths": 2 }
        ],
        "source_urls": ["https://example.org/bulletin"]
    });
    Request::builder()
        .method("POST")
        .uri("/v1/submissions")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<axum::body::Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap()
}

#[tokio::test]
async fn health_returns_ok() {
    let (status, body) = call(make_router(), get("/v1/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], json!(true));
}

#[tokio::test]
async fn submission_is_accepted_with_version_and_storage_key() {
    let router = make_router();
    let (status, body) = call(router, post_submission("alice")).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["version"], json!(1));
    assert_eq!(body["status"], json!("RECEIVED"));
    assert_eq!(
        body["storage_key"],
        json!("SP/cases-SP-2020-05-01-alice-1.csv")
    );
}

#[tokio::test]
async fn malformed_rows_are_rejected() {
    let router = make_router();
    let body = json!({
        "owner": "alice",
        "region": "SP",
        "report_date": "2020-05-01",
        "rows": [
            { "place_type": "city", "place_code": null, "place_name": "Nowhere", "confirmed": 1, "deaths": 0 }
        ]
    });
    let req = Request::builder()
        .method("POST")
        .uri("/v1/submissions")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap();

    let (status, body) = call(router, req).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("has no place code"));
}

#[tokio::test]
async fn unknown_submission_is_404() {
    let (status, _) = call(
        make_router(),
        get("/v1/submissions/00000000-0000-0000-0000-000000000000"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn matching_pair_reaches_canonical_dataset() {
    let router = make_router();

    let (status, first) = call(router.clone(), post_submission("alice")).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let (status, _second) = call(router.clone(), post_submission("bob")).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    // Processing is fire-and-forget; poll until the pair deploys.
    let uri = format!("/v1/submissions/{}", first["id"].as_str().unwrap());
    let mut deployed = false;
    for _ in 0..100 {
        let (status, view) = call(router.clone(), get(&uri)).await;
        assert_eq!(status, StatusCode::OK);
        if view["status"] == json!("DEPLOYED") {
            deployed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(deployed, "pair never deployed");

    // Canonical reads: totals as of the day after the report date.
    let (status, totals) = call(
        router.clone(),
        get("/v1/regions/SP/totals?as_of=2020-05-02"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(totals["confirmed"], json!(12));
    assert_eq!(totals["deaths"], json!(2));
    assert_eq!(totals["affected_cities"], json!(1));
    // No population backfill: rates are undefined, not zero.
    assert_eq!(totals["confirmed_per_100k"], json!(null));

    let (status, latest) = call(
        router,
        get("/v1/regions/SP/latest?as_of=2020-05-02&place_type=city"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(latest.as_array().unwrap().len(), 1);
    assert_eq!(latest[0]["place_code"], json!(3550308));
}

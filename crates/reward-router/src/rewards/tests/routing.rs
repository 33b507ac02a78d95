use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use super::common::*;
use crate::rewards::router::{evaluate_handler, reward_router, EvaluateRequest};
use crate::rewards::store::InMemoryRewardStore;

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

#[tokio::test]
async fn evaluate_handler_rejects_invalid_amount() {
    let (_store, service) = service_with(registry(), ledger(0.0));
    let response = evaluate_handler::<InMemoryRewardStore>(
        State(Arc::new(service)),
        axum::Json(EvaluateRequest {
            amount: 0.0,
            brand: None,
            today: Some(today()),
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert!(body["error"]
        .as_str()
        .expect("error message")
        .starts_with("Please enter a valid amount"));
}

#[tokio::test]
async fn evaluate_then_commit_round_trip() {
    let (store, service) = service_with(registry(), ledger(94_644.0));
    let app = reward_router(Arc::new(service));

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/rewards/evaluate",
            json!({ "amount": 60000.0, "brand": "Croma", "today": "2026-06-15" }),
        ))
        .await
        .expect("evaluate responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["brand"], "Croma");
    assert_eq!(body["candidate_count"], 4);
    assert_eq!(body["top"].as_array().expect("top list").len(), 3);
    assert_eq!(body["top"][0]["method_id"], "kiwi");
    assert_eq!(body["top"][0]["label"], "Best option");
    assert_eq!(body["top"][0]["reward_display"], "₹2861");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/rewards/commit",
            json!({ "rank": 0, "today": "2026-06-15" }),
        ))
        .await
        .expect("commit responds");
    assert_eq!(response.status(), StatusCode::OK);
    let receipt = read_json_body(response).await;
    assert_eq!(receipt["method_id"], "kiwi");
    assert_eq!(
        store.saved_ledger().expect("saved").milestone.ytd_spend,
        154_644.0
    );

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/rewards/commit",
            json!({ "rank": 0, "today": "2026-06-15" }),
        ))
        .await
        .expect("commit responds");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn toggling_unknown_method_is_not_found() {
    let (_store, service) = service_with(registry(), ledger(0.0));
    let app = reward_router(Arc::new(service));

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/v1/rewards/methods/missing/active",
            json!({ "active": false }),
        ))
        .await
        .expect("toggle responds");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(json_request(
            "PUT",
            "/api/v1/rewards/methods/sbi_5x/active",
            json!({ "active": false }),
        ))
        .await
        .expect("toggle responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["active"], false);
}

#[tokio::test]
async fn empty_registry_returns_guidance_message() {
    let (_store, service) =
        service_with(crate::rewards::MethodRegistry::default(), ledger(0.0));
    let app = reward_router(Arc::new(service));

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/rewards/evaluate",
            json!({ "amount": 100.0, "today": "2026-06-15" }),
        ))
        .await
        .expect("evaluate responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["candidate_count"], 0);
    assert!(body["message"].as_str().is_some());
}

#[tokio::test]
async fn status_endpoint_accepts_a_date_query() {
    let (_store, service) = service_with(registry(), ledger(10_000.0));
    let app = reward_router(Arc::new(service));

    let request = Request::builder()
        .uri("/api/v1/rewards/status?today=2026-06-15")
        .body(Body::empty())
        .expect("request builds");
    let response = app.oneshot(request).await.expect("status responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["month"], "2026-06");
    assert_eq!(body["milestone"]["ytd_spend"], 10_000.0);
    assert_eq!(body["routes"].as_array().expect("routes").len(), 4);
}

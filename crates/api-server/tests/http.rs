//! Router-level tests driven through `tower::ServiceExt::oneshot`.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Days, Utc};
use funnel_api::{ApiServer, Dataset};
use funnel_core::config::{AppConfig, SyntheticConfig};
use funnel_core::types::RawEventRecord;
use funnel_reporting::RollupOrchestrator;
use funnel_source::UnavailableSource;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn record(days_ago: u64, offer_id: i64, publisher: &str, clicks: u64, installs: u64) -> RawEventRecord {
    RawEventRecord {
        id: format!("{publisher}-{days_ago}"),
        date: Utc::now()
            .date_naive()
            .checked_sub_days(Days::new(days_ago))
            .unwrap(),
        offer_id,
        publisher: Some(publisher.to_string()),
        bundle: None,
        brand: None,
        model: None,
        ad_type: None,
        bid_floor: None,
        clicks,
        installs,
        events: 0,
        revenues: 0.0,
    }
}

fn orchestrator() -> Arc<RollupOrchestrator> {
    Arc::new(RollupOrchestrator::new(
        Arc::new(UnavailableSource),
        SyntheticConfig {
            days: 7,
            records_per_day: 20,
            seed: Some(1),
        },
    ))
}

fn app(dataset: Option<Dataset>) -> Router {
    let mut config = AppConfig::default();
    if dataset.is_some() {
        config.dataset.path = Some("fixture.json".into());
    }
    ApiServer::new(config, orchestrator(), dataset.map(Arc::new)).router()
}

fn fixture() -> Dataset {
    Dataset::new(
        vec![
            record(0, 1001, "pubA", 100, 10),
            record(1, 1002, "pubB", 300, 3),
            record(30, 1003, "pubC", 999, 9),
        ],
        "fixture",
    )
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_operational_endpoints() {
    let (status, body) = get(app(None), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, _) = get(app(None), "/live").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = get(app(None), "/ready").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_analytics_endpoint() {
    let (status, body) = get(app(Some(fixture())), "/api/analytics/publisher?days=7").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 200);
    assert_eq!(body["data"]["summary"]["clicks"], 400);
    assert_eq!(body["data"]["aggregated"][0]["dimension_key"], "pubB");
    assert_eq!(body["data"]["offer_ids"], serde_json::json!([1001, 1002]));
    assert_eq!(body["meta"]["total_rows"], 2);
    assert_eq!(body["meta"]["source"], "fixture");

    let (_, body) = get(app(Some(fixture())), "/api/analytics/publisher?days=7&offer_id=1001").await;
    assert_eq!(body["data"]["summary"]["clicks"], 100);
}

#[tokio::test]
async fn test_analytics_errors() {
    let (status, body) = get(app(Some(fixture())), "/api/analytics/country").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);

    let (status, body) = get(app(None), "/api/analytics/publisher").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], 500);
}

#[tokio::test]
async fn test_raw_data_endpoint() {
    let (status, body) = get(app(Some(fixture())), "/api/data?days=7&limit=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert!(body["data"][0]["dt"].is_string());
}

#[tokio::test]
async fn test_rollup_falls_back_offline() {
    let (status, body) = get(app(None), "/v1/rollup/adType?days=3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["provenance"], "mock");
    assert_eq!(body["dimension"], "adType");
    assert_eq!(body["offerIds"][0], "ALL");

    let (status, body) = get(app(None), "/v1/rollup/country").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn test_dashboard_cycle() {
    let app = app(None);
    let request = Request::builder()
        .method("POST")
        .uri("/v1/dashboard")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"dimension":"brand","days":7}"#))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let accepted: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(accepted["generation"], 1);

    let mut body = Value::Null;
    for _ in 0..50 {
        let (_, state) = get(app.clone(), "/v1/dashboard").await;
        if state["phase"]["phase"] == "ready" {
            body = state;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(body["generation"], 1);
    assert_eq!(body["report"]["provenance"], "mock");
    assert_eq!(body["report"]["dimension"], "brand");
}

#[tokio::test]
async fn test_openapi_document_served() {
    let (status, body) = get(app(None), "/api-docs/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/analytics/{dimension}"].is_object());
}

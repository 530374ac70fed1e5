//! Aggregation-service compatible endpoints, served from the local dataset.
//!
//! Failures use the same envelope as successes: `{code, message}` with the
//! HTTP status mirrored in `code`.

use crate::dataset::Dataset;
use crate::query::{wire_dimension, DataQuery, RangeQuery};
use crate::rest::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use funnel_core::wire::{AnalyticsEnvelope, RawDataEnvelope};
use std::sync::Arc;
use tracing::{error, warn};

type EnvelopeError = (StatusCode, Json<AnalyticsEnvelope>);

/// Default trailing window of the served endpoints.
const SERVED_DEFAULT_DAYS: i64 = 7;

fn failure(status: StatusCode, message: impl Into<String>) -> EnvelopeError {
    (
        status,
        Json(AnalyticsEnvelope::failure(i64::from(status.as_u16()), message)),
    )
}

fn loaded(state: &AppState) -> Result<&Arc<Dataset>, EnvelopeError> {
    state.dataset.as_ref().ok_or_else(|| {
        error!("Analytics request with no dataset loaded");
        failure(StatusCode::INTERNAL_SERVER_ERROR, "Dataset not loaded")
    })
}

/// Builds the `/api/analytics/{dimension}` response body.
pub fn analytics_response(
    dataset: Option<&Dataset>,
    dimension: &str,
    query: &RangeQuery,
    default_limit: usize,
    today: NaiveDate,
) -> Result<AnalyticsEnvelope, EnvelopeError> {
    let dimension = wire_dimension(dimension).map_err(|e| {
        warn!(error = %e, "Rejected analytics request");
        metrics::counter!("api.validation_errors").increment(1);
        failure(StatusCode::BAD_REQUEST, e.to_string())
    })?;
    let dataset = dataset.ok_or_else(|| {
        failure(StatusCode::INTERNAL_SERVER_ERROR, "Dataset not loaded")
    })?;
    let range = query
        .range(SERVED_DEFAULT_DAYS, today)
        .map_err(|e| failure(StatusCode::BAD_REQUEST, e.to_string()))?;

    dataset
        .analytics(dimension, &range, &query.offer(), query.limit_or(default_limit))
        .map_err(|e| {
            error!(error = %e, "Analytics query failed");
            failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })
}

/// GET /api/analytics/:dimension: Dimension rollup in upstream format.
#[utoipa::path(
    get,
    path = "/api/analytics/{dimension}",
    tag = "Analytics",
    params(
        ("dimension" = String, Path, description = "publisher, bundle, brand, model, ad_type or bid_floor"),
        RangeQuery,
    ),
    responses(
        (status = 200, description = "Aggregated analytics", body = AnalyticsEnvelope),
        (status = 400, description = "Unsupported dimension", body = AnalyticsEnvelope),
        (status = 500, description = "No dataset loaded", body = AnalyticsEnvelope),
    )
)]
pub async fn handle_analytics(
    State(state): State<AppState>,
    Path(dimension): Path<String>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<AnalyticsEnvelope>, EnvelopeError> {
    metrics::counter!("api.requests", "route" => "analytics").increment(1);
    analytics_response(
        state.dataset.as_deref(),
        &dimension,
        &query,
        state.default_limit,
        Utc::now().date_naive(),
    )
    .map(Json)
}

/// GET /api/data: Raw records of the trailing window.
#[utoipa::path(
    get,
    path = "/api/data",
    tag = "Analytics",
    params(DataQuery),
    responses(
        (status = 200, description = "Raw event records", body = RawDataEnvelope),
        (status = 500, description = "No dataset loaded", body = AnalyticsEnvelope),
    )
)]
pub async fn handle_data(
    State(state): State<AppState>,
    Query(query): Query<DataQuery>,
) -> Result<Json<RawDataEnvelope>, EnvelopeError> {
    metrics::counter!("api.requests", "route" => "data").increment(1);
    let dataset = loaded(&state)?;
    Ok(Json(dataset.recent(
        query.days_or(SERVED_DEFAULT_DAYS),
        query.limit_or(state.raw_limit),
        Utc::now().date_naive(),
    )))
}

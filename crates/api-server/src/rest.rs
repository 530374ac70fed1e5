//! REST handlers for rollup consumers and operational endpoints.

use crate::dataset::Dataset;
use crate::query::{any_dimension, QueryError, RangeQuery};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use funnel_core::types::{RollupParams, RollupReport};
use funnel_reporting::{CyclePhase, RollupOrchestrator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;
use utoipa::ToSchema;

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<RollupOrchestrator>,
    pub dataset: Option<Arc<Dataset>>,
    pub dataset_configured: bool,
    pub node_id: String,
    pub default_days: i64,
    pub default_limit: usize,
    pub raw_limit: usize,
    pub start_time: Instant,
}

impl AppState {
    fn rollup_params(
        &self,
        dimension: &str,
        query: &RangeQuery,
    ) -> Result<RollupParams, QueryError> {
        Ok(RollupParams {
            dimension: any_dimension(dimension)?,
            offer: query.offer(),
            range: query.range(self.default_days, Utc::now().date_naive())?,
        })
    }
}

fn reject(route: &'static str, e: QueryError) -> (StatusCode, Json<ErrorResponse>) {
    warn!(route, error = %e, "Request validation failed");
    metrics::counter!("api.validation_errors").increment(1);
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: "invalid_request".to_string(),
            message: e.to_string(),
        }),
    )
}

/// GET /v1/rollup/:dimension: One-off rollup, remote first with fallback.
#[utoipa::path(
    get,
    path = "/v1/rollup/{dimension}",
    tag = "Rollup",
    params(
        ("dimension" = String, Path, description = "publisher, bundle, brand, model, adType or bidFloor"),
        RangeQuery,
    ),
    responses(
        (status = 200, description = "Rollup report", body = RollupReport),
        (status = 400, description = "Invalid dimension or date", body = ErrorResponse),
    )
)]
pub async fn handle_rollup(
    State(state): State<AppState>,
    Path(dimension): Path<String>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<RollupReport>, (StatusCode, Json<ErrorResponse>)> {
    metrics::counter!("api.requests", "route" => "rollup").increment(1);
    let params = state
        .rollup_params(&dimension, &query)
        .map_err(|e| reject("rollup", e))?;
    Ok(Json(state.orchestrator.evaluate(&params).await))
}

/// Dashboard parameter change.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DashboardRequest {
    pub dimension: String,
    #[serde(default)]
    pub offer_id: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub days: Option<i64>,
}

impl DashboardRequest {
    fn range_query(&self) -> RangeQuery {
        RangeQuery {
            start: self.start.clone(),
            end: self.end.clone(),
            days: self.days.map(|d| d.to_string()),
            offer_id: self.offer_id.clone(),
            limit: None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardAccepted {
    pub generation: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardResponse {
    #[schema(value_type = Object)]
    pub phase: CyclePhase,
    pub generation: u64,
    pub report: Option<RollupReport>,
}

/// POST /v1/dashboard: Start a cycle for new parameters; supersedes any
/// cycle still running.
#[utoipa::path(
    post,
    path = "/v1/dashboard",
    tag = "Rollup",
    request_body = DashboardRequest,
    responses(
        (status = 202, description = "Cycle started", body = DashboardAccepted),
        (status = 400, description = "Invalid dimension or date", body = ErrorResponse),
    )
)]
pub async fn handle_dashboard_update(
    State(state): State<AppState>,
    Json(request): Json<DashboardRequest>,
) -> Result<(StatusCode, Json<DashboardAccepted>), (StatusCode, Json<ErrorResponse>)> {
    metrics::counter!("api.requests", "route" => "dashboard_update").increment(1);
    let params = state
        .rollup_params(&request.dimension, &request.range_query())
        .map_err(|e| reject("dashboard_update", e))?;

    let (generation, _) = state.orchestrator.spawn_cycle(params);
    Ok((
        StatusCode::ACCEPTED,
        Json(DashboardAccepted {
            generation: generation.value(),
        }),
    ))
}

/// GET /v1/dashboard: Current phase and last committed report.
#[utoipa::path(
    get,
    path = "/v1/dashboard",
    tag = "Rollup",
    responses(
        (status = 200, description = "Dashboard state", body = DashboardResponse),
    )
)]
pub async fn handle_dashboard(State(state): State<AppState>) -> Json<DashboardResponse> {
    metrics::counter!("api.requests", "route" => "dashboard").increment(1);
    let orchestrator = &state.orchestrator;
    Json(DashboardResponse {
        phase: orchestrator.phase(),
        generation: orchestrator.latest_generation().value(),
        report: orchestrator.latest_report().map(|r| (*r).clone()),
    })
}

/// GET /health: Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Operations",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "funnel-rollup".to_string(),
        node_id: state.node_id.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /ready: Readiness probe.
/// Unready only when a dataset was configured but could not be loaded.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Operations",
    responses(
        (status = 200, description = "Ready"),
        (status = 503, description = "Configured dataset missing"),
    )
)]
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.dataset_configured && state.dataset.is_none() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    }
}

/// GET /live: Liveness probe.
#[utoipa::path(
    get,
    path = "/live",
    tag = "Operations",
    responses((status = 200, description = "Alive"))
)]
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub node_id: String,
    pub uptime_secs: u64,
}

//! OpenAPI specification and Swagger UI configuration.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Funnel Rollup API",
        version = "0.1.0",
        description = "Dimension-grouped conversion funnel analytics.\n\nServes rollup reports computed remote-first with a synthetic fallback, plus aggregation-service compatible endpoints over a local dataset.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Rollup", description = "Rollup reports and dashboard cycles"),
        (name = "Analytics", description = "Aggregation-service compatible endpoints"),
        (name = "Operations", description = "Health, readiness, and liveness probes"),
    ),
    paths(
        // Rollup
        crate::rest::handle_rollup,
        crate::rest::handle_dashboard_update,
        crate::rest::handle_dashboard,
        // Analytics
        crate::analytics_rest::handle_analytics,
        crate::analytics_rest::handle_data,
        // Operations
        crate::rest::health_check,
        crate::rest::readiness,
        crate::rest::liveness,
    ),
    components(schemas(
        // Report types
        funnel_core::types::RollupReport,
        funnel_core::types::Dimension,
        funnel_core::types::DateRange,
        funnel_core::types::Summary,
        funnel_core::types::AggregatedRow,
        funnel_core::types::Provenance,
        funnel_core::types::RawEventRecord,
        // Wire types
        funnel_core::wire::AnalyticsEnvelope,
        funnel_core::wire::AnalyticsPayload,
        funnel_core::wire::ResponseMeta,
        funnel_core::wire::RawDataEnvelope,
        // REST types
        crate::rest::DashboardRequest,
        crate::rest::DashboardAccepted,
        crate::rest::DashboardResponse,
        crate::rest::ErrorResponse,
        crate::rest::HealthResponse,
    ))
)]
pub struct ApiDoc;

//! HTTP client for the aggregation service's `/api/analytics/{dimension}`.

use crate::source::{with_deadline, AnalyticsSource};
use async_trait::async_trait;
use funnel_core::config::SourceConfig;
use funnel_core::types::{OfferSelector, RollupParams};
use funnel_core::wire::{parse_envelope, AnalyticsPayload};
use funnel_core::SourceError;
use std::time::Duration;
use tracing::{debug, info};

/// Aggregation service reached over HTTP with a bounded deadline per fetch.
pub struct HttpAnalyticsSource {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpAnalyticsSource {
    pub fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .user_agent(format!("funnel-rollup/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        info!(
            base_url = %config.base_url,
            timeout_ms = config.timeout_ms,
            "Analytics source configured"
        );

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout(),
        })
    }

    async fn request(&self, params: &RollupParams) -> Result<AnalyticsPayload, SourceError> {
        let url = analytics_url(&self.base_url, params);
        debug!(url = %url, offer = %params.offer, "Fetching aggregated analytics");

        let response = self
            .http
            .get(&url)
            .query(&query_pairs(params))
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Http {
                status: status.as_u16(),
            });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SourceError::Schema(e.to_string()))?;
        parse_envelope(body)
    }

    fn map_transport(&self, e: reqwest::Error) -> SourceError {
        if e.is_timeout() {
            SourceError::Timeout(self.timeout)
        } else {
            SourceError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl AnalyticsSource for HttpAnalyticsSource {
    fn name(&self) -> &str {
        &self.base_url
    }

    async fn fetch(&self, params: &RollupParams) -> Result<AnalyticsPayload, SourceError> {
        with_deadline(self.timeout, self.request(params)).await
    }
}

/// Endpoint for `params.dimension` under `base_url`.
pub fn analytics_url(base_url: &str, params: &RollupParams) -> String {
    format!(
        "{}/api/analytics/{}",
        base_url.trim_end_matches('/'),
        params.dimension.wire_name()
    )
}

/// Query string: the inclusive range, plus `offer_id` unless every offer
/// is selected.
pub fn query_pairs(params: &RollupParams) -> Vec<(&'static str, String)> {
    let mut pairs = vec![
        ("start", params.range.start.to_string()),
        ("end", params.range.end.to_string()),
    ];
    if let OfferSelector::Offer(id) = &params.offer {
        pairs.push(("offer_id", id.clone()));
    }
    pairs
}

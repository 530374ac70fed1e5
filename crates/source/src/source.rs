use async_trait::async_trait;
use funnel_core::types::RollupParams;
use funnel_core::wire::AnalyticsPayload;
use funnel_core::SourceError;
use std::future::Future;
use std::time::Duration;

/// An authoritative, pre-aggregating data source.
#[async_trait]
pub trait AnalyticsSource: Send + Sync {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// Fetches one aggregated payload for `params`.
    async fn fetch(&self, params: &RollupParams) -> Result<AnalyticsPayload, SourceError>;
}

/// Source that is never reachable. Forces every cycle onto the synthetic
/// fallback, used for offline runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableSource;

#[async_trait]
impl AnalyticsSource for UnavailableSource {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn fetch(&self, _params: &RollupParams) -> Result<AnalyticsPayload, SourceError> {
        Err(SourceError::Transport("source disabled".to_string()))
    }
}

/// Runs `fut` with a hard deadline, mapping expiry to [`SourceError::Timeout`].
pub async fn with_deadline<F, T>(deadline: Duration, fut: F) -> Result<T, SourceError>
where
    F: Future<Output = Result<T, SourceError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(SourceError::Timeout(deadline)),
    }
}

use std::time::Duration;
use thiserror::Error;

pub type FunnelResult<T> = Result<T, FunnelError>;

#[derive(Error, Debug)]
pub enum FunnelError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Analytics source error: {0}")]
    Source(#[from] SourceError),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Failure of a single fetch against the external aggregation service.
///
/// Every variant means the same thing to the orchestrator: the source is
/// unavailable for this cycle and the local fallback takes over.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("request exceeded {0:?} deadline")]
    Timeout(Duration),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("upstream returned HTTP {status}")]
    Http { status: u16 },

    #[error("invalid payload: {0}")]
    Schema(String),
}

impl SourceError {
    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::Timeout(_) => "timeout",
            SourceError::Transport(_) => "transport",
            SourceError::Http { .. } => "http",
            SourceError::Schema(_) => "schema",
        }
    }
}

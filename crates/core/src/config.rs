use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `FUNNEL_ROLLUP__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub synthetic: SyntheticConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

/// External aggregation service the orchestrator queries first.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_source_url")]
    pub base_url: String,
    #[serde(default = "default_source_timeout_ms")]
    pub timeout_ms: u64,
    /// Trailing window used when a request carries no explicit range.
    #[serde(default = "default_window_days")]
    pub default_days: i64,
}

/// Shape of the fallback panel produced when the source is unavailable.
#[derive(Debug, Clone, Deserialize)]
pub struct SyntheticConfig {
    #[serde(default = "default_window_days")]
    pub days: i64,
    #[serde(default = "default_records_per_day")]
    pub records_per_day: usize,
    /// Fixed seed for reproducible panels. Entropy-seeded when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Local record dataset backing the upstream-compatible endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default = "default_aggregate_limit")]
    pub default_limit: usize,
    #[serde(default = "default_raw_limit")]
    pub raw_limit: usize,
}

// Default functions
fn default_node_id() -> String {
    "node-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_source_url() -> String {
    "http://localhost:5000".to_string()
}
fn default_source_timeout_ms() -> u64 {
    20_000
}
fn default_window_days() -> i64 {
    7
}
fn default_records_per_day() -> usize {
    100
}
fn default_aggregate_limit() -> usize {
    500
}
fn default_raw_limit() -> usize {
    5000
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_source_url(),
            timeout_ms: default_source_timeout_ms(),
            default_days: default_window_days(),
        }
    }
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            days: default_window_days(),
            records_per_day: default_records_per_day(),
            seed: None,
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: None,
            default_limit: default_aggregate_limit(),
            raw_limit: default_raw_limit(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            source: SourceConfig::default(),
            synthetic: SyntheticConfig::default(),
            dataset: DatasetConfig::default(),
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("FUNNEL_ROLLUP")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        tracing::debug!(
            source = %config.source.base_url,
            timeout_ms = config.source.timeout_ms,
            "Configuration resolved"
        );
        Ok(config)
    }
}

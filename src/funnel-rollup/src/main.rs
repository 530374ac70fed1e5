//! Funnel Rollup: dimension-grouped conversion funnel analytics.
//!
//! `serve` runs the HTTP API; `report` computes one rollup and prints it.

use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use funnel_api::{ApiServer, Dataset};
use funnel_core::config::AppConfig;
use funnel_core::types::{DateRange, Dimension, OfferSelector, RollupParams, RollupReport};
use funnel_reporting::RollupOrchestrator;
use funnel_source::{AnalyticsSource, HttpAnalyticsSource, UnavailableSource};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Targets match by prefix, so `funnel` covers every workspace crate.
const DEFAULT_LOG_FILTER: &str = "funnel=info,tower_http=info";

#[derive(Parser, Debug)]
#[command(name = "funnel-rollup")]
#[command(about = "Dimension-grouped conversion funnel analytics")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "FUNNEL_ROLLUP__NODE_ID")]
    node_id: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "FUNNEL_ROLLUP__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Aggregation service base URL (overrides config)
    #[arg(long, env = "FUNNEL_ROLLUP__SOURCE__BASE_URL")]
    source_url: Option<String>,

    /// Local dataset for the upstream-compatible endpoints (overrides config)
    #[arg(long, env = "FUNNEL_ROLLUP__DATASET__PATH")]
    dataset: Option<String>,

    /// Seed for the synthetic fallback (overrides config)
    #[arg(long, env = "FUNNEL_ROLLUP__SYNTHETIC__SEED")]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Compute one rollup and print it
    Report(ReportArgs),
}

#[derive(Args, Debug)]
struct ReportArgs {
    /// publisher, bundle, brand, model, adType or bidFloor (snake_case accepted)
    #[arg(long, default_value = "publisher")]
    dimension: Dimension,

    /// Offer id, or ALL
    #[arg(long, default_value = "ALL")]
    offer: String,

    /// First day (YYYY-MM-DD); requires --end
    #[arg(long, requires = "end")]
    start: Option<NaiveDate>,

    /// Last day, inclusive (YYYY-MM-DD); requires --start
    #[arg(long, requires = "start")]
    end: Option<NaiveDate>,

    /// Trailing window in days when no explicit range is given
    #[arg(long)]
    days: Option<i64>,

    /// Skip the aggregation service and use synthetic data
    #[arg(long, default_value_t = false)]
    offline: bool,

    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    Json,
    Table,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(url) = cli.source_url {
        config.source.base_url = url;
    }
    if let Some(path) = cli.dataset {
        config.dataset.path = Some(path);
    }
    if cli.seed.is_some() {
        config.synthetic.seed = cli.seed;
    }

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        source = %config.source.base_url,
        "Configuration loaded"
    );

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Report(args) => report(config, args).await,
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let source: Arc<dyn AnalyticsSource> = Arc::new(HttpAnalyticsSource::new(&config.source)?);
    let orchestrator = Arc::new(RollupOrchestrator::new(source, config.synthetic.clone()));

    let dataset = match config.dataset.path.as_deref() {
        Some(path) => match Dataset::load(Path::new(path)) {
            Ok(dataset) => Some(Arc::new(dataset)),
            Err(e) => {
                error!(path, error = %e, "Failed to load dataset, analytics endpoints disabled");
                None
            }
        },
        None => {
            info!("No dataset configured, analytics endpoints disabled");
            None
        }
    };

    let api_server = ApiServer::new(config, orchestrator, dataset);

    // Start metrics exporter
    if let Err(e) = api_server.start_metrics() {
        error!(error = %e, "Failed to start metrics exporter");
    }

    info!("Funnel Rollup is ready to serve traffic");

    // Start HTTP server (blocks until shutdown)
    api_server.start_http().await
}

async fn report(config: AppConfig, args: ReportArgs) -> anyhow::Result<()> {
    let source: Arc<dyn AnalyticsSource> = if args.offline {
        Arc::new(UnavailableSource)
    } else {
        Arc::new(HttpAnalyticsSource::new(&config.source)?)
    };
    let orchestrator = RollupOrchestrator::new(source, config.synthetic.clone());

    let range = match (args.start, args.end) {
        (Some(start), Some(end)) => DateRange::new(start, end),
        _ => DateRange::last_days(
            args.days.unwrap_or(config.source.default_days),
            Utc::now().date_naive(),
        ),
    };
    let params = RollupParams {
        dimension: args.dimension,
        offer: OfferSelector::from(args.offer),
        range,
    };

    let report = orchestrator
        .run_cycle(params)
        .await
        .ok_or_else(|| anyhow::anyhow!("rollup cycle was superseded"))?;

    match args.format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&*report)?),
        Format::Table => print_table(&report),
    }
    Ok(())
}

fn print_table(report: &RollupReport) {
    println!(
        "{} | {} .. {} | offer {} | {}",
        report.dimension,
        report.date_range.start,
        report.date_range.end,
        report.offer,
        report.provenance.as_str()
    );
    println!(
        "{:<24} {:>10} {:>9} {:>9} {:>12} {:>9} {:>7}",
        "key", "clicks", "installs", "events", "revenues", "cvr", "evr"
    );
    for row in &report.aggregated {
        println!(
            "{:<24} {:>10} {:>9} {:>9} {:>12.2} {:>9.2} {:>7.2}",
            row.dimension_key, row.clicks, row.installs, row.events, row.revenues, row.cvr, row.evr
        );
    }
    let s = &report.summary;
    println!(
        "{:<24} {:>10} {:>9} {:>9} {:>12.2} {:>9.2} {:>7.2}",
        "TOTAL", s.clicks, s.installs, s.events, s.revenues, s.cvr, s.evr
    );
    println!("offers: {}", report.offer_ids.as_slice().join(", "));
}

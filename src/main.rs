use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use volley::{
    BoundedDispatcher, Dispatcher, Reporter,
    config::LoadConfig,
    http::{HttpSender, StatusPolicy},
    report::{JsonReporter, StdoutReporter, SummaryReport},
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Output {
    Text,
    Json,
}

/// Fire a fixed number of HTTP requests at an endpoint with bounded concurrency.
#[derive(Debug, Parser)]
#[command(name = "volley", version, about)]
struct Args {
    /// Target URL
    endpoint: Option<String>,
    /// Total number of requests [default: 100]
    #[arg(short = 'n', long)]
    requests: Option<usize>,
    /// Maximum number of requests in flight [default: 100]
    #[arg(short, long)]
    concurrency: Option<usize>,
    /// Inline request body
    #[arg(short, long, conflicts_with = "data_file")]
    data: Option<String>,
    /// Read the request body from a file
    #[arg(short = 'D', long)]
    data_file: Option<PathBuf>,
    /// HTTP method [default: POST]
    #[arg(short = 'X', long)]
    method: Option<String>,
    /// Extra header as NAME:VALUE, may be repeated
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,
    /// Per-request timeout in milliseconds
    #[arg(short, long = "timeout", value_name = "MS")]
    timeout_ms: Option<u64>,
    /// Which response statuses count as failures [default: accept]
    #[arg(long, value_enum)]
    status_policy: Option<StatusPolicy>,
    /// Summary format
    #[arg(short, long, value_enum, default_value_t = Output::Text)]
    output: Output,
    /// Log every completed request
    #[arg(short, long)]
    verbose: bool,
    /// TOML file with run settings; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> LoadConfig {
        LoadConfig {
            endpoint: self.endpoint.clone(),
            requests: self.requests,
            concurrency: self.concurrency,
            data: self.data.clone(),
            data_file: self.data_file.clone(),
            method: self.method.clone(),
            headers: self.headers.clone(),
            timeout_ms: self.timeout_ms,
            status_policy: self.status_policy,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "volley=debug" } else { "volley=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let base = match &args.config {
        Some(path) => LoadConfig::from_file(path)?,
        None => LoadConfig::default(),
    };
    let settings = base
        .merge(args.overrides())
        .resolve()
        .context("Invalid configuration")?;
    let sender = HttpSender::new(settings.http)?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, no further requests will be sent.");
            interrupt.cancel();
        }
    });

    info!(
        "Starting volley: {} requests, concurrency {}",
        settings.plan.total(),
        settings.plan.concurrency()
    );
    let summary = BoundedDispatcher::builder()
        .plan(settings.plan)
        .cancel(cancel)
        .build()
        .dispatch(settings.job, sender)
        .await;

    let report = SummaryReport::from(summary);
    match args.output {
        Output::Text => StdoutReporter.report(&report).await?,
        Output::Json => JsonReporter.report(&report).await?,
    }
    Ok(())
}

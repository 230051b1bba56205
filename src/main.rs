//! CLI entry point for the transit trace pipeline.
//!
//! One subcommand per stage: collect vehicle positions, partition them by
//! day and vehicle, build line segments, merge them per day and finalize
//! the merged dataset. `process` runs the offline stages for one date.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use transit_trace::{
    collector::{self, CollectorConfig, DEFAULT_BASE_URL, TransLocSource},
    fetch::{
        BasicClient,
        auth::{ApiKey, MASHAPE_KEY_HEADER},
    },
    finalize::{DEFAULT_MAX_MPH, finalize},
    layout::DataLayout,
    merge::merge,
    partition::partition,
    pipeline::process_date,
    segments::build_for_date,
};

#[derive(Parser)]
#[command(name = "transit_trace")]
#[command(about = "Collect transit vehicle positions and turn them into speed segments", long_about = None)]
struct Cli {
    /// Root of the data directory tree (defaults to $DATA_DIR or "data")
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the TransLoc API and append vehicle positions to raw/{date}.csv
    Collect {
        /// Agency ids to request, comma separated
        #[arg(short, long, value_delimiter = ',', default_value = "12")]
        agencies: Vec<String>,

        /// Seconds between polls
        #[arg(short, long, default_value_t = 30)]
        interval: u64,

        /// Number of poll cycles before stopping
        #[arg(short = 'n', long, default_value_t = 86_400)]
        cycles: u64,

        /// API base URL
        #[arg(long, default_value = DEFAULT_BASE_URL)]
        base_url: String,

        /// Header carrying the API key read from $TRANSLOC_API_KEY
        #[arg(long, default_value = MASHAPE_KEY_HEADER)]
        api_key_header: String,
    },
    /// Split a raw flat file by date and by date+vehicle
    Partition {
        /// Raw file to split (defaults to raw/{date}.csv)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Date of the raw file (YYYY-MM-DD)
        #[arg(value_parser = parse_date)]
        date: String,
    },
    /// Build per-vehicle line segments for a date
    Segments {
        #[arg(value_parser = parse_date)]
        date: String,
    },
    /// Merge all per-vehicle segment datasets of a date
    Merge {
        #[arg(value_parser = parse_date)]
        date: String,
    },
    /// Compute mph and drop implausible segments of a merged date
    Finalize {
        #[arg(value_parser = parse_date)]
        date: String,

        /// Plausibility ceiling in miles per hour
        #[arg(long, default_value_t = DEFAULT_MAX_MPH)]
        max_mph: f64,
    },
    /// Partition, build, merge and finalize one date
    Process {
        #[arg(value_parser = parse_date)]
        date: String,

        /// Raw file to split (defaults to raw/{date}.csv)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Plausibility ceiling in miles per hour
        #[arg(long, default_value_t = DEFAULT_MAX_MPH)]
        max_mph: f64,
    },
}

fn parse_date(s: &str) -> Result<String, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/transit_trace.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("transit_trace.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive(LevelFilter::INFO.into()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive(LevelFilter::DEBUG.into()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let data_dir = cli
        .data_dir
        .or_else(|| std::env::var_os("DATA_DIR").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("data"));
    let layout = DataLayout::new(data_dir);
    layout
        .ensure_all()
        .with_context(|| format!("creating data directories under {}", layout.root().display()))?;

    match cli.command {
        Commands::Collect {
            agencies,
            interval,
            cycles,
            base_url,
            api_key_header,
        } => {
            let api_key = std::env::var("TRANSLOC_API_KEY")
                .context("TRANSLOC_API_KEY must be set to collect")?;
            let client = ApiKey::new(BasicClient::new(), &api_key_header, &api_key)?;
            let source = TransLocSource::new(client, &base_url, agencies)?;

            let date = Utc::now().format("%Y-%m-%d").to_string();
            let output = layout.raw_file(&date);
            let config = CollectorConfig {
                interval: Duration::from_secs(interval),
                cycles,
                ..Default::default()
            };

            collector::run(&source, &config, &output).await?;
        }
        Commands::Partition { input, date } => {
            let input = input.unwrap_or_else(|| layout.raw_file(&date));
            partition(&layout, &input).context("partition stage failed")?;
        }
        Commands::Segments { date } => {
            build_for_date(&layout, &date).context("segment stage failed")?;
        }
        Commands::Merge { date } => {
            merge(&layout, &date).context("merge stage failed")?;
        }
        Commands::Finalize { date, max_mph } => {
            finalize(&layout, &date, max_mph).context("finalize stage failed")?;
        }
        Commands::Process {
            date,
            input,
            max_mph,
        } => {
            let input = input.unwrap_or_else(|| layout.raw_file(&date));
            let report = process_date(&layout, &input, &date, max_mph)?;
            info!(
                rows = report.partition.rows,
                vehicles = report.segments.datasets.len(),
                segments = report.finalize.kept,
                output = %report.finalize.output.display(),
                "Done"
            );
        }
    }

    Ok(())
}

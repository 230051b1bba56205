//! Fixed-cadence polling of the TransLoc vehicles endpoint.
//!
//! Each due cycle issues one request and appends one row per vehicle to the
//! day's flat file. A failed cycle appends a sentinel row and the loop moves
//! on; nothing is retried before the next scheduled cycle.

mod cadence;

pub use cadence::{Cadence, Tick};

use anyhow::{Context, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Url;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::error::{FetchError, PollError};
use crate::fetch::{HttpClient, fetch_vehicles};
use crate::output::{append_samples, append_sentinel, ensure_header};
use crate::parser::VehiclesResponse;
use crate::sample::Sample;

pub const DEFAULT_BASE_URL: &str = "https://transloc-api-1-2.p.mashape.com";

/// Abstraction over the vehicle position provider.
#[async_trait]
pub trait VehicleSource: Send + Sync {
    /// Agencies whose vehicles are recorded.
    fn agencies(&self) -> &[String];

    /// Performs one poll.
    async fn poll(&self) -> Result<VehiclesResponse, FetchError>;
}

/// [`VehicleSource`] backed by the TransLoc HTTP API.
pub struct TransLocSource<C> {
    client: C,
    base_url: Url,
    agencies: Vec<String>,
}

impl<C: HttpClient> TransLocSource<C> {
    /// Fails if `base_url` is not an absolute URL that can carry a path.
    pub fn new(client: C, base_url: &str, agencies: Vec<String>) -> anyhow::Result<Self> {
        let base_url: Url = base_url
            .parse()
            .with_context(|| format!("invalid base URL '{base_url}'"))?;
        if base_url.cannot_be_a_base() {
            bail!("base URL '{base_url}' cannot carry a path");
        }
        Ok(Self {
            client,
            base_url,
            agencies,
        })
    }
}

#[async_trait]
impl<C: HttpClient> VehicleSource for TransLocSource<C> {
    fn agencies(&self) -> &[String] {
        &self.agencies
    }

    async fn poll(&self) -> Result<VehiclesResponse, FetchError> {
        fetch_vehicles(&self.client, &self.base_url, &self.agencies).await
    }
}

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Time between cycle boundaries.
    pub interval: Duration,
    /// Number of cycle boundaries before the collector stops.
    pub cycles: u64,
    /// Granularity of the elapsed-time check.
    pub poll_tick: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            cycles: 86_400,
            poll_tick: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectReport {
    pub polls: u64,
    pub rows: u64,
    pub failures: u64,
    pub skipped_cycles: u64,
}

/// Converts one response into flat-file rows for the configured agencies.
pub fn samples_from_response(resp: &VehiclesResponse, agencies: &[String]) -> Vec<Sample> {
    let mut samples = Vec::new();
    for agency in agencies {
        if !resp.has_agency(agency) {
            info!(agency = %agency, generated_on = %resp.generated_on, "Agency absent from response");
            continue;
        }
        samples.extend(
            resp.vehicles(agency)
                .iter()
                .map(|v| Sample::from_vehicle(&resp.generated_on, v)),
        );
    }
    samples
}

/// Polls once and appends the outcome to `output`.
///
/// Returns the number of vehicle rows written. On failure a sentinel row is
/// attempted before the error is returned.
pub async fn poll_once<S: VehicleSource + ?Sized>(
    source: &S,
    output: &Path,
    cycle: u64,
) -> Result<usize, PollError> {
    match source.poll().await {
        Ok(resp) => {
            let samples = samples_from_response(&resp, source.agencies());
            if let Err(e) = append_samples(output, &samples) {
                let at = Utc::now();
                error!(cycle, at = %at.to_rfc3339(), kind = "write", error = %e, "Failed to append samples");
                record_sentinel(output, at, cycle);
                return Err(PollError::Write {
                    path: output.to_path_buf(),
                    reason: format!("{e:#}"),
                });
            }
            Ok(samples.len())
        }
        Err(e) => {
            let at = Utc::now();
            error!(cycle, at = %at.to_rfc3339(), kind = e.kind(), error = %e, "Poll failed");
            record_sentinel(output, at, cycle);
            Err(e.into())
        }
    }
}

fn record_sentinel(output: &Path, at: DateTime<Utc>, cycle: u64) {
    if let Err(e) = append_sentinel(output, at) {
        error!(cycle, error = %e, "Failed to append sentinel row");
    }
}

/// Runs the collector until the cycle budget is spent.
#[tracing::instrument(skip(source, config), fields(output = %output.display(), cycles = config.cycles))]
pub async fn run<S: VehicleSource + ?Sized>(
    source: &S,
    config: &CollectorConfig,
    output: &Path,
) -> anyhow::Result<CollectReport> {
    ensure_header(output)?;

    let mut report = CollectReport::default();
    let mut cadence = Cadence::new(config.interval, config.cycles);
    let start = Instant::now();

    info!(
        interval_secs = config.interval.as_secs(),
        agencies = ?source.agencies(),
        "Starting collection"
    );

    loop {
        match cadence.check(start.elapsed()) {
            Tick::Done => break,
            Tick::Wait => {
                let remaining = cadence.next_boundary().saturating_sub(start.elapsed());
                tokio::time::sleep(remaining.min(config.poll_tick)).await;
            }
            Tick::Poll { cycle, skipped } => {
                if skipped > 0 {
                    warn!(cycle, skipped, "Missed cycle boundaries were skipped");
                    report.skipped_cycles += skipped;
                }
                report.polls += 1;
                match poll_once(source, output, cycle).await {
                    Ok(rows) => {
                        report.rows += rows as u64;
                        debug!(cycle, rows, "Cycle recorded");
                    }
                    Err(_) => report.failures += 1,
                }
            }
        }
    }

    info!(
        polls = report.polls,
        rows = report.rows,
        failures = report.failures,
        skipped_cycles = report.skipped_cycles,
        "Data acquisition complete"
    );
    Ok(report)
}

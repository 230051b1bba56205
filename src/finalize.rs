//! Derives speed for the merged dataset and drops implausible segments.

use std::path::PathBuf;
use tracing::info;

use crate::dataset::{Dataset, read_dataset, write_dataset};
use crate::error::{PipelineError, Result};
use crate::layout::{DataLayout, ensure_dir};

pub const DEFAULT_MAX_MPH: f64 = 100.0;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct FinalizeReport {
    pub input: usize,
    pub kept: usize,
    pub dropped_outliers: usize,
    pub output: PathBuf,
}

/// Miles per hour over a segment.
pub fn mph(length_mi: f64, timedelta: f64) -> f64 {
    length_mi / timedelta * 3600.0
}

/// Sets `mph` on every segment and keeps those at or below `max_mph`.
///
/// A non-finite speed (zero elapsed time) never passes the ceiling.
pub fn apply_speed_ceiling(dataset: Dataset, max_mph: f64) -> (Dataset, usize) {
    let input = dataset.len();
    let segments: Vec<_> = dataset
        .segments
        .into_iter()
        .filter_map(|mut segment| {
            let speed = mph(segment.attributes.length_mi, segment.attributes.timedelta);
            segment.attributes.mph = Some(speed);
            (speed.is_finite() && speed <= max_mph).then_some(segment)
        })
        .collect();
    let dropped = input - segments.len();
    (Dataset::new(dataset.name, segments), dropped)
}

/// Reads `merged/{date}_merge.geojson` and writes `final/{date}_final.geojson`.
#[tracing::instrument(skip(layout))]
pub fn finalize(layout: &DataLayout, date: &str, max_mph: f64) -> Result<FinalizeReport> {
    let input = layout.merged_file(date);
    if !input.is_file() {
        return Err(PipelineError::MissingInput {
            stage: "finalize",
            path: input,
        });
    }

    let merged = read_dataset(&input)?;
    let input_len = merged.len();
    let (mut finished, dropped_outliers) = apply_speed_ceiling(merged, max_mph);
    finished.name = format!("{date}_final");

    ensure_dir(&layout.final_dir())?;
    let output = layout.final_file(date);
    write_dataset(&output, &finished)?;

    let report = FinalizeReport {
        input: input_len,
        kept: finished.len(),
        dropped_outliers,
        output,
    };
    info!(
        input = report.input,
        kept = report.kept,
        dropped_outliers = report.dropped_outliers,
        max_mph,
        "Finalize complete"
    );
    Ok(report)
}

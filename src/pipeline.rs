//! Runs the offline stages back to back for one date.

use std::path::Path;
use tracing::info;

use crate::error::Result;
use crate::finalize::{FinalizeReport, finalize};
use crate::layout::DataLayout;
use crate::merge::merge;
use crate::partition::{PartitionReport, partition};
use crate::segments::{SegmentsReport, build_for_date};

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessReport {
    pub partition: PartitionReport,
    pub segments: SegmentsReport,
    pub finalize: FinalizeReport,
}

/// Partition `raw`, then build, merge and finalize segments for `date`.
#[tracing::instrument(skip(layout), fields(raw = %raw.display()))]
pub fn process_date(layout: &DataLayout, raw: &Path, date: &str, max_mph: f64) -> Result<ProcessReport> {
    layout.ensure_all()?;

    let partition = partition(layout, raw)?;
    let segments = build_for_date(layout, date)?;
    merge(layout, date)?;
    let finalize = finalize(layout, date, max_mph)?;

    info!(date, output = %finalize.output.display(), "Processing complete");
    Ok(ProcessReport {
        partition,
        segments,
        finalize,
    })
}

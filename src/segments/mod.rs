//! Per-vehicle segment construction for one collection date.
//!
//! Reads every `by-date-vehicle/{date}_*_data.csv`, turns each stream into
//! cleaned line segments and writes one dataset per vehicle to `segments/`.

pub mod builder;
pub mod geodesic;

pub use builder::{BuildReport, MAX_GAP_SECS, TimedSample, build_segments};

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::dataset::{Dataset, write_dataset};
use crate::error::{PipelineError, Result};
use crate::layout::{DataLayout, ensure_dir, list_matching};
use crate::sample::Sample;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SegmentsReport {
    pub streams: usize,
    pub skipped_streams: usize,
    pub datasets: Vec<PathBuf>,
    pub totals: BuildReport,
}

/// Reads a per-vehicle stream in file order.
pub fn read_stream(path: &Path) -> Result<Vec<TimedSample>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut stream = Vec::new();
    for result in reader.deserialize() {
        let sample: Sample = result?;
        let line = stream.len() as u64 + 2;
        let timed = TimedSample::parse(sample).map_err(|e| PipelineError::MalformedRow {
            path: path.to_path_buf(),
            line,
            reason: format!("last_updated_on: {e}"),
        })?;
        stream.push(timed);
    }
    Ok(stream)
}

/// Builds and writes the segment dataset for one stream file.
///
/// Returns `None` when the stream produced no usable segments.
pub fn build_file(layout: &DataLayout, path: &Path) -> Result<(Option<PathBuf>, BuildReport)> {
    let stream = read_stream(path)?;
    let (segments, report) = build_segments(&stream);

    let Some(first) = segments.first() else {
        debug!(path = %path.display(), samples = report.samples, "No usable segments, skipping");
        return Ok((None, report));
    };

    // Named from the data rather than from the input file name.
    let attrs = &first.attributes;
    let date = attrs
        .last_updated_on
        .get(..10)
        .unwrap_or(&attrs.last_updated_on)
        .to_string();
    let out = layout.segment_file(&date, &attrs.vehicle_id);
    let name = format!("{date}_{}_line", attrs.vehicle_id);

    write_dataset(&out, &Dataset::new(name, segments))?;
    debug!(
        output = %out.display(),
        segments = report.segments,
        duplicates = report.duplicates,
        out_of_order = report.out_of_order,
        perturbed = report.perturbed,
        stale_gaps = report.stale_gaps,
        "Wrote segment dataset"
    );
    Ok((Some(out), report))
}

/// Runs the segment builder over every vehicle stream of `date`.
#[tracing::instrument(skip(layout))]
pub fn build_for_date(layout: &DataLayout, date: &str) -> Result<SegmentsReport> {
    let input_dir = layout.by_date_vehicle_dir();
    if !input_dir.is_dir() {
        return Err(PipelineError::MissingInput {
            stage: "segments",
            path: input_dir,
        });
    }
    ensure_dir(&layout.segments_dir())?;

    let mut report = SegmentsReport::default();
    for path in list_matching(&input_dir, &format!("{date}_"), ".csv")? {
        report.streams += 1;
        let (written, stream_report) = build_file(layout, &path)?;
        report.totals += stream_report;
        match written {
            Some(out) => report.datasets.push(out),
            None => report.skipped_streams += 1,
        }
    }

    info!(
        streams = report.streams,
        datasets = report.datasets.len(),
        skipped_streams = report.skipped_streams,
        segments = report.totals.segments,
        duplicates = report.totals.duplicates,
        out_of_order = report.totals.out_of_order,
        perturbed = report.totals.perturbed,
        stale_gaps = report.totals.stale_gaps,
        "Segment building complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::read_dataset;
    use std::fs;

    const HEADER: &str = "generated_on,collection_date,standing_capacity,description,seating_capacity,last_updated_on,call_name,speed,vehicle_id,segment_id,passenger_load,route_id,tracking_status,lat,long,heading";

    fn write_stream(layout: &DataLayout, vehicle: &str, rows: &[(&str, f64, f64)]) {
        ensure_dir(&layout.by_date_vehicle_dir()).unwrap();
        let mut content = format!("{HEADER}\n");
        for (updated, lat, long) in rows {
            content.push_str(&format!(
                "2018-11-01T12:00:00+00:00,2018-11-01,,,40,{updated},2306,10.5,{vehicle},,,4005134,up,{lat},{long},90\n"
            ));
        }
        fs::write(layout.date_vehicle_file("2018-11-01", vehicle), content).unwrap();
    }

    #[test]
    fn test_build_for_date_writes_one_dataset_per_vehicle() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(tmp.path());
        write_stream(
            &layout,
            "A",
            &[
                ("2018-11-01T08:00:00-04:00", 35.990, -78.900),
                ("2018-11-01T08:00:30-04:00", 35.991, -78.899),
                ("2018-11-01T08:01:00-04:00", 35.992, -78.898),
            ],
        );
        write_stream(&layout, "B", &[("2018-11-01T08:00:00-04:00", 35.990, -78.900)]);

        let report = build_for_date(&layout, "2018-11-01").unwrap();

        assert_eq!(report.streams, 2);
        assert_eq!(report.skipped_streams, 1);
        assert_eq!(report.datasets, vec![layout.segment_file("2018-11-01", "A")]);
        assert!(!layout.segment_file("2018-11-01", "B").exists());

        let dataset = read_dataset(&report.datasets[0]).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.segments[0].attributes.collection_date.as_deref(), Some("2018-11-01"));
        assert_eq!(dataset.segments[0].attributes.seating_capacity, Some(40));
    }

    #[test]
    fn test_output_named_from_data() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(tmp.path());
        // Generated on Nov 1 UTC, but the vehicle reported on Oct 31 local time.
        write_stream(
            &layout,
            "C",
            &[
                ("2018-10-31T23:59:00-04:00", 35.990, -78.900),
                ("2018-10-31T23:59:30-04:00", 35.991, -78.899),
            ],
        );

        let report = build_for_date(&layout, "2018-11-01").unwrap();

        assert_eq!(report.datasets, vec![layout.segment_file("2018-10-31", "C")]);
    }

    #[test]
    fn test_bad_timestamp_reports_line() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(tmp.path());
        write_stream(
            &layout,
            "D",
            &[
                ("2018-11-01T08:00:00-04:00", 35.990, -78.900),
                ("yesterday", 35.991, -78.899),
            ],
        );

        let err = build_for_date(&layout, "2018-11-01").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedRow { line: 3, .. }));
    }

    #[test]
    fn test_missing_input_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(tmp.path());

        let err = build_for_date(&layout, "2018-11-01").unwrap_err();
        assert!(matches!(err, PipelineError::MissingInput { stage: "segments", .. }));
    }
}

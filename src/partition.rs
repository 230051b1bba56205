//! Splits the collector's flat file by calendar date and by (date, vehicle).

use csv::{StringRecord, Writer};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::layout::{DataLayout, ensure_dir};
use crate::sample::{COLLECTION_DATE, COLUMNS, Sample, is_sentinel};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PartitionReport {
    pub rows: usize,
    pub sentinel_rows: usize,
    pub dates: usize,
    pub vehicle_files: usize,
}

/// Rows of one input file grouped by date and by (date, vehicle), with the
/// `collection_date` column already inserted.
#[derive(Debug, Default)]
pub struct Partitions {
    pub header: StringRecord,
    pub by_date: BTreeMap<String, Vec<StringRecord>>,
    pub by_date_vehicle: BTreeMap<(String, String), Vec<StringRecord>>,
    pub sentinel_rows: usize,
}

fn column_index(headers: &StringRecord, path: &Path, column: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| PipelineError::MissingColumn {
            path: path.to_path_buf(),
            column: column.to_string(),
        })
}

fn with_collection_date(record: &StringRecord, generated_on_idx: usize, date: &str) -> StringRecord {
    let mut out = StringRecord::with_capacity(record.as_slice().len() + date.len(), record.len() + 1);
    for (i, field) in record.iter().enumerate() {
        out.push_field(field);
        if i == generated_on_idx {
            out.push_field(date);
        }
    }
    out
}

/// Reads and groups a flat file. Fails on the first missing column or
/// malformed row.
pub fn read_partitions(path: &Path) -> Result<Partitions> {
    if !path.is_file() {
        return Err(PipelineError::MissingInput {
            stage: "partition",
            path: path.to_path_buf(),
        });
    }

    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    for column in COLUMNS {
        column_index(&headers, path, column)?;
    }
    let generated_on_idx = column_index(&headers, path, "generated_on")?;
    let vehicle_idx = column_index(&headers, path, "vehicle_id")?;

    let mut partitions = Partitions {
        header: with_collection_date(&headers, generated_on_idx, COLLECTION_DATE),
        ..Default::default()
    };

    for result in reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let generated_on = &record[generated_on_idx];
        let date = Sample::date_key(generated_on)
            .ok_or_else(|| PipelineError::MalformedRow {
                path: path.to_path_buf(),
                line,
                reason: format!("generated_on '{generated_on}' has no date prefix"),
            })?
            .to_string();

        let row = with_collection_date(&record, generated_on_idx, &date);
        let sentinel = is_sentinel(record.iter());

        partitions
            .by_date
            .entry(date.clone())
            .or_default()
            .push(row.clone());

        if sentinel {
            partitions.sentinel_rows += 1;
            continue;
        }

        let vehicle = record[vehicle_idx].to_string();
        partitions
            .by_date_vehicle
            .entry((date, vehicle))
            .or_default()
            .push(row);
    }

    Ok(partitions)
}

fn write_rows(path: &Path, header: &StringRecord, rows: &[StringRecord]) -> Result<()> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Partitions `raw/{date}.csv` into `by-date/` and `by-date-vehicle/`.
#[tracing::instrument(skip(layout), fields(input = %input.display()))]
pub fn partition(layout: &DataLayout, input: &Path) -> Result<PartitionReport> {
    let partitions = read_partitions(input)?;

    ensure_dir(&layout.by_date_dir())?;
    ensure_dir(&layout.by_date_vehicle_dir())?;

    let mut report = PartitionReport {
        sentinel_rows: partitions.sentinel_rows,
        ..Default::default()
    };

    for (date, rows) in &partitions.by_date {
        let path = layout.date_file(date);
        write_rows(&path, &partitions.header, rows)?;
        debug!(date = %date, rows = rows.len(), "Wrote date partition");
        report.rows += rows.len();
        report.dates += 1;
    }

    for ((date, vehicle), rows) in &partitions.by_date_vehicle {
        let path = layout.date_vehicle_file(date, vehicle);
        write_rows(&path, &partitions.header, rows)?;
        debug!(date = %date, vehicle = %vehicle, rows = rows.len(), "Wrote vehicle partition");
        report.vehicle_files += 1;
    }

    info!(
        rows = report.rows,
        sentinel_rows = report.sentinel_rows,
        dates = report.dates,
        vehicle_files = report.vehicle_files,
        "Partitioning complete"
    );
    Ok(report)
}

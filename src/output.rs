//! Append-only persistence of collector rows.

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::sample::{COLUMNS, Sample, sentinel_row};
use csv::{Writer, WriterBuilder};
use std::fs::{File, OpenOptions};
use std::path::Path;

fn open_append(path: &Path) -> Result<(Writer<File>, bool)> {
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, "Appending CSV rows");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    Ok((writer, file_exists))
}

/// Appends samples to the flat file, writing the header first if the file
/// does not exist yet. Never truncates.
pub fn append_samples(path: &Path, samples: &[Sample]) -> Result<()> {
    let (mut writer, file_exists) = open_append(path)?;

    if !file_exists {
        writer.write_record(COLUMNS)?;
    }
    for sample in samples {
        writer.serialize(sample)?;
    }
    writer.flush()?;

    Ok(())
}

/// Appends one sentinel row marking a failed poll at `at`.
pub fn append_sentinel(path: &Path, at: DateTime<Utc>) -> Result<()> {
    let (mut writer, file_exists) = open_append(path)?;

    if !file_exists {
        writer.write_record(COLUMNS)?;
    }
    writer.write_record(sentinel_row(at))?;
    writer.flush()?;

    Ok(())
}

/// Writes the header into a new flat file. Existing files are left untouched.
pub fn ensure_header(path: &Path) -> Result<()> {
    append_samples(path, &[])
}

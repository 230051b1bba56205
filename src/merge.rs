//! Concatenates the per-vehicle segment datasets of one date.

use std::path::PathBuf;
use tracing::{debug, info};

use crate::dataset::{Dataset, read_dataset, write_dataset};
use crate::error::{PipelineError, Result};
use crate::layout::{DataLayout, ensure_dir, list_matching};

/// Loads every `segments/{date}*.geojson` in file-name order and
/// concatenates their segments.
pub fn merge_datasets(layout: &DataLayout, date: &str) -> Result<(Dataset, Vec<PathBuf>)> {
    let dir = layout.segments_dir();
    let inputs = if dir.is_dir() {
        list_matching(&dir, date, ".geojson")?
    } else {
        Vec::new()
    };
    if inputs.is_empty() {
        return Err(PipelineError::NoSegmentDatasets {
            date: date.to_string(),
            dir,
        });
    }

    let mut merged = Dataset::new(format!("{date}_merge"), Vec::new());
    for path in &inputs {
        let dataset = read_dataset(path)?;
        debug!(input = %path.display(), segments = dataset.len(), "Appending dataset");
        merged.segments.extend(dataset.segments);
    }
    Ok((merged, inputs))
}

/// Writes `merged/{date}_merge.geojson`.
#[tracing::instrument(skip(layout))]
pub fn merge(layout: &DataLayout, date: &str) -> Result<PathBuf> {
    let (merged, inputs) = merge_datasets(layout, date)?;

    ensure_dir(&layout.merged_dir())?;
    let out = layout.merged_file(date);
    write_dataset(&out, &merged)?;

    info!(
        inputs = inputs.len(),
        segments = merged.len(),
        output = %out.display(),
        "Merge complete"
    );
    Ok(out)
}

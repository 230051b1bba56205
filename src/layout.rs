//! On-disk layout of the pipeline under a single data root.
//!
//! ```text
//! {root}/raw/{date}.csv
//! {root}/by-date/{date}_data.csv
//! {root}/by-date-vehicle/{date}_{vehicle}_data.csv
//! {root}/segments/{date}_{vehicle}_line.geojson
//! {root}/merged/{date}_merge.geojson
//! {root}/final/{date}_final.geojson
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Creates `dir` and its parents if missing. Existing directories are left alone.
pub fn ensure_dir(dir: &Path) -> io::Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir)?;
    debug!(dir = %dir.display(), "Created directory");
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.root.join("raw")
    }

    pub fn by_date_dir(&self) -> PathBuf {
        self.root.join("by-date")
    }

    pub fn by_date_vehicle_dir(&self) -> PathBuf {
        self.root.join("by-date-vehicle")
    }

    pub fn segments_dir(&self) -> PathBuf {
        self.root.join("segments")
    }

    pub fn merged_dir(&self) -> PathBuf {
        self.root.join("merged")
    }

    pub fn final_dir(&self) -> PathBuf {
        self.root.join("final")
    }

    /// Creates every stage directory. Safe to call repeatedly.
    pub fn ensure_all(&self) -> io::Result<()> {
        for dir in [
            self.raw_dir(),
            self.by_date_dir(),
            self.by_date_vehicle_dir(),
            self.segments_dir(),
            self.merged_dir(),
            self.final_dir(),
        ] {
            ensure_dir(&dir)?;
        }
        Ok(())
    }

    pub fn raw_file(&self, date: &str) -> PathBuf {
        self.raw_dir().join(format!("{date}.csv"))
    }

    pub fn date_file(&self, date: &str) -> PathBuf {
        self.by_date_dir().join(format!("{date}_data.csv"))
    }

    pub fn date_vehicle_file(&self, date: &str, vehicle_id: &str) -> PathBuf {
        self.by_date_vehicle_dir()
            .join(format!("{date}_{}_data.csv", sanitize(vehicle_id)))
    }

    pub fn segment_file(&self, date: &str, vehicle_id: &str) -> PathBuf {
        self.segments_dir()
            .join(format!("{date}_{}_line.geojson", sanitize(vehicle_id)))
    }

    pub fn merged_file(&self, date: &str) -> PathBuf {
        self.merged_dir().join(format!("{date}_merge.geojson"))
    }

    pub fn final_file(&self, date: &str) -> PathBuf {
        self.final_dir().join(format!("{date}_final.geojson"))
    }
}

/// Lists files in `dir` whose name starts with `prefix` and ends with `suffix`,
/// sorted by file name.
pub fn list_matching(dir: &Path, prefix: &str, suffix: &str) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.starts_with(prefix) && name.ends_with(suffix) {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

// Vehicle ids come from the API; keep them from escaping the directory.
fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '-',
            c => c,
        })
        .collect()
}

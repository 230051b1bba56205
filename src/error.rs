//! Error types shared by the pipeline stages.

use std::path::PathBuf;

/// Failures of a single collector poll.
///
/// Every variant is recoverable: the collector records a sentinel row and
/// tries again on the next cycle.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("connectivity error: {0}")]
    Connectivity(#[source] reqwest::Error),

    #[error("HTTP status {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("unexpected payload: {0}")]
    Payload(String),
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Payload(e.to_string())
    }
}

impl FetchError {
    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Connectivity(_) => "connectivity",
            FetchError::HttpStatus { .. } => "http_status",
            FetchError::Payload(_) => "payload",
        }
    }
}

/// Failure of one collector cycle: either the poll or the write failed.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("writing {}: {reason}", path.display())]
    Write { path: PathBuf, reason: String },
}

/// Failures of the offline stages (partition, segments, merge, finalize).
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{stage}: input not found at {}", path.display())]
    MissingInput { stage: &'static str, path: PathBuf },

    #[error("{}: missing column `{column}`", path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("{}:{line}: {reason}", path.display())]
    MalformedRow {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("no segment datasets for {date} in {}", dir.display())]
    NoSegmentDatasets { date: String, dir: PathBuf },

    #[error("{}: CRS `{found}` does not match `{expected}`", path.display())]
    CrsMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

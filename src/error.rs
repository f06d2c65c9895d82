use std::path::PathBuf;
use thiserror::Error;

/// The main error type for cocolens operations.
///
/// Only conditions that make a pass impossible are errors. Skipped records,
/// degenerate geometry and empty results are reported as data by the passes
/// themselves.
#[derive(Debug, Error)]
pub enum CocolensError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse COCO JSON from {path}: {source}")]
    CocoJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write JSON output to {path}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Dataset {origin} has no '{family}' list")]
    MissingRecordFamily { origin: String, family: &'static str },

    #[error("Invalid options: {message}")]
    InvalidOptions { message: String },

    #[error("No image satisfies the candidate filters ({images_considered} image(s) considered)")]
    NoCandidate { images_considered: usize },
}

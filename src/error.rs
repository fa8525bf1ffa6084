//! Error types for scanning and syncing media records

use std::path::PathBuf;
use thiserror::Error;

/// Failures talking to the remote catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Connection refused, DNS failure, timeout and the like
    #[error("transport error: {0}")]
    Transport(String),

    /// The catalog answered with a non-2xx status
    #[error("catalog returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be read or decoded
    #[error("malformed response body: {0}")]
    Body(String),
}

/// Why the watermark could not be read
#[derive(Debug, Error)]
pub enum WatermarkUnavailable {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("unparsable watermark {value:?}: {source}")]
    Parse {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Per-record failures. These are tallied, never propagated.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("unparsable timestamp {value:?}: {source}")]
    TimestampParse {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("submit failed: {0}")]
    Submit(#[from] CatalogError),

    #[error("cancelled before submission")]
    Cancelled,
}

/// Failures that stop a directory walk early
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("failed to traverse {}: {source}", .path.display())]
    Traversal {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("walk cancelled")]
    Cancelled,
}

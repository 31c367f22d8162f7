//! Error types for the enrichment pipeline.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures reading or writing one of the pipeline's JSON artifacts.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Why a single routing attempt produced no path.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// The attempt exceeded the per-request timeout. The only retryable case.
    #[error("request timed out")]
    Timeout,

    /// The service answered with a client or server error status.
    #[error("routing service returned HTTP {0}")]
    Status(u16),

    /// The service answered but found no route between the waypoints.
    #[error("no route: {0}")]
    NoRoute(String),

    /// Connection-level failure other than a timeout.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Timeout)
    }
}

/// Errors that end a pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("invalid option '{key}': {reason}")]
    InvalidOption { key: &'static str, reason: String },
}

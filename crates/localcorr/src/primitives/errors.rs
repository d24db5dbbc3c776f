//! Error types for local correlation.
//!
//! ## Purpose
//!
//! This module defines the single error enum returned by every fallible
//! operation in the crate, from configuration through parsing, the pipeline,
//! and output.
//!
//! ## Key concepts
//!
//! * **Configuration errors**: raised while building a processor or opening an
//!   execution context, before any data is read.
//! * **Shape errors**: two series of different length met in a sum or a
//!   correlation. Never recovered by truncation or padding.
//! * **Numeric edge cases**: not errors. Zero-variance series produce NaN.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the local correlation pipeline.
#[derive(Debug, Error)]
pub enum LocalCorrError {
    /// A volume bound was zero or negative.
    #[error("{axis} bound must be a positive integer, got {value}")]
    InvalidBounds {
        /// Axis name ("x" or "y").
        axis: &'static str,
        /// Offending value.
        value: i64,
    },

    /// A required builder parameter was never set.
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// The neighborhood window area does not fit the platform integer types.
    #[error("neighborhood radius {0} is too large")]
    RadiusTooLarge(usize),

    /// Partition count of zero.
    #[error("partition count must be at least 1, got {0}")]
    InvalidPartitions(usize),

    /// Streaming chunk size of zero.
    #[error("chunk size must be at least 1, got {0}")]
    InvalidChunkSize(usize),

    /// Connection target string not understood.
    #[error("unsupported connection target '{0}' (expected local, local[N] or local[*])")]
    UnsupportedTarget(String),

    /// The worker pool could not be started.
    #[error("failed to start worker pool: {0}")]
    ThreadPool(String),

    /// An input line could not be turned into a record.
    #[error("malformed record '{line}': {reason}")]
    Parse {
        /// The offending line, truncated.
        line: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Two time series of different length were combined.
    #[error("time series length mismatch: expected {expected}, found {found}")]
    ShapeMismatch {
        /// Length of the series already present.
        expected: usize,
        /// Length of the incoming series.
        found: usize,
    },

    /// An action ran on a dataset whose execution context was closed.
    #[error("execution context '{0}' is closed")]
    ContextClosed(String),

    /// Filesystem failure.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// JSON serialization failure.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl LocalCorrError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Build a parse error, keeping at most 80 characters of the line.
    pub fn parse(line: &str, reason: impl Into<String>) -> Self {
        let mut shown: String = line.chars().take(80).collect();
        if shown.len() < line.len() {
            shown.push_str("...");
        }
        Self::Parse {
            line: shown,
            reason: reason.into(),
        }
    }

    /// Whether this error stems from invalid configuration rather than data or I/O.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidBounds { .. }
                | Self::MissingParameter(_)
                | Self::RadiusTooLarge(_)
                | Self::InvalidPartitions(_)
                | Self::InvalidChunkSize(_)
                | Self::UnsupportedTarget(_)
                | Self::ThreadPool(_)
        )
    }
}

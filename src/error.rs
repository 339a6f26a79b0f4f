//! Error types for address stream aggregation.
//!
//! This module provides the [`AddrStatError`] type for every fatal condition
//! the pipeline can hit and the [`Result`] convenience type.
//!
//! Malformed records are not errors: they are recovered in place
//! and surface only as counts (see [`crate::recovery`]).

use thiserror::Error;

/// Error type for all fatal pipeline conditions.
///
/// Any of these halts the parse; no partial statistics are returned.
#[derive(Error, Debug)]
pub enum AddrStatError {
    /// The underlying byte source failed.
    #[error("source read error: {0}")]
    SourceRead(#[from] std::io::Error),

    /// A single segment did not fit in the reader's fixed buffer.
    #[error("input buffer overflow: no delimiter within {capacity} buffered bytes")]
    BufferOverflow {
        /// Total buffer capacity in bytes.
        capacity: usize,
    },

    /// A worker queue was disconnected while the producer was still sending.
    #[error("channel send error (worker terminated early)")]
    ChannelSend,

    /// A statistics worker thread panicked.
    #[error("statistics worker {worker} panicked")]
    WorkerPanicked {
        /// Index of the worker that failed.
        worker: usize,
    },

    /// Report serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The pipeline configuration cannot be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience type alias for [`std::result::Result`] with [`AddrStatError`].
pub type Result<T> = std::result::Result<T, AddrStatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AddrStatError::BufferOverflow { capacity: 32 };
        assert_eq!(
            err.to_string(),
            "input buffer overflow: no delimiter within 32 buffered bytes"
        );

        let err = AddrStatError::WorkerPanicked { worker: 3 };
        assert_eq!(err.to_string(), "statistics worker 3 panicked");

        let err = AddrStatError::InvalidConfig("workers must be at least 1".to_string());
        assert_eq!(
            err.to_string(),
            "invalid configuration: workers must be at least 1"
        );
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: AddrStatError = io.into();
        assert!(matches!(err, AddrStatError::SourceRead(_)));
        assert!(err.to_string().contains("pipe closed"));
    }
}

// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::io;

/// Failures writing a formatted event to a sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Failed to write event: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Sink closed")]
    Closed,
}

impl SinkError {
    /// Only I/O failures can succeed on a second attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, SinkError::Io(_))
    }
}

/// Failures that stop a stream driver. Bad lines never end up here; they are
/// folded into a record or dropped.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("Failed to open {path}: {source}")]
    Open { path: String, source: io::Error },

    #[error("Failed to read from {source_name}: {source}")]
    Read { source_name: String, source: io::Error },

    #[error("Record queue closed")]
    HandoffClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = StreamError::Open {
            path: "/var/log/app.log".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        assert_eq!(
            error.to_string(),
            "Failed to open /var/log/app.log: no such file"
        );
        assert_eq!(StreamError::HandoffClosed.to_string(), "Record queue closed");
    }

    #[test]
    fn test_sink_error_from_io() {
        let error: SinkError = io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed").into();
        assert!(matches!(error, SinkError::Io(_)));
        assert_eq!(error.to_string(), "Failed to write event: pipe closed");
        assert!(error.is_retryable());
    }

    #[test]
    fn test_only_io_errors_are_retryable() {
        let serialize: SinkError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(!serialize.is_retryable());
        assert!(!SinkError::Closed.is_retryable());
    }
}

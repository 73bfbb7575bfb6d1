//! Error types and handling for the PDF tampering-detection engine

use std::{io, result::Result as StdResult};

use thiserror::Error;

/// Custom result type for detection operations
pub type Result<T> = StdResult<T, Error>;

/// Core error type for detection operations.
///
/// Only `InvalidInput` and `Cancelled` propagate to the top-level caller;
/// tool-scoped failures are absorbed by the external-signal adapter and
/// heuristic misses are represented as default values, not errors.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Invalid input document: {0}")]
    InvalidInput(String),

    #[error("Analysis cancelled")]
    Cancelled,

    #[error("External tool unavailable: {0}")]
    ToolUnavailable(String),

    #[error("External tool failed: {tool}: {reason}")]
    ToolFailed { tool: String, reason: String },

    #[error("Report serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}

impl Error {
    /// True when the error is scoped to a single external-tool
    /// sub-operation and must be recovered locally.
    pub fn is_tool_scoped(&self) -> bool {
        matches!(self, Error::ToolUnavailable(_) | Error::ToolFailed { .. })
    }

    pub fn tool_failed(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::ToolFailed {
            tool: tool.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_errors_are_scoped() {
        assert!(Error::ToolUnavailable("exiftool".into()).is_tool_scoped());
        assert!(Error::tool_failed("mutool", "exit code 1").is_tool_scoped());
        assert!(!Error::Cancelled.is_tool_scoped());
        assert!(!Error::InvalidInput("broken header".into()).is_tool_scoped());
    }
}

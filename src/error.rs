//! Error types for the transfer engine.

use crate::format::FormatError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use thiserror::Error;

/// Result type alias for transfer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for export and import.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or truncated record stream.
    #[error("format error: {0}")]
    Format(#[from] FormatError),

    /// A type hint names a type this process cannot decode.
    #[error("{hint} hint requires type '{type_name}' which cannot be resolved")]
    TypeResolution { hint: String, type_name: String },

    /// A key or value could not be written to the stream.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Malformed caller input (dataset names, file pairs, locators).
    #[error("invalid argument: {0}")]
    Argument(String),

    /// The target dataset does not exist.
    #[error("dataset not found: {0}")]
    DatasetNotFound(String),

    /// A member failed while running its share of a distributed operation.
    #[error("remote execution failed: {0}")]
    RemoteExecution(#[from] RemoteExecutionError),

    /// File system errors.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),

    /// Generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for an [`Error::Argument`].
    pub fn argument(msg: impl Into<String>) -> Self {
        Error::Argument(msg.into())
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Internal(format!("serialization: {}", e))
    }
}

/// Transport-safe description of a failure on a remote member.
///
/// The member-side error type does not survive the trip; its message and the
/// chain of underlying causes do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteExecutionError {
    /// Member that reported the failure.
    pub member: String,

    /// Top-level error message.
    pub message: String,

    /// Messages of the underlying causes, outermost first.
    pub causes: Vec<String>,
}

impl RemoteExecutionError {
    /// Create an error with no cause chain.
    pub fn new(member: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            member: member.into(),
            message: message.into(),
            causes: Vec::new(),
        }
    }

    /// Capture an error and its source chain.
    pub fn capture(member: impl Into<String>, err: &(dyn std::error::Error + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        Self {
            member: member.into(),
            message: err.to_string(),
            causes,
        }
    }
}

impl fmt::Display for RemoteExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "member '{}': {}", self.member, self.message)?;
        for cause in &self.causes {
            write!(f, "\n  caused by: {}", cause)?;
        }
        Ok(())
    }
}

impl std::error::Error for RemoteExecutionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_keeps_cause_chain() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "no such file");
        let err = Error::Io(io_err);

        let remote = RemoteExecutionError::capture("server1", &err);
        assert_eq!(remote.member, "server1");
        assert!(remote.message.contains("no such file"));

        let text = remote.to_string();
        assert!(text.starts_with("member 'server1'"));
    }

    #[test]
    fn test_remote_error_survives_serialization() {
        let remote = RemoteExecutionError {
            member: "server2".into(),
            message: "boom".into(),
            causes: vec!["disk full".into()],
        };

        let bytes = bincode::serialize(&remote).unwrap();
        let decoded: RemoteExecutionError = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, remote);

        let err: Error = decoded.into();
        assert!(matches!(err, Error::RemoteExecution(_)));
    }
}

//! Unified error type for the clipforge application.
//!
//! All crates funnel their failures into [`Error`], which carries enough
//! context for API handlers to derive an HTTP status code via
//! [`Error::http_status`]. Cancellation of a running job is deliberately not
//! an error: it is a terminal job status, reported through the job registry.

use std::fmt;

/// Unified error type covering all failure modes in clipforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    ///
    /// A normal, expected outcome for job and file lookups (e.g. after a
    /// process restart the registry is empty), reported distinctly from
    /// internal failures.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "job", "tool", "file").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// Request data failed validation (e.g. a required parameter is missing).
    ///
    /// Always resolved at the boundary, before any process is spawned.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An external tool (ffmpeg, ffprobe) could not be spawned or exited
    /// non-zero. The message carries the tool's own diagnostic text,
    /// truncated to a bounded tail, never reinterpreted.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Diagnostic text from the tool.
        message: String,
    },

    /// Media probing returned unusable output.
    #[error("Probe error: {0}")]
    Probe(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Validation(_) => 400,
            Error::Tool { .. } => 502,
            Error::Probe(_) => 422,
            Error::Io { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = Error::not_found("job", "abc-123");
        assert_eq!(err.to_string(), "job not found: abc-123");
        assert_eq!(err.http_status(), 404);
    }

    #[test]
    fn validation_display() {
        let err = Error::Validation("input is required".into());
        assert_eq!(err.to_string(), "Validation error: input is required");
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn tool_display() {
        let err = Error::tool("ffmpeg", "exit code 1");
        assert_eq!(err.to_string(), "Tool error [ffmpeg]: exit code 1");
        assert_eq!(err.http_status(), 502);
    }

    #[test]
    fn probe_display() {
        let err = Error::Probe("unparseable output".into());
        assert_eq!(err.to_string(), "Probe error: unparseable output");
        assert_eq!(err.http_status(), 422);
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn internal_display() {
        let err = Error::Internal("unexpected state".into());
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn result_alias() {
        fn ok_fn() -> Result<i32> {
            Ok(7)
        }
        assert_eq!(ok_fn().unwrap(), 7);
    }
}

//! Error types for ragpipe.
//!
//! Library crates use [`RagpipeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all ragpipe operations.
#[derive(Debug, thiserror::Error)]
pub enum RagpipeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network or rendering failure while fetching a single page.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// HTML parsing or content extraction error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A pipeline stage's underlying call failed.
    #[error("stage '{stage}' failed: {message}")]
    Stage { stage: String, message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (missing columns, malformed records, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RagpipeError>;

impl RagpipeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a stage error attributed to a named pipeline stage.
    pub fn stage(stage: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Stage {
            stage: stage.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = RagpipeError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = RagpipeError::stage("research", "provider timed out");
        assert_eq!(err.to_string(), "stage 'research' failed: provider timed out");

        let err = RagpipeError::validation("CSV file must contain 'Title' column");
        assert!(err.to_string().contains("'Title'"));
    }
}

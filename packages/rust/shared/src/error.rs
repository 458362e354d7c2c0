//! Error types for ContentForge.
//!
//! Library crates use [`ContentForgeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Messages for the provider-facing variants are shown to the user verbatim,
//! so they carry no category prefix.

use std::path::PathBuf;

/// Top-level error type for all ContentForge operations.
#[derive(Debug, thiserror::Error)]
pub enum ContentForgeError {
    /// Extraction provider answered a fetch with a non-success status.
    #[error("{message}")]
    Fetch { message: String },

    /// Fetch succeeded but the page had no content.
    #[error("No content found on the specified website")]
    EmptyContent,

    /// Search provider answered with a non-success status.
    #[error("{message}")]
    Search { message: String },

    /// Search succeeded with zero results.
    #[error("No related content found for the given keyword")]
    NoResults,

    /// Every stage succeeded but the final document is empty.
    #[error("No content was generated")]
    NothingGenerated,

    /// Language-model call failed (network, auth, quota, malformed reply).
    /// The provider's own message is shown as is.
    #[error("{0}")]
    Provider(String),

    /// Caller-supplied input rejected before the run starts.
    #[error("{message}")]
    Validation { message: String },

    /// Configuration loading error.
    #[error("config error: {message}")]
    Config { message: String },

    /// An external call exceeded its configured timeout.
    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: String, secs: u64 },

    /// The run was cancelled or superseded by a newer run.
    #[error("content generation was cancelled")]
    Cancelled,

    /// Response body could not be decoded.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ContentForgeError>;

impl ContentForgeError {
    /// Create a fetch error from any displayable message.
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch {
            message: msg.into(),
        }
    }

    /// Create a search error from any displayable message.
    pub fn search(msg: impl Into<String>) -> Self {
        Self::Search {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

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

    /// Create a timeout error for the named operation.
    pub fn timeout(operation: impl Into<String>, secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            secs,
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

//! Error types for the gauntlet build pipeline.
//!
//! Library crates use [`GauntletError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum GauntletError {
    /// Configuration loading or validation error (including a missing credential).
    #[error("config error: {message}")]
    Config { message: String },

    /// Network-level failure: DNS, connection refused, timeout, unreadable body.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote API answered with a non-success status.
    #[error("api error: {url} returned HTTP {status}: {body}")]
    Api {
        url: String,
        status: u16,
        body: String,
    },

    /// A payload did not have the expected shape.
    #[error("shape error: {message}")]
    Shape { message: String },

    /// A remote content write was rejected (stale hash, conflicting path).
    #[error("publish conflict on {path}: HTTP {status}: {body}")]
    PublishConflict {
        path: String,
        status: u16,
        body: String,
    },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (serialization failure, invalid argument, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, GauntletError>;

impl GauntletError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a shape error from any displayable message.
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::Shape {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
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

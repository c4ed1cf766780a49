//! Error types for readlist.
//!
//! Library crates use [`ReadlistError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all readlist operations.
#[derive(Debug, thiserror::Error)]
pub enum ReadlistError {
    /// The reading-list document could not be opened or read.
    #[error("reading list unavailable at {path:?}: {source}")]
    DocumentUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// No reading-list document is configured at all.
    #[error("no reading list file configured; set `library.file` in the config or pass --file")]
    NoTargetFile,

    /// The metadata resolver produced nothing usable for this input.
    #[error("could not resolve book metadata for '{input}'")]
    MetadataResolutionFailed { input: String },

    /// A heading reference no longer points at a heading.
    #[error("no heading titled '{title}' at offset {offset}; the document changed since it was listed")]
    InvalidTarget { offset: usize, title: String },

    /// Network/HTTP error while resolving metadata.
    #[error("network error: {0}")]
    Network(String),

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error while writing the document or config.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad property syntax, malformed input, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ReadlistError>;

impl ReadlistError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
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

    /// The document at `path` could not be opened or read.
    pub fn unavailable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DocumentUnavailable {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_target(offset: usize, title: impl Into<String>) -> Self {
        Self::InvalidTarget {
            offset,
            title: title.into(),
        }
    }

    pub fn unresolved(input: impl Into<String>) -> Self {
        Self::MetadataResolutionFailed {
            input: input.into(),
        }
    }
}

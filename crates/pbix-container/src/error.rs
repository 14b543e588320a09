//! Error types for PBIX container access.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by archive access and the layout codec. All of these are
/// fatal: they abort a run before anything is written.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Report archive not found or not readable.
    #[error("failed to open report archive {path}: {source}")]
    ArchiveOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not a readable zip container.
    #[error("report archive {path} is not a valid container: {message}")]
    ArchiveFormat { path: PathBuf, message: String },

    /// The archive has no layout entry.
    #[error("report archive {path} has no Report/Layout entry")]
    LayoutMissing { path: PathBuf },

    /// The layout entry is not valid UTF-16LE text.
    #[error("layout entry is not valid UTF-16 text")]
    Encoding,

    /// The layout entry is not well-formed JSON.
    #[error("layout entry is not well-formed JSON: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
    },

    /// A rewritten layout could not be serialized.
    #[error("failed to serialize layout: {source}")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },

    /// Failed writing the output archive.
    #[error("failed to write report archive {path}: {message}")]
    ArchiveWrite { path: PathBuf, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ContainerError>;

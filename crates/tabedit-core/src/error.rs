//! Error types for tabedit-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tabedit-core
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File extension is not one of the recognized formats
    #[error("unsupported file format '{extension}' for '{path}' (expected csv, xlsx or txt)")]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// Content is malformed for its declared format
    #[error("failed to parse '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    /// A row does not have one cell per column
    #[error("row {row} has {found} cells, expected {expected}")]
    Shape {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// Two columns share a name
    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),

    /// Tables passed to the combiner do not share a schema
    #[error("table {index} ({source_name}) does not match the first table: {detail}")]
    SchemaMismatch {
        index: usize,
        source_name: String,
        detail: String,
    },

    /// Combine was called without tables
    #[error("no tables to combine")]
    NothingToCombine,

    /// Edit options could not be understood
    #[error("invalid edit options: {0}")]
    InvalidEditSpec(String),

    /// No stored table is registered under this handle
    #[error("unknown table handle '{0}'")]
    UnknownHandle(String),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Error::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Replace the file path an error reports
    pub(crate) fn with_path(self, label: impl Into<PathBuf>) -> Self {
        match self {
            Error::FileRead { source, .. } => Error::FileRead {
                path: label.into(),
                source,
            },
            Error::UnsupportedFormat { extension, .. } => Error::UnsupportedFormat {
                path: label.into(),
                extension,
            },
            Error::Parse { message, .. } => Error::Parse {
                path: label.into(),
                message,
            },
            other => other,
        }
    }
}

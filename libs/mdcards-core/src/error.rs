//! Error types for mdcards-core.

use thiserror::Error;

/// Errors reported by a card store collaborator.
///
/// The sync pass never propagates these; each call site downgrades them to a
/// "no effect" outcome and logs a warning.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("network error: {0}")]
    Network(String),

    #[error("store rejected {action}: {message}")]
    Backend { action: String, message: String },

    #[error("malformed store response: {0}")]
    Parse(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors reported by a document editor collaborator.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("line {line} out of range (document has {line_count} lines)")]
    LineOutOfRange { line: usize, line_count: usize },

    #[error("column {column} out of range on line {line}")]
    ColumnOutOfRange { line: usize, column: usize },

    #[error("offset {offset} out of range (document is {len} bytes)")]
    OffsetOutOfRange { offset: usize, len: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Front matter that could not be read as YAML.
#[derive(Debug, Error)]
#[error("invalid front matter: {0}")]
pub struct FrontmatterError(#[from] pub serde_yaml::Error);

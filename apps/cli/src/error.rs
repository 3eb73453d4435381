//! Error types for the mdcards CLI

use mdcards_core::{EditorError, StoreError};
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the mdcards application
#[derive(Debug, Error)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No markdown files found under {0}")]
    NoDocuments(PathBuf),

    #[error("TOML deserialization error: {0}")]
    TomlDeserialize(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Card store error: {0}")]
    Store(#[from] StoreError),

    #[error("Document error: {0}")]
    Editor(#[from] EditorError),
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Store(_) => 2,
            CliError::Config(_) | CliError::TomlDeserialize(_) => 3,
            CliError::NoDocuments(_) => 4,
            _ => 1,
        }
    }
}

/// Result type using CliError
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_have_their_own_exit_code() {
        let err = CliError::Store(StoreError::Unavailable("connection refused".to_string()));
        assert_eq!(err.exit_code(), 2);
        assert_eq!(
            err.to_string(),
            "Card store error: store unavailable: connection refused"
        );
    }

    #[test]
    fn test_other_errors_exit_with_one() {
        let err = CliError::Io(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert_eq!(err.exit_code(), 1);
        assert_eq!(CliError::Config("bad".to_string()).exit_code(), 3);
    }
}

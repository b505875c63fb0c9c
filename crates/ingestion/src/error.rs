//! Ingestion error types

use std::path::PathBuf;

use thiserror::Error;

/// Ingestion error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Recording file could not be read
    #[error("failed to read recording {path}: {source}")]
    Io {
        /// Recording path
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Recording line is not a valid detection event
    #[error("{source_id}: line {line}: {message}")]
    ParseFailed {
        /// Source the recording was loaded for
        source_id: String,
        /// 1-based line number
        line: usize,
        /// Error message
        message: String,
    },

    /// Recording names a lane that does not exist
    #[error("{source_id}: line {line}: unknown lane '{value}'")]
    InvalidLane {
        /// Source the recording was loaded for
        source_id: String,
        /// 1-based line number
        line: usize,
        /// Rejected lane identifier
        value: String,
    },

    /// A source with this id is already registered
    #[error("detection source {source_id} is already registered")]
    AlreadyRegistered {
        /// Source ID
        source_id: String,
    },
}

impl IngestionError {
    pub(crate) fn parse_failed(
        source_id: &str,
        line: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::ParseFailed {
            source_id: source_id.to_string(),
            line,
            message: message.into(),
        }
    }
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;

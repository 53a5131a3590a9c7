//! Error types shared across corpusedit crates.

use std::path::PathBuf;

/// Top-level error type for corpusedit operations.
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("Load error: {message}")]
    Load { message: String },

    #[error("Audio error: {message}")]
    Audio { message: String },

    #[error("Export error: {message}")]
    Export { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("No parquet shards found in {dir}")]
    NoShards { dir: PathBuf },

    #[error("Shard {shard} is missing required column '{column}'")]
    MissingColumn { shard: String, column: String },

    #[error("Shard {shard} column '{column}' has unsupported type {data_type}")]
    UnsupportedColumn {
        shard: String,
        column: String,
        data_type: String,
    },

    #[error("Sample index {index} out of range (dataset has {len} samples)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid trim range: start {start_ms}ms must be non-negative and before end {end_ms}ms")]
    InvalidTrimRange { start_ms: f64, end_ms: f64 },

    #[error("Cannot delete the last remaining sample")]
    LastSample,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias using CorpusError.
pub type CorpusResult<T> = Result<T, CorpusError>;

impl CorpusError {
    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load {
            message: msg.into(),
        }
    }

    pub fn audio(msg: impl Into<String>) -> Self {
        Self::Audio {
            message: msg.into(),
        }
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether the error came from a bad request rather than a broken corpus.
    ///
    /// The interactive session reports these and keeps running.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::IndexOutOfRange { .. } | Self::InvalidTrimRange { .. } | Self::LastSample
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors_are_classified() {
        assert!(CorpusError::LastSample.is_user_error());
        assert!(CorpusError::IndexOutOfRange { index: 4, len: 2 }.is_user_error());
        assert!(!CorpusError::load("bad shard").is_user_error());
    }

    #[test]
    fn test_wraps_into_anyhow_at_the_cli() {
        fn check<E: std::error::Error + Send + Sync + 'static>(_: &E) {}
        let err: CorpusError = std::io::Error::from(std::io::ErrorKind::NotFound).into();
        check(&err);
        assert!(matches!(err, CorpusError::Io(_)));
    }

    #[test]
    fn test_messages_name_the_offender() {
        let err = CorpusError::MissingColumn {
            shard: "a.parquet".to_string(),
            column: "text".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Shard a.parquet is missing required column 'text'"
        );
    }
}

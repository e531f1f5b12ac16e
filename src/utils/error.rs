//! Library error type

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for convnet_mnist operations
#[derive(Error, Debug)]
pub enum MnistError {
    /// Malformed or missing dataset files
    #[error("dataset: {0}")]
    Dataset(String),

    /// Dataset download failed
    #[error("download of {0} failed: {1}")]
    Download(String, String),

    /// Error saving or loading model weights
    #[error("model weights: {0}")]
    Model(String),

    /// Rejected or unreadable training configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Metrics JSON could not be encoded or decoded
    #[error("metrics JSON: {0}")]
    Serialization(String),

    /// Arguments no operation can act on
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The pipeline never acknowledged a checkpoint signal
    #[error("checkpoint signal {0:?} was not acknowledged: {1}")]
    Signal(PathBuf, String),
}

impl From<serde_json::Error> for MnistError {
    fn from(err: serde_json::Error) -> Self {
        MnistError::Serialization(err.to_string())
    }
}

/// Convenience Result type for convnet_mnist operations
pub type Result<T> = std::result::Result<T, MnistError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_error_message() {
        let err = MnistError::Dataset("bad magic".to_string());
        assert_eq!(err.to_string(), "dataset: bad magic");
    }

    #[test]
    fn test_signal_error_mentions_path() {
        let err = MnistError::Signal(PathBuf::from("/tmp/.dvc/tmp/DVC_CHECKPOINT"), "timed out".into());
        assert!(err.to_string().contains("DVC_CHECKPOINT"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: MnistError = io_err.into();
        assert!(matches!(err, MnistError::Io(_)));
    }
}

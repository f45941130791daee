//! Error types for the labelserve service.

use thiserror::Error;

/// A specialized Result type for labelserve operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading a classifier model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The model file could not be read.
    #[error("cannot read model file {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON model body failed to parse.
    #[error("malformed JSON model: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary model body failed to decode.
    #[error("malformed binary model: {0}")]
    Bincode(#[from] bincode::Error),

    /// The model declares no labels.
    #[error("model has no labels")]
    NoLabels,

    /// A declared dimension is zero.
    #[error("model field {0} must be non-zero")]
    ZeroDimension(&'static str),

    /// A matrix does not match the declared shape.
    #[error("{matrix} matrix shape mismatch: expected {expected_rows}x{expected_cols}, row {row} has {actual} columns")]
    ShapeMismatch {
        matrix: &'static str,
        expected_rows: usize,
        expected_cols: usize,
        row: usize,
        actual: usize,
    },

    /// A weight is NaN or infinite.
    #[error("{matrix} matrix has a non-finite weight at row {row}, column {col}")]
    NonFinite {
        matrix: &'static str,
        row: usize,
        col: usize,
    },

    /// `word_ngrams` is beyond what the classifier supports.
    #[error("word_ngrams is {actual}, at most {max} is supported")]
    NgramOrder { max: usize, actual: usize },

    /// A matrix has the wrong number of rows.
    #[error("{matrix} matrix has {actual} rows, expected {expected}")]
    RowCount {
        matrix: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// The error type for labelserve operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport-level failure reported by libzmq.
    #[error("zmq error: {0} (errno {code})", code = .0.to_raw())]
    Zmq(#[from] zmq::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Model loading failed.
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// Configuration could not be assembled.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Signal handler registration failed.
    #[error("signal setup failed: {0}")]
    Signal(#[from] nix::Error),

    /// The inference engine failed on a request.
    #[error("engine error: {0}")]
    Engine(String),

    /// The reply could not be serialized.
    #[error("reply encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// The engine ranked a label with a probability that is not a number.
    #[error("engine returned a non-finite probability ({0}) for the top label")]
    NonFiniteProbability(f64),

    /// A blocking receive was interrupted by a signal that was not captured.
    #[error("receive interrupted by an unhandled signal")]
    UncapturedInterrupt,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zmq_error_reports_errno() {
        let err = Error::from(zmq::Error::ETERM);
        let msg = err.to_string();
        assert!(msg.starts_with("zmq error:"));
        assert!(msg.contains(&format!("errno {}", zmq::Error::ETERM.to_raw())));
    }

    #[test]
    fn test_model_error_wraps() {
        let err: Error = ModelError::NoLabels.into();
        assert_eq!(err.to_string(), "model error: model has no labels");
    }
}

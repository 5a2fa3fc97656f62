//! Error types for the simscore core.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering scoring, configuration, dataset loading, and run storage.

use std::path::PathBuf;

use crate::registry::MetricError;

/// Top-level error type for the simscore core library.
#[derive(Debug, thiserror::Error)]
pub enum SimscoreError {
    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised by the scoring engine and the tag aggregator.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("Unknown metric: {name}")]
    UnknownMetric { name: String },

    #[error("Metric '{metric}' failed on record '{record_id}' (variant '{variant}'): {source}")]
    MetricComputation {
        metric: String,
        record_id: String,
        variant: String,
        #[source]
        source: MetricError,
    },

    #[error("Unknown column: {column}")]
    UnknownColumn { column: String },

    #[error("Invalid weight for metric '{name}': {value}")]
    InvalidWeight { name: String, value: f64 },

    #[error("Invalid record '{id}': {reason}")]
    InvalidRecord { id: String, reason: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// Errors from dataset loading.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("Dataset file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported dataset format: {path} (expected .jsonl, .json or .csv)")]
    UnsupportedFormat { path: PathBuf },

    #[error("Parse error in {path} at line {line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the run recorder.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("Storage backend error: {message}")]
    Backend { message: String },

    #[error("Invalid stored value: {message}")]
    Corrupt { message: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Backend {
            message: err.to_string(),
        }
    }
}

/// A type alias for results using the top-level `SimscoreError`.
pub type Result<T> = std::result::Result<T, SimscoreError>;

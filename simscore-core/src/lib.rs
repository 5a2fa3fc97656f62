//! # simscore Core
//!
//! Core library for simscore.
//! Scores candidate texts against references with a weighted combination of
//! pluggable metrics, summarizes the scored rows per tag with percentile
//! bootstrap confidence intervals, and records runs for later comparison.

pub mod aggregate;
pub mod bootstrap;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod recorder;
pub mod registry;
pub mod store;
pub mod types;

// Re-export commonly used types at the crate root.
pub use aggregate::summarize_by_tag;
pub use bootstrap::{Bootstrap, bootstrap_ci, bootstrap_ci_with_rng};
pub use config::{SimscoreConfig, config_exists, load_config};
pub use dataset::load_records;
pub use engine::ScoringEngine;
pub use error::{ConfigError, DatasetError, EvalError, Result, SimscoreError, StoreError};
pub use recorder::{
    InMemoryRecorder, MetricStat, MetricValue, Run, RunComparison, RunRecorder, compare_runs,
    summarize_run,
};
pub use registry::{Metric, MetricError, MetricRegistry};
pub use store::SqliteRunStore;
pub use types::{Candidate, Record, SCORE_COLUMN, ScoredRow, TagSummary, WeightSet};

//! Run Recorder: persists run configuration and per-row metric values.
//!
//! The scoring core only writes to a recorder after a pass has finished; it
//! never reads back during evaluation. Reading is for listing and comparing
//! past runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::StoreError;
use crate::types::{SCORE_COLUMN, ScoredRow};

/// A recorded evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    /// Serialized run configuration (JSON).
    pub config_json: String,
    /// Short source-control revision of the working directory, if known.
    pub git_revision: Option<String>,
    pub notes: Option<String>,
}

impl Run {
    pub fn new(config: &serde_json::Value, notes: Option<&str>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            config_json: config.to_string(),
            git_revision: git_revision(Path::new(".")),
            notes: notes.map(str::to_string),
        }
    }
}

/// One logged metric value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    pub record_id: String,
    pub variant: String,
    pub metric: String,
    pub value: f64,
}

/// Storage contract for evaluation runs.
pub trait RunRecorder {
    /// Create and persist a new run.
    fn create_run(
        &mut self,
        config: &serde_json::Value,
        notes: Option<&str>,
    ) -> Result<Run, StoreError>;

    /// Persist one metric value for a run.
    fn log_metric(
        &mut self,
        run_id: &str,
        record_id: &str,
        variant: &str,
        metric: &str,
        value: f64,
    ) -> Result<(), StoreError>;

    /// All runs, newest first.
    fn list_runs(&self) -> Result<Vec<Run>, StoreError>;

    fn get_run(&self, run_id: &str) -> Result<Option<Run>, StoreError>;

    /// Every metric value logged for a run.
    fn metric_values(&self, run_id: &str) -> Result<Vec<MetricValue>, StoreError>;

    /// Log the composite score and every metric of every row.
    ///
    /// Returns the number of values written.
    fn log_rows(&mut self, run_id: &str, rows: &[ScoredRow]) -> Result<usize, StoreError> {
        let mut written = 0;
        for row in rows {
            self.log_metric(run_id, &row.id, &row.variant, SCORE_COLUMN, row.score)?;
            written += 1;
            for (metric, &value) in &row.metrics {
                self.log_metric(run_id, &row.id, &row.variant, metric, value)?;
                written += 1;
            }
        }
        Ok(written)
    }
}

/// Recorder that keeps everything in memory.
#[derive(Debug, Default)]
pub struct InMemoryRecorder {
    runs: Vec<Run>,
    values: Vec<(String, MetricValue)>,
}

impl InMemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RunRecorder for InMemoryRecorder {
    fn create_run(
        &mut self,
        config: &serde_json::Value,
        notes: Option<&str>,
    ) -> Result<Run, StoreError> {
        let run = Run::new(config, notes);
        self.runs.push(run.clone());
        Ok(run)
    }

    fn log_metric(
        &mut self,
        run_id: &str,
        record_id: &str,
        variant: &str,
        metric: &str,
        value: f64,
    ) -> Result<(), StoreError> {
        if !self.runs.iter().any(|r| r.run_id == run_id) {
            return Err(StoreError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }
        self.values.push((
            run_id.to_string(),
            MetricValue {
                record_id: record_id.to_string(),
                variant: variant.to_string(),
                metric: metric.to_string(),
                value,
            },
        ));
        Ok(())
    }

    fn list_runs(&self) -> Result<Vec<Run>, StoreError> {
        let mut runs = self.runs.clone();
        runs.reverse();
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(runs)
    }

    fn get_run(&self, run_id: &str) -> Result<Option<Run>, StoreError> {
        Ok(self.runs.iter().find(|r| r.run_id == run_id).cloned())
    }

    fn metric_values(&self, run_id: &str) -> Result<Vec<MetricValue>, StoreError> {
        Ok(self
            .values
            .iter()
            .filter(|(id, _)| id == run_id)
            .map(|(_, v)| v.clone())
            .collect())
    }
}

/// Mean and count of one metric within a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricStat {
    pub mean: f64,
    pub count: usize,
}

/// Per-metric means of a run, keyed by metric name.
pub fn summarize_run(
    recorder: &dyn RunRecorder,
    run_id: &str,
) -> Result<BTreeMap<String, MetricStat>, StoreError> {
    if recorder.get_run(run_id)?.is_none() {
        return Err(StoreError::RunNotFound {
            run_id: run_id.to_string(),
        });
    }
    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for value in recorder.metric_values(run_id)? {
        let entry = sums.entry(value.metric).or_insert((0.0, 0));
        entry.0 += value.value;
        entry.1 += 1;
    }
    Ok(sums
        .into_iter()
        .map(|(metric, (sum, count))| {
            (
                metric,
                MetricStat {
                    mean: sum / count as f64,
                    count,
                },
            )
        })
        .collect())
}

/// One metric compared across two runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunComparison {
    pub metric: String,
    pub baseline: Option<f64>,
    pub candidate: Option<f64>,
    /// `candidate - baseline` when both runs have the metric.
    pub delta: Option<f64>,
}

/// Compare per-metric means of `candidate` against `baseline`.
pub fn compare_runs(
    recorder: &dyn RunRecorder,
    baseline: &str,
    candidate: &str,
) -> Result<Vec<RunComparison>, StoreError> {
    let base = summarize_run(recorder, baseline)?;
    let cand = summarize_run(recorder, candidate)?;

    let mut metrics: Vec<&String> = base.keys().chain(cand.keys()).collect();
    metrics.sort();
    metrics.dedup();

    Ok(metrics
        .into_iter()
        .map(|metric| {
            let b = base.get(metric).map(|s| s.mean);
            let c = cand.get(metric).map(|s| s.mean);
            RunComparison {
                metric: metric.clone(),
                baseline: b,
                candidate: c,
                delta: b.zip(c).map(|(b, c)| c - b),
            }
        })
        .collect())
}

/// Short `HEAD` revision of the repository containing `dir`, if any.
pub fn git_revision(dir: &Path) -> Option<String> {
    let repo = git2::Repository::discover(dir).ok()?;
    let commit = repo.head().ok()?.peel_to_commit().ok()?;
    let short = commit.as_object().short_id().ok()?;
    short.as_str().map(str::to_string)
}

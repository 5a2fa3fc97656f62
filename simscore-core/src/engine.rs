//! Scoring Engine: turns records into weighted, ranked scored rows.
//!
//! For every (record, candidate variant) pair the engine invokes each weighted
//! metric against the record's references and combines the results with the
//! normalized weights. Weight keys are validated against the registry before
//! any metric runs. Any metric failure aborts the whole pass.

use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::EvalError;
use crate::registry::{Metric, MetricRegistry};
use crate::types::{Record, ScoredRow, WeightSet};

/// Scores records against a registry of metrics.
///
/// The engine borrows the registry for its whole lifetime, so no metric can be
/// registered while an evaluation is in flight.
pub struct ScoringEngine<'a> {
    registry: &'a MetricRegistry,
    parallel: bool,
}

/// Metrics resolved for one pass, paired with their normalized weights.
struct Plan {
    metrics: Vec<(String, Arc<dyn Metric>, f64)>,
}

impl<'a> ScoringEngine<'a> {
    pub fn new(registry: &'a MetricRegistry) -> Self {
        Self {
            registry,
            parallel: true,
        }
    }

    /// Score records on the rayon pool (default) or sequentially.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Score every candidate variant of every record.
    ///
    /// Rows are returned by composite score descending; ties keep record and
    /// variant encounter order.
    pub fn evaluate(
        &self,
        records: &[Record],
        weights: &WeightSet,
    ) -> Result<Vec<ScoredRow>, EvalError> {
        let plan = self.plan(weights)?;
        for record in records {
            record.validate()?;
        }

        info!(
            records = records.len(),
            metrics = plan.metrics.len(),
            parallel = self.parallel,
            "Starting evaluation pass"
        );

        let per_record: Vec<Vec<ScoredRow>> = if self.parallel {
            records
                .par_iter()
                .map(|record| score_record(&plan, record))
                .collect::<Result<_, _>>()?
        } else {
            records
                .iter()
                .map(|record| score_record(&plan, record))
                .collect::<Result<_, _>>()?
        };

        let mut rows: Vec<ScoredRow> = per_record.into_iter().flatten().collect();
        rows.sort_by(|a, b| descending_nan_last(a.score, b.score));

        debug!(rows = rows.len(), "Evaluation pass complete");
        Ok(rows)
    }

    /// Validate weights and resolve every weighted metric up front.
    fn plan(&self, weights: &WeightSet) -> Result<Plan, EvalError> {
        weights.validate()?;
        let normalized = weights.normalized();
        let mut metrics = Vec::with_capacity(normalized.len());
        for (name, weight) in normalized {
            let metric = self.registry.get(&name)?;
            metrics.push((name, metric, weight));
        }
        Ok(Plan { metrics })
    }
}

fn score_record(plan: &Plan, record: &Record) -> Result<Vec<ScoredRow>, EvalError> {
    let tags = record.tag_string();
    let mut rows = Vec::with_capacity(record.candidate.len());

    for (variant, text) in record.candidate.variants() {
        let mut values = BTreeMap::new();
        let mut composite = 0.0;
        for (name, metric, weight) in &plan.metrics {
            let value = metric.score(text, &record.references).map_err(|source| {
                EvalError::MetricComputation {
                    metric: name.clone(),
                    record_id: record.id.clone(),
                    variant: variant.to_string(),
                    source,
                }
            })?;
            composite += weight * value;
            values.insert(name.clone(), value);
        }
        rows.push(ScoredRow {
            id: record.id.clone(),
            variant: variant.to_string(),
            metrics: values,
            score: composite,
            tags: tags.clone(),
        });
    }

    Ok(rows)
}

/// Descending order for floats with NaN placed after every number.
pub(crate) fn descending_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

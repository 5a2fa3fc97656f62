use simscore_core::{Metric, MetricError};

/// 1.0 when the trimmed candidate equals any trimmed reference, else 0.0.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatch;

impl Metric for ExactMatch {
    fn score(&self, candidate: &str, references: &[String]) -> Result<f64, MetricError> {
        let candidate = candidate.trim();
        let hit = references.iter().any(|r| r.trim() == candidate);
        Ok(if hit { 1.0 } else { 0.0 })
    }
}

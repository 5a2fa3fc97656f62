//! Metric Registry: maps metric names to scoring capabilities.
//!
//! Metrics are registered once at startup and the registry is then shared
//! read-only with the scoring engine. The engine only depends on the
//! [`Metric`] contract, never on concrete metric implementations.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::EvalError;

/// Failure raised by a metric's scoring call.
pub type MetricError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Trait that all metrics must implement.
///
/// A metric scores one candidate against a (possibly empty) list of references.
/// Scores are expected to fall in `[0, 1]` but this is not enforced.
pub trait Metric: Send + Sync {
    fn score(&self, candidate: &str, references: &[String]) -> Result<f64, MetricError>;
}

impl<F> Metric for F
where
    F: Fn(&str, &[String]) -> Result<f64, MetricError> + Send + Sync,
{
    fn score(&self, candidate: &str, references: &[String]) -> Result<f64, MetricError> {
        self(candidate, references)
    }
}

/// The metric registry holds all registered metrics by name.
#[derive(Clone, Default)]
pub struct MetricRegistry {
    metrics: HashMap<String, Arc<dyn Metric>>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self {
            metrics: HashMap::new(),
        }
    }

    /// Register a metric under `name`.
    ///
    /// Re-registering a name replaces the previous metric (last write wins);
    /// the replaced metric is returned and a warning is logged.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        metric: Arc<dyn Metric>,
    ) -> Option<Arc<dyn Metric>> {
        let name = name.into();
        debug!(metric = %name, "Registering metric");
        let previous = self.metrics.insert(name.clone(), metric);
        if previous.is_some() {
            warn!(metric = %name, "Metric re-registered; previous registration replaced");
        }
        previous
    }

    /// Get a metric by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Metric>, EvalError> {
        self.metrics
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UnknownMetric {
                name: name.to_string(),
            })
    }

    /// Snapshot of the full mapping; later registrations do not affect it.
    pub fn all(&self) -> BTreeMap<String, Arc<dyn Metric>> {
        self.metrics
            .iter()
            .map(|(k, v)| (k.clone(), Arc::clone(v)))
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.metrics.contains_key(name)
    }

    /// Registered metric names in ascending order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.metrics.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

impl std::fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricRegistry")
            .field("metrics", &self.names())
            .finish()
    }
}

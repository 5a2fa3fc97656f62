//! # simscore Metrics
//!
//! Built-in text similarity metrics for simscore.
//! Provides exact match, token-level F1, sentence BLEU and ROUGE-L, all
//! scored in `[0, 1]` against a list of references.

pub mod bleu;
pub mod exact;
pub mod rouge;
pub mod token_f1;
pub mod tokenize;

use simscore_core::{Metric, MetricRegistry};
use std::sync::Arc;

pub use bleu::Bleu;
pub use exact::ExactMatch;
pub use rouge::RougeL;
pub use token_f1::TokenF1;

pub const EXACT_MATCH: &str = "exact_match";
pub const TOKEN_F1: &str = "token_f1";
pub const BLEU: &str = "bleu";
pub const ROUGE_L: &str = "rouge_l";
/// Older spelling of [`ROUGE_L`], accepted so existing weight files keep working.
pub const ROUGE_L_ALIAS: &str = "rougeL";

/// Register all built-in metrics.
pub fn register_builtin_metrics(registry: &mut MetricRegistry) {
    let rouge: Arc<dyn Metric> = Arc::new(RougeL);
    let metrics: Vec<(&str, Arc<dyn Metric>)> = vec![
        (EXACT_MATCH, Arc::new(ExactMatch)),
        (TOKEN_F1, Arc::new(TokenF1)),
        (BLEU, Arc::new(Bleu::default())),
        (ROUGE_L, Arc::clone(&rouge)),
        (ROUGE_L_ALIAS, rouge),
    ];

    for (name, metric) in metrics {
        if registry.register(name, metric).is_some() {
            tracing::warn!(metric = name, "Built-in metric replaced an existing registration");
        }
    }
}

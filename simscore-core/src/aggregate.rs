//! Tag Aggregator: per-tag means with bootstrap confidence intervals.
//!
//! Each row's tag string is split on commas; a row contributes once to every
//! distinct non-empty tag it carries. Groups are visited in ascending tag
//! order so a seeded bootstrap gives reproducible bounds.

use std::collections::BTreeMap;
use tracing::debug;

use crate::bootstrap::{Bootstrap, bootstrap_ci_with_rng};
use crate::engine::descending_nan_last;
use crate::error::EvalError;
use crate::types::{ScoredRow, TagSummary};

/// Summarize `column` per tag.
///
/// Returns `Ok(None)` when no row carries any tag. Fails with
/// [`EvalError::UnknownColumn`] when a tagged row has no such column.
/// Summaries are sorted by mean descending.
pub fn summarize_by_tag(
    rows: &[ScoredRow],
    column: &str,
    bootstrap: &Bootstrap,
) -> Result<Option<Vec<TagSummary>>, EvalError> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for row in rows {
        let tags = row.tag_tokens();
        if tags.is_empty() {
            continue;
        }
        let value = row.value(column).ok_or_else(|| EvalError::UnknownColumn {
            column: column.to_string(),
        })?;
        for tag in tags {
            groups.entry(tag).or_default().push(value);
        }
    }

    if groups.is_empty() {
        debug!("No tagged rows; skipping tag summary");
        return Ok(None);
    }

    let mut rng = bootstrap.rng();
    let mut summaries: Vec<TagSummary> = groups
        .into_iter()
        .map(|(tag, values)| {
            let n = values.len();
            let mean = values.iter().sum::<f64>() / n as f64;
            let (lo, hi) =
                bootstrap_ci_with_rng(&values, bootstrap.iterations, bootstrap.alpha, &mut rng);
            TagSummary {
                tag: tag.to_string(),
                mean,
                lo,
                hi,
                n,
            }
        })
        .collect();

    summaries.sort_by(|a, b| descending_nan_last(a.mean, b.mean));
    debug!(tags = summaries.len(), column, "Tag summary computed");
    Ok(Some(summaries))
}

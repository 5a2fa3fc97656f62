//! Property-based tests for core components using proptest.

use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

use simscore_core::registry::MetricError;
use simscore_core::{
    Bootstrap, Candidate, MetricRegistry, Record, ScoredRow, ScoringEngine, WeightSet,
    bootstrap_ci, bootstrap_ci_with_rng, summarize_by_tag,
};

/// Registry of metrics that return fixed values regardless of input.
fn constant_registry(values: &[f64]) -> MetricRegistry {
    let mut registry = MetricRegistry::new();
    for (i, &v) in values.iter().enumerate() {
        registry.register(
            format!("m{i}"),
            Arc::new(move |_: &str, _: &[String]| -> Result<f64, MetricError> { Ok(v) }),
        );
    }
    registry
}

fn tagged_row(id: usize, score: f64, tags: &str) -> ScoredRow {
    ScoredRow {
        id: id.to_string(),
        variant: "single".to_string(),
        metrics: BTreeMap::new(),
        score,
        tags: tags.to_string(),
    }
}

// --- Weight normalization properties ---

proptest! {
    #[test]
    fn composite_is_normalized_weighted_sum(
        pairs in prop::collection::vec((0.0f64..10.0, -5.0f64..5.0), 1..6),
    ) {
        let values: Vec<f64> = pairs.iter().map(|(_, v)| *v).collect();
        let registry = constant_registry(&values);
        let weights: WeightSet = pairs
            .iter()
            .enumerate()
            .map(|(i, (w, _))| (format!("m{i}"), *w))
            .collect();

        let total: f64 = pairs.iter().map(|(w, _)| w).sum();
        let expected = if total > 0.0 {
            pairs.iter().map(|(w, v)| w / total * v).sum::<f64>()
        } else {
            0.0
        };

        let record = Record::new("r", vec!["ref".to_string()], Candidate::from("cand"));
        let rows = ScoringEngine::new(&registry)
            .parallel(false)
            .evaluate(&[record], &weights)
            .unwrap();
        prop_assert_eq!(rows.len(), 1);
        prop_assert!((rows[0].score - expected).abs() < 1e-9);
    }

    #[test]
    fn zero_total_weight_gives_zero_score(
        values in prop::collection::vec(-100.0f64..100.0, 1..6),
    ) {
        let registry = constant_registry(&values);
        let weights: WeightSet = (0..values.len()).map(|i| (format!("m{i}"), 0.0)).collect();
        let record = Record::new("r", vec![], Candidate::from("cand"));
        let rows = ScoringEngine::new(&registry).evaluate(&[record], &weights).unwrap();
        prop_assert_eq!(rows[0].score, 0.0);
    }

    #[test]
    fn normalized_weights_sum_to_one(
        weights in prop::collection::vec(0.001f64..100.0, 1..8),
    ) {
        let set: WeightSet = weights
            .iter()
            .enumerate()
            .map(|(i, w)| (format!("m{i}"), *w))
            .collect();
        let sum: f64 = set.normalized().values().sum();
        prop_assert!((sum - 1.0).abs() < 1e-9);
    }
}

// --- Bootstrap properties ---

proptest! {
    #[test]
    fn bootstrap_bounds_ordered_and_within_range(
        values in prop::collection::vec(-1000.0f64..1000.0, 1..40),
        alpha in 0.01f64..0.99,
        seed in any::<u64>(),
    ) {
        let mut rng = Bootstrap::seeded(seed).rng();
        let (lo, hi) = bootstrap_ci_with_rng(&values, 200, alpha, &mut rng);
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(lo <= hi);
        prop_assert!(lo >= min - 1e-9);
        prop_assert!(hi <= max + 1e-9);
    }

    #[test]
    fn bootstrap_empty_is_nan(iterations in 0usize..500, alpha in 0.01f64..0.99) {
        let (lo, hi) = bootstrap_ci(&[], iterations, alpha);
        prop_assert!(lo.is_nan());
        prop_assert!(hi.is_nan());
    }

    #[test]
    fn bootstrap_seeded_is_deterministic(
        values in prop::collection::vec(0.0f64..1.0, 1..20),
        seed in any::<u64>(),
    ) {
        let b = Bootstrap { iterations: 100, alpha: 0.1, seed: Some(seed) };
        prop_assert_eq!(b.estimate(&values), b.estimate(&values));
    }
}

// --- Tag aggregation properties ---

proptest! {
    #[test]
    fn two_tag_rows_count_in_both_groups(
        scores in prop::collection::vec(0.0f64..1.0, 1..20),
    ) {
        let rows: Vec<ScoredRow> = scores
            .iter()
            .enumerate()
            .map(|(i, s)| tagged_row(i, *s, "a,b"))
            .collect();
        let summaries = summarize_by_tag(&rows, "score", &Bootstrap::seeded(3))
            .unwrap()
            .unwrap();
        prop_assert_eq!(summaries.len(), 2);
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        for summary in &summaries {
            prop_assert_eq!(summary.n, scores.len());
            prop_assert!((summary.mean - mean).abs() < 1e-9);
        }
    }

    #[test]
    fn untagged_rows_contribute_nowhere(
        scores in prop::collection::vec(0.0f64..1.0, 0..20),
    ) {
        let rows: Vec<ScoredRow> = scores
            .iter()
            .enumerate()
            .map(|(i, s)| tagged_row(i, *s, ""))
            .collect();
        let out = summarize_by_tag(&rows, "score", &Bootstrap::seeded(3)).unwrap();
        prop_assert!(out.is_none());
    }

    #[test]
    fn tag_summaries_sorted_by_mean(
        scores in prop::collection::vec(0.0f64..1.0, 1..30),
    ) {
        let rows: Vec<ScoredRow> = scores
            .iter()
            .enumerate()
            .map(|(i, s)| tagged_row(i, *s, &format!("t{}", i % 4)))
            .collect();
        let summaries = summarize_by_tag(&rows, "score", &Bootstrap::seeded(5))
            .unwrap()
            .unwrap();
        for pair in summaries.windows(2) {
            prop_assert!(pair[0].mean >= pair[1].mean);
        }
    }
}

//! Bag-of-words F1 between a candidate and its best-matching reference.

use simscore_core::{Metric, MetricError};
use std::collections::HashMap;

use crate::tokenize::normalized_words;

#[derive(Debug, Clone, Copy, Default)]
pub struct TokenF1;

impl Metric for TokenF1 {
    fn score(&self, candidate: &str, references: &[String]) -> Result<f64, MetricError> {
        let cand = normalized_words(candidate);
        Ok(references
            .iter()
            .map(|r| f1(&cand, &normalized_words(r)))
            .fold(0.0, f64::max))
    }
}

/// F1 over token multisets. Two empty token lists match perfectly.
pub fn f1(candidate: &[String], reference: &[String]) -> f64 {
    if candidate.is_empty() || reference.is_empty() {
        return if candidate.is_empty() && reference.is_empty() {
            1.0
        } else {
            0.0
        };
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for token in reference {
        *counts.entry(token.as_str()).or_default() += 1;
    }
    let mut common = 0usize;
    for token in candidate {
        if let Some(n) = counts.get_mut(token.as_str()) {
            if *n > 0 {
                *n -= 1;
                common += 1;
            }
        }
    }
    if common == 0 {
        return 0.0;
    }

    let precision = common as f64 / candidate.len() as f64;
    let recall = common as f64 / reference.len() as f64;
    2.0 * precision * recall / (precision + recall)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_partial_overlap() {
        // common = {the, cat}: p = 2/3, r = 2/4
        let score = TokenF1
            .score("the cat ran", &refs(&["The cat sat down"]))
            .unwrap();
        let expected = 2.0 * (2.0 / 3.0) * 0.5 / (2.0 / 3.0 + 0.5);
        assert!((score - expected).abs() < 1e-12);
    }

    #[test]
    fn test_best_reference_wins() {
        let score = TokenF1
            .score("red apple", &refs(&["green pear", "red apple"]))
            .unwrap();
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_repeated_tokens_are_clipped() {
        // candidate "a a a" vs reference "a b": common = 1
        let score = TokenF1.score("a a a", &refs(&["a b"])).unwrap();
        let (p, r) = (1.0 / 3.0, 0.5);
        assert!((score - 2.0 * p * r / (p + r)).abs() < 1e-12);
    }

    #[test]
    fn test_empty_texts() {
        assert_eq!(TokenF1.score("", &refs(&[""])).unwrap(), 1.0);
        assert_eq!(TokenF1.score("word", &refs(&["..."])).unwrap(), 0.0);
        assert_eq!(TokenF1.score("word", &[]).unwrap(), 0.0);
    }
}

//! ROUGE-L: longest-common-subsequence F-measure, averaged over references.

use simscore_core::{Metric, MetricError};

use crate::tokenize::normalized_words;

#[derive(Debug, Clone, Copy, Default)]
pub struct RougeL;

impl Metric for RougeL {
    fn score(&self, candidate: &str, references: &[String]) -> Result<f64, MetricError> {
        if references.is_empty() {
            return Ok(0.0);
        }
        let cand = normalized_words(candidate);
        let total: f64 = references
            .iter()
            .map(|r| lcs_f_measure(&cand, &normalized_words(r)))
            .sum();
        Ok(total / references.len() as f64)
    }
}

/// Length of the longest common subsequence of two token lists.
pub fn lcs_len(a: &[String], b: &[String]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    // Two-row DP over the shorter sequence.
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    let mut prev = vec![0usize; short.len() + 1];
    let mut curr = vec![0usize; short.len() + 1];
    for x in long {
        for (j, y) in short.iter().enumerate() {
            curr[j + 1] = if x == y {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[short.len()]
}

pub fn lcs_f_measure(candidate: &[String], reference: &[String]) -> f64 {
    let lcs = lcs_len(candidate, reference);
    if lcs == 0 {
        return 0.0;
    }
    let precision = lcs as f64 / candidate.len() as f64;
    let recall = lcs as f64 / reference.len() as f64;
    2.0 * precision * recall / (precision + recall)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<String> {
        normalized_words(s)
    }

    #[test]
    fn test_lcs_len() {
        assert_eq!(lcs_len(&toks("a b c d e"), &toks("a c e")), 3);
        assert_eq!(lcs_len(&toks("a b"), &toks("c d")), 0);
        assert_eq!(lcs_len(&toks(""), &toks("a")), 0);
        assert_eq!(lcs_len(&toks("x a y b"), &toks("a b")), 2);
    }

    #[test]
    fn test_f_measure() {
        // lcs = 3, p = 3/5, r = 3/3
        let f = lcs_f_measure(&toks("a b c d e"), &toks("a c e"));
        let expected = 2.0 * 0.6 * 1.0 / 1.6;
        assert!((f - expected).abs() < 1e-12);
    }

    #[test]
    fn test_mean_over_references() {
        let refs = vec!["the cat sat".to_string(), "nothing alike".to_string()];
        let score = RougeL.score("The cat sat.", &refs).unwrap();
        assert!((score - 0.5).abs() < 1e-12);
    }
}

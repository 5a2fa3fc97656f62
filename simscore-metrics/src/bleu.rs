//! Sentence-level BLEU against multiple references.
//!
//! Modified n-gram precisions are clipped by the maximum count of each n-gram
//! in any single reference. The brevity penalty uses the reference length
//! closest to the candidate length (shorter wins a tie). Orders with no
//! matches are smoothed exponentially: the k-th such order gets a precision of
//! `1 / (2^k * total)`.

use simscore_core::{Metric, MetricError};
use std::collections::HashMap;

use crate::tokenize::words_and_punct;

pub const DEFAULT_MAX_ORDER: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct Bleu {
    pub max_order: usize,
    /// Average only over orders the candidate is long enough to have.
    ///
    /// When off, a candidate shorter than `max_order` tokens scores 0.
    pub effective_order: bool,
}

impl Default for Bleu {
    fn default() -> Self {
        Self {
            max_order: DEFAULT_MAX_ORDER,
            effective_order: false,
        }
    }
}

impl Metric for Bleu {
    fn score(&self, candidate: &str, references: &[String]) -> Result<f64, MetricError> {
        if references.is_empty() {
            return Ok(0.0);
        }
        let cand = words_and_punct(candidate);
        let refs: Vec<Vec<String>> = references.iter().map(|r| words_and_punct(r)).collect();
        Ok(self.sentence_bleu(&cand, &refs))
    }
}

impl Bleu {
    pub fn sentence_bleu(&self, candidate: &[String], references: &[Vec<String>]) -> f64 {
        if candidate.is_empty() || references.is_empty() || self.max_order == 0 {
            return 0.0;
        }

        let mut correct = vec![0usize; self.max_order];
        let mut total = vec![0usize; self.max_order];
        for n in 1..=self.max_order {
            let cand_counts = ngram_counts(candidate, n);
            let mut max_ref: HashMap<&[String], usize> = HashMap::new();
            for reference in references {
                for (gram, count) in ngram_counts(reference, n) {
                    let slot = max_ref.entry(gram).or_default();
                    *slot = (*slot).max(count);
                }
            }
            correct[n - 1] = cand_counts
                .iter()
                .map(|(gram, &count)| count.min(max_ref.get(gram).copied().unwrap_or(0)))
                .sum();
            total[n - 1] = candidate.len().saturating_sub(n - 1);
        }

        if correct.iter().all(|&c| c == 0) {
            return 0.0;
        }

        let mut smooth = 1.0;
        let mut log_sum = 0.0;
        let mut orders = 0usize;
        for n in 0..self.max_order {
            if total[n] == 0 {
                if self.effective_order {
                    break;
                }
                return 0.0;
            }
            let precision = if correct[n] == 0 {
                smooth *= 2.0;
                1.0 / (smooth * total[n] as f64)
            } else {
                correct[n] as f64 / total[n] as f64
            };
            log_sum += precision.ln();
            orders += 1;
        }

        let ref_len = closest_ref_len(candidate.len(), references);
        brevity_penalty(candidate.len(), ref_len) * (log_sum / orders as f64).exp()
    }
}

fn ngram_counts(tokens: &[String], n: usize) -> HashMap<&[String], usize> {
    let mut counts = HashMap::new();
    if tokens.len() >= n {
        for gram in tokens.windows(n) {
            *counts.entry(gram).or_default() += 1;
        }
    }
    counts
}

fn closest_ref_len(cand_len: usize, references: &[Vec<String>]) -> usize {
    references
        .iter()
        .map(Vec::len)
        .min_by_key(|&len| (len.abs_diff(cand_len), len))
        .unwrap_or(0)
}

fn brevity_penalty(cand_len: usize, ref_len: usize) -> f64 {
    if cand_len >= ref_len {
        1.0
    } else if cand_len == 0 {
        0.0
    } else {
        (1.0 - ref_len as f64 / cand_len as f64).exp()
    }
}

//! Ranked-retrieval metrics over binary relevance labels
//!
//! `labels[i]` is the judgment for rank `i + 1`. Every function looks only
//! at the first `k` labels; positions beyond the label vector count as
//! irrelevant.

use serde::Serialize;

/// Fraction of the top-k results that are relevant
pub fn precision_at_k(labels: &[bool], k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    let relevant = labels.iter().take(k).filter(|&&l| l).count();
    relevant as f64 / k as f64
}

/// 1.0 if any of the top-k results is relevant
pub fn hit_rate_at_k(labels: &[bool], k: usize) -> f64 {
    if labels.iter().take(k).any(|&l| l) {
        1.0
    } else {
        0.0
    }
}

/// Reciprocal of the rank of the first relevant result within k
pub fn mrr_at_k(labels: &[bool], k: usize) -> f64 {
    labels
        .iter()
        .take(k)
        .position(|&l| l)
        .map(|i| 1.0 / (i + 1) as f64)
        .unwrap_or(0.0)
}

/// Average precision within the cutoff.
///
/// Normalized by the number of relevant results found in the top k, not by
/// the total number of relevant records for the query.
pub fn average_precision_at_k(labels: &[bool], k: usize) -> f64 {
    let mut relevant = 0usize;
    let mut sum = 0.0;

    for (i, _) in labels.iter().take(k).enumerate().filter(|&(_, &l)| l) {
        relevant += 1;
        sum += relevant as f64 / (i + 1) as f64;
    }

    if relevant > 0 {
        sum / relevant as f64
    } else {
        0.0
    }
}

/// DCG@k with binary gain: Σ rel(i) / log2(i + 1), i 1-based
pub fn dcg_at_k(labels: &[bool], k: usize) -> f64 {
    labels
        .iter()
        .take(k)
        .enumerate()
        .filter(|&(_, &l)| l)
        .map(|(i, _)| 1.0 / ((i + 2) as f64).log2())
        .sum()
}

/// NDCG@k; the ideal ranking is the top-k labels sorted descending
pub fn ndcg_at_k(labels: &[bool], k: usize) -> f64 {
    let mut ideal: Vec<bool> = labels.iter().take(k).copied().collect();
    ideal.sort_unstable_by(|a, b| b.cmp(a));

    let idcg = dcg_at_k(&ideal, k);
    if idcg > 0.0 {
        dcg_at_k(labels, k) / idcg
    } else {
        0.0
    }
}

/// All metrics at one cutoff
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CutoffMetrics {
    pub k: usize,
    pub precision: f64,
    pub hit_rate: f64,
    pub mrr: f64,
    pub average_precision: f64,
    pub ndcg: f64,
}

impl CutoffMetrics {
    /// Compute every metric for `labels` at cutoff `k`
    pub fn compute(labels: &[bool], k: usize) -> Self {
        Self {
            k,
            precision: precision_at_k(labels, k),
            hit_rate: hit_rate_at_k(labels, k),
            mrr: mrr_at_k(labels, k),
            average_precision: average_precision_at_k(labels, k),
            ndcg: ndcg_at_k(labels, k),
        }
    }

    /// Metric values in report column order
    pub fn values(&self) -> [f64; 5] {
        [
            self.precision,
            self.hit_rate,
            self.mrr,
            self.average_precision,
            self.ndcg,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn labels(bits: &[u8]) -> Vec<bool> {
        bits.iter().map(|&b| b == 1).collect()
    }

    #[test]
    fn test_mixed_labels_at_5() {
        let l = labels(&[0, 1, 0, 0, 1]);
        assert!((precision_at_k(&l, 5) - 0.4).abs() < EPS);
        assert_eq!(hit_rate_at_k(&l, 5), 1.0);
        assert!((mrr_at_k(&l, 5) - 0.5).abs() < EPS);
        assert!((average_precision_at_k(&l, 5) - 0.45).abs() < EPS);

        let dcg = 1.0 / 3f64.log2() + 1.0 / 6f64.log2();
        assert!((dcg_at_k(&l, 5) - dcg).abs() < EPS);
        assert!((dcg - 1.0178).abs() < 1e-4);
        assert!((ndcg_at_k(&l, 5) - 0.624).abs() < 1e-3);
    }

    #[test]
    fn test_mixed_labels_at_smaller_cutoffs() {
        let l = labels(&[0, 1, 0, 0, 1]);
        let at1 = CutoffMetrics::compute(&l, 1);
        assert_eq!(at1.values(), [0.0; 5]);

        let at3 = CutoffMetrics::compute(&l, 3);
        assert!((at3.precision - 1.0 / 3.0).abs() < EPS);
        assert_eq!(at3.hit_rate, 1.0);
        assert!((at3.mrr - 0.5).abs() < EPS);
        assert!((at3.average_precision - 0.5).abs() < EPS);
        assert!((at3.ndcg - 1.0 / 3f64.log2()).abs() < EPS);
    }

    #[test]
    fn test_all_relevant() {
        let l = labels(&[1, 1, 1, 1, 1]);
        for value in CutoffMetrics::compute(&l, 5).values() {
            assert!((value - 1.0).abs() < EPS);
        }
    }

    #[test]
    fn test_all_irrelevant() {
        let l = labels(&[0, 0, 0, 0, 0]);
        assert_eq!(CutoffMetrics::compute(&l, 5).values(), [0.0; 5]);
    }

    #[test]
    fn test_average_precision_uses_found_relevant_count() {
        // Classic AP with 3 relevant records would give 1/3; here only the
        // single relevant result inside the cutoff counts.
        let l = labels(&[1, 0, 0, 0, 0]);
        assert!((average_precision_at_k(&l, 5) - 1.0).abs() < EPS);
    }

    #[test]
    fn test_metrics_are_bounded() {
        for mask in 0u8..32 {
            let l: Vec<bool> = (0..5).map(|i| mask & (1 << i) != 0).collect();
            for k in [1, 3, 5] {
                for value in CutoffMetrics::compute(&l, k).values() {
                    assert!((0.0..=1.0 + EPS).contains(&value), "mask={} k={}", mask, k);
                }
            }
        }
    }

    #[test]
    fn test_zero_cutoff() {
        let l = labels(&[1, 1]);
        assert_eq!(CutoffMetrics::compute(&l, 0).values(), [0.0; 5]);
    }
}

use reciperank_common::{AppConfig, ReciperankError, Result};
use tracing::{debug, info};

use crate::labels::LabelledQuery;
use crate::metrics::CutoffMetrics;
use crate::report::{MetricsReport, QueryMetrics};

/// Computes per-query and macro-averaged metrics for a fixed K and cutoff set
#[derive(Debug, Clone)]
pub struct MetricsEvaluator {
    top_k: usize,
    cutoffs: Vec<usize>,
}

impl MetricsEvaluator {
    /// Every cutoff must lie in `1..=top_k`
    pub fn new(top_k: usize, cutoffs: Vec<usize>) -> Result<Self> {
        if top_k == 0 {
            return Err(ReciperankError::config("top_k must be at least 1"));
        }
        if cutoffs.is_empty() {
            return Err(ReciperankError::config("at least one cutoff is required"));
        }
        if let Some(&bad) = cutoffs.iter().find(|&&k| k == 0 || k > top_k) {
            return Err(ReciperankError::config(format!(
                "cutoff {} outside 1..={}",
                bad, top_k
            )));
        }

        Ok(Self { top_k, cutoffs })
    }

    pub fn from_app_config(config: &AppConfig) -> Result<Self> {
        Self::new(config.top_k, config.cutoffs.clone())
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn cutoffs(&self) -> &[usize] {
        &self.cutoffs
    }

    /// Metrics for one query at every cutoff.
    ///
    /// The label vector must hold exactly `top_k` judgments.
    pub fn evaluate_query(&self, query: &LabelledQuery) -> Result<QueryMetrics> {
        if query.labels.len() != self.top_k {
            return Err(ReciperankError::label_length(
                &query.query_id,
                self.top_k,
                query.labels.len(),
            ));
        }

        let metrics = self
            .cutoffs
            .iter()
            .map(|&k| CutoffMetrics::compute(&query.labels, k))
            .collect();
        debug!("Evaluated query {}", query.query_id);

        Ok(QueryMetrics {
            query_id: query.query_id.clone(),
            metrics,
        })
    }

    /// Evaluate every query in input order; fails on the first bad label vector
    pub fn evaluate(&self, queries: &[LabelledQuery]) -> Result<MetricsReport> {
        let per_query = queries
            .iter()
            .map(|q| self.evaluate_query(q))
            .collect::<Result<Vec<_>>>()?;
        let macro_average = macro_average(&per_query, &self.cutoffs);

        info!(
            "Evaluated {} queries at cutoffs {:?}",
            per_query.len(),
            self.cutoffs
        );

        Ok(MetricsReport {
            top_k: self.top_k,
            cutoffs: self.cutoffs.clone(),
            num_queries: per_query.len(),
            per_query,
            macro_average,
        })
    }
}

/// Arithmetic mean of every metric at every cutoff, equal weight per query.
///
/// An empty query set averages to all zeros.
pub fn macro_average(per_query: &[QueryMetrics], cutoffs: &[usize]) -> Vec<CutoffMetrics> {
    let n = per_query.len().max(1) as f64;

    cutoffs
        .iter()
        .enumerate()
        .map(|(slot, &k)| {
            let sums = per_query
                .iter()
                .filter_map(|q| q.metrics.get(slot))
                .fold([0.0f64; 5], |mut acc, m| {
                    for (total, value) in acc.iter_mut().zip(m.values()) {
                        *total += value;
                    }
                    acc
                });

            CutoffMetrics {
                k,
                precision: sums[0] / n,
                hit_rate: sums[1] / n,
                mrr: sums[2] / n,
                average_precision: sums[3] / n,
                ndcg: sums[4] / n,
            }
        })
        .collect()
}

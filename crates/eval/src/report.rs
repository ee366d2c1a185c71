use chrono::{DateTime, Utc};
use reciperank_common::Result;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

use crate::metrics::CutoffMetrics;

/// Metrics for one query, one entry per cutoff
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryMetrics {
    pub query_id: String,
    pub metrics: Vec<CutoffMetrics>,
}

/// Evaluation output; a pure function of the labels and cutoffs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsReport {
    pub top_k: usize,
    pub cutoffs: Vec<usize>,
    pub num_queries: usize,

    /// In label-file order
    pub per_query: Vec<QueryMetrics>,

    /// One entry per cutoff
    pub macro_average: Vec<CutoffMetrics>,
}

/// (column prefix, summary label) in `CutoffMetrics::values` order
const METRIC_COLUMNS: [(&str, &str); 5] = [
    ("P", "PRECISION"),
    ("HR", "HIT_RATE"),
    ("MRR", "MRR"),
    ("AP", "MAP"),
    ("NDCG", "NDCG"),
];

const RULE_WIDTH: usize = 60;

impl MetricsReport {
    /// Tab-separated per-query table followed by the macro-average summary.
    ///
    /// Columns are grouped by metric, then by cutoff; values use 3 decimals.
    pub fn render_table(&self) -> String {
        let rule = "-".repeat(RULE_WIDTH);
        let mut out = String::new();

        let _ = writeln!(out, "Per-query metrics");
        let _ = writeln!(out, "{}", rule);

        let mut header = vec!["query_id".to_string()];
        for (prefix, _) in METRIC_COLUMNS {
            header.extend(self.cutoffs.iter().map(|k| format!("{}@{}", prefix, k)));
        }
        let _ = writeln!(out, "{}", header.join("\t"));

        for query in &self.per_query {
            let mut row = vec![query.query_id.clone()];
            for metric in 0..METRIC_COLUMNS.len() {
                row.extend(
                    query
                        .metrics
                        .iter()
                        .map(|m| format!("{:.3}", m.values()[metric])),
                );
            }
            let _ = writeln!(out, "{}", row.join("\t"));
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "Macro-average summary");
        let _ = writeln!(out, "{}", rule);

        let width = METRIC_COLUMNS
            .iter()
            .map(|(_, label)| label.len())
            .max()
            .unwrap_or(0);
        for (metric, (_, label)) in METRIC_COLUMNS.iter().enumerate() {
            let values: Vec<String> = self
                .macro_average
                .iter()
                .map(|m| format!("@{}={:.3}", m.k, m.values()[metric]))
                .collect();
            let _ = writeln!(out, "{:<width$}: {}", label, values.join(", "), width = width);
        }

        out
    }
}

/// Human-readable metric definitions
pub const METRIC_DEFINITIONS: [(&str, &str); 5] = [
    (
        "Precision@k",
        "Fraction of the top k results that are relevant.",
    ),
    (
        "HitRate@k",
        "1 if at least one of the top k results is relevant, otherwise 0.",
    ),
    (
        "MRR@k",
        "Reciprocal rank of the first relevant result within the top k, 0 if none.",
    ),
    (
        "AP@k",
        "Mean of Precision@i over every relevant rank i <= k, divided by the number of relevant results found in the top k (not the total relevant count).",
    ),
    (
        "NDCG@k",
        "DCG@k with binary gain and log2(i + 1) discount, divided by the DCG of the same top-k labels sorted relevant-first.",
    ),
];

pub fn render_definitions() -> String {
    let width = METRIC_DEFINITIONS
        .iter()
        .map(|(name, _)| name.len())
        .max()
        .unwrap_or(0);

    let mut out = String::from("Metric definitions\n");
    out.push_str(&"-".repeat(RULE_WIDTH));
    out.push('\n');
    for (name, text) in METRIC_DEFINITIONS {
        let _ = writeln!(out, "{:<width$}  {}", name, text, width = width);
    }
    out
}

/// JSON file wrapper around a report
#[derive(Debug, Clone, Serialize)]
pub struct ReportDocument<'a> {
    pub generated_at: DateTime<Utc>,

    /// Label file the report was computed from
    pub source: String,

    #[serde(flatten)]
    pub report: &'a MetricsReport,
}

impl<'a> ReportDocument<'a> {
    pub fn new(source: impl Into<String>, report: &'a MetricsReport) -> Self {
        Self {
            generated_at: Utc::now(),
            source: source.into(),
            report,
        }
    }

    /// Write pretty JSON, creating parent directories as needed
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!("Metrics report written to {}", path.display());
        Ok(())
    }
}

pub mod evaluator;
pub mod labels;
pub mod metrics;
pub mod report;

pub use evaluator::{macro_average, MetricsEvaluator};
pub use labels::{load_labels, parse_labels, LabelledQuery};
pub use metrics::{
    average_precision_at_k, dcg_at_k, hit_rate_at_k, mrr_at_k, ndcg_at_k, precision_at_k,
    CutoffMetrics,
};
pub use report::{render_definitions, MetricsReport, QueryMetrics, ReportDocument, METRIC_DEFINITIONS};

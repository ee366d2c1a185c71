//! Relevance judgment loading
//!
//! Judgment files are arrays of query blocks, optionally wrapped in an
//! object under `queries`, `results` or `data` (checked in that order):
//!
//! ```json
//! [{ "query_id": 1, "results": [{ "rank": 1, "valid": 1 }, ...] }]
//! ```

use reciperank_common::{JsonId, ReciperankError, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// Binary labels for one query, aligned to ranks 1..=n
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelledQuery {
    pub query_id: String,
    pub labels: Vec<bool>,
}

impl LabelledQuery {
    pub fn new(query_id: impl Into<String>, labels: Vec<bool>) -> Self {
        Self {
            query_id: query_id.into(),
            labels,
        }
    }
}

/// Accepted top-level document shapes
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LabelDocument {
    List(Vec<Value>),
    Queries { queries: Vec<Value> },
    Results { results: Vec<Value> },
    Data { data: Vec<Value> },
}

impl LabelDocument {
    fn into_items(self) -> Vec<Value> {
        match self {
            Self::List(items)
            | Self::Queries { queries: items }
            | Self::Results { results: items }
            | Self::Data { data: items } => items,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawLabelledQuery {
    query_id: Option<JsonId>,
    results: Option<Vec<RawJudgment>>,
}

#[derive(Debug, Deserialize)]
struct RawJudgment {
    rank: Option<u64>,
    valid: Option<Validity>,
}

/// `valid` may be written as 0/1 or as a boolean
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Validity {
    Flag(bool),
    Number(i64),
}

impl Validity {
    fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Flag(flag) => Some(flag),
            Self::Number(0) => Some(false),
            Self::Number(1) => Some(true),
            Self::Number(_) => None,
        }
    }
}

fn resolve_query(position: usize, value: Value) -> Result<LabelledQuery> {
    let position_subject = format!("query block #{}", position);
    let raw: RawLabelledQuery = serde_json::from_value(value)
        .map_err(|e| ReciperankError::schema(&position_subject, e.to_string()))?;

    let query_id: String = raw
        .query_id
        .map(String::from)
        .ok_or_else(|| ReciperankError::schema(&position_subject, "missing field `query_id`"))?;
    let subject = format!("query {}", query_id);

    let mut judgments = raw
        .results
        .ok_or_else(|| ReciperankError::schema(&subject, "missing field `results`"))?;

    let ranked = judgments.iter().filter(|j| j.rank.is_some()).count();
    if ranked == judgments.len() {
        // stable: equal ranks keep file order
        judgments.sort_by_key(|j| j.rank);
    } else if ranked != 0 {
        return Err(ReciperankError::schema(
            &subject,
            "either every result or no result must carry a `rank`",
        ));
    }

    let labels = judgments
        .iter()
        .enumerate()
        .map(|(i, judgment)| {
            let validity = judgment.valid.as_ref().ok_or_else(|| {
                ReciperankError::schema(&subject, format!("result #{} missing field `valid`", i))
            })?;
            validity.as_bool().ok_or_else(|| {
                ReciperankError::schema(&subject, format!("result #{} `valid` must be 0 or 1", i))
            })
        })
        .collect::<Result<Vec<bool>>>()?;

    Ok(LabelledQuery { query_id, labels })
}

/// Parse a judgment document; output keeps file order
pub fn parse_labels(data: &str) -> Result<Vec<LabelledQuery>> {
    let document: LabelDocument = serde_json::from_str(data).map_err(|_| {
        ReciperankError::schema(
            "labels",
            "expected a list of query blocks, or an object with a `queries`, `results` or `data` list",
        )
    })?;

    let mut seen = HashSet::new();
    let mut queries = Vec::new();
    for (position, value) in document.into_items().into_iter().enumerate() {
        let query = resolve_query(position, value)?;
        if !seen.insert(query.query_id.clone()) {
            return Err(ReciperankError::schema(
                format!("query {}", query.query_id),
                "duplicate query id",
            ));
        }
        queries.push(query);
    }

    Ok(queries)
}

/// Load judgment file
pub fn load_labels(path: &Path) -> Result<Vec<LabelledQuery>> {
    let data = std::fs::read_to_string(path)?;
    let queries = parse_labels(&data)?;
    info!("Loaded labels for {} queries from {}", queries.len(), path.display());
    Ok(queries)
}

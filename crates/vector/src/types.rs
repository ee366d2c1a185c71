use reciperank_common::Recipe;
use serde::Serialize;

/// Index-level search hit
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Insertion position inside the index
    pub position: usize,

    /// Record ID
    pub record_id: String,

    /// Cosine similarity (-1.0 to 1.0)
    pub score: f32,
}

/// Flat retrieval result row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub query_id: String,

    /// 1-based, contiguous
    pub rank: usize,

    pub score: f32,
    pub record_id: String,
}

/// Ranked recipe as written to the retrieval output file
#[derive(Debug, Clone, Serialize)]
pub struct RankedRecipe {
    pub rank: usize,
    pub score: f32,
    pub recipe: Recipe,
}

/// Retrieval output for one query
#[derive(Debug, Clone, Serialize)]
pub struct QueryResults {
    pub dataset: String,
    pub query_id: String,
    pub query: String,

    /// Sorted by ascending rank
    pub results: Vec<RankedRecipe>,
}

impl QueryResults {
    /// Flat (query_id, rank, score, record_id) view
    pub fn retrieval_results(&self) -> Vec<RetrievalResult> {
        self.results
            .iter()
            .map(|r| RetrievalResult {
                query_id: self.query_id.clone(),
                rank: r.rank,
                score: r.score,
                record_id: r.recipe.id.clone(),
            })
            .collect()
    }
}

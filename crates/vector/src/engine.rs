use futures::stream::{self, StreamExt, TryStreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use reciperank_common::{AppConfig, Query, Recipe, ReciperankError, Result};
use reciperank_embed::EmbeddingProvider;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::index::VectorIndex;
use crate::types::{QueryResults, RankedRecipe};

/// Retrieval engine settings
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Results per query (K)
    pub top_k: usize,

    /// Maximum in-flight embedding requests
    pub concurrency: usize,

    /// Draw a progress bar while encoding the corpus
    pub show_progress: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            concurrency: 8,
            show_progress: false,
        }
    }
}

impl RetrievalConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            top_k: config.top_k,
            concurrency: config.concurrency,
            show_progress: true,
        }
    }
}

/// Text embedded for a recipe: title, ingredients, instructions
pub fn retrieval_text(recipe: &Recipe) -> String {
    format!(
        "{} {} {}",
        recipe.title,
        recipe.ingredients.join(" "),
        recipe.instructions.joined()
    )
}

/// Retrieval engine over one corpus
///
/// Construction embeds the corpus and builds the index exactly once; the
/// engine exposes no way to rebuild or mutate it, so every query observes
/// the same index.
pub struct RetrievalEngine {
    dataset: String,
    provider: Arc<dyn EmbeddingProvider>,
    index: Arc<VectorIndex>,
    corpus: Arc<[Recipe]>,
    config: RetrievalConfig,
}

impl RetrievalEngine {
    /// Embed every recipe and build the index
    pub async fn build(
        dataset: impl Into<String>,
        corpus: Vec<Recipe>,
        provider: Arc<dyn EmbeddingProvider>,
        config: RetrievalConfig,
    ) -> Result<Self> {
        let dataset = dataset.into();
        if corpus.is_empty() {
            return Err(ReciperankError::schema(
                format!("dataset {}", dataset),
                "corpus contains no records",
            ));
        }

        info!(
            "Encoding {} recipes for {} (model={})",
            corpus.len(),
            dataset,
            provider.model_id()
        );

        let progress = if config.show_progress {
            ProgressBar::new(corpus.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{bar:40}] {pos}/{len} ({eta})")
                .map_err(|e| anyhow::anyhow!("Invalid progress template: {}", e))?
                .progress_chars("=> "),
        );
        progress.set_message(format!("Encoding {}", dataset));

        let mut embedded: Vec<(usize, Vec<f32>)> = stream::iter(corpus.iter().enumerate())
            .map(|(position, recipe)| {
                let provider = Arc::clone(&provider);
                let text = retrieval_text(recipe);
                async move { provider.embed(&text).await.map(|v| (position, v)) }
            })
            .buffer_unordered(config.concurrency.max(1))
            .inspect_ok(|_| progress.inc(1))
            .try_collect()
            .await?;
        progress.finish_and_clear();

        // Restore corpus order: it defines index positions and tie-breaking
        embedded.sort_by_key(|(position, _)| *position);

        let dimension = embedded.first().map(|(_, v)| v.len()).unwrap_or_default();
        debug!("Embedding dimension: {}", dimension);

        let entries = corpus
            .iter()
            .zip(embedded)
            .map(|(recipe, (_, vector))| (recipe.id.clone(), vector))
            .collect();
        let index = VectorIndex::build(provider.model_id(), dimension, entries)?;
        info!("Index fingerprint for {}: {}", dataset, index.fingerprint());

        Ok(Self {
            dataset,
            provider,
            index: Arc::new(index),
            corpus: corpus.into(),
            config,
        })
    }

    /// Dataset name
    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    /// Built index
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Corpus in index order
    pub fn corpus(&self) -> &[Recipe] {
        &self.corpus
    }

    /// Retrieve the top-K recipes for one query
    pub async fn search(&self, query: &Query) -> Result<QueryResults> {
        let vector = self.provider.embed(&query.text).await?;
        let hits = self.index.search_for(&query.id, &vector, self.config.top_k)?;

        if hits.len() < self.config.top_k {
            warn!(
                "Query {} returned {} results, fewer than top_k={}",
                query.id,
                hits.len(),
                self.config.top_k
            );
        }

        let results = hits
            .into_iter()
            .enumerate()
            .map(|(i, hit)| RankedRecipe {
                rank: i + 1,
                score: hit.score,
                recipe: self.corpus[hit.position].clone(),
            })
            .collect();

        Ok(QueryResults {
            dataset: self.dataset.clone(),
            query_id: query.id.clone(),
            query: query.text.clone(),
            results,
        })
    }

    /// Retrieve for every query concurrently; output keeps input order
    pub async fn run(&self, queries: &[Query]) -> Result<Vec<QueryResults>> {
        info!("Running retrieval for {} queries on {}", queries.len(), self.dataset);

        let mut results: Vec<(usize, QueryResults)> = stream::iter(queries.iter().enumerate())
            .map(|(i, query)| async move { self.search(query).await.map(|r| (i, r)) })
            .buffer_unordered(self.config.concurrency.max(1))
            .try_collect()
            .await?;

        results.sort_by_key(|(i, _)| *i);
        Ok(results.into_iter().map(|(_, r)| r).collect())
    }
}

/// Write retrieval output as pretty JSON, creating the parent directory
pub async fn save_results(path: &Path, results: &[QueryResults]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let data = serde_json::to_string_pretty(results)?;
    tokio::fs::write(path, data).await?;
    info!("Saved results to {}", path.display());
    Ok(())
}

use ndarray::{Array2, ArrayView1};
use reciperank_common::{ReciperankError, Result};
use sha2::{Digest, Sha256};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};
use tracing::{debug, info};

use crate::similarity::{dot, normalized};
use crate::types::SearchHit;

/// Exact inner-product index over unit-norm vectors.
///
/// Built once from a closed set of entries and never mutated afterwards, so
/// it can be shared between any number of concurrent readers. Row `i` of the
/// matrix belongs to the entry inserted at position `i`.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    ids: Vec<String>,
    vectors: Array2<f32>,
    model_id: String,
}

impl VectorIndex {
    /// Build the index from `(id, vector)` entries in insertion order.
    ///
    /// Every vector must have `dimension` components and a non-zero norm;
    /// ids must be unique.
    pub fn build(
        model_id: impl Into<String>,
        dimension: usize,
        entries: Vec<(String, Vec<f32>)>,
    ) -> Result<Self> {
        if dimension == 0 {
            return Err(ReciperankError::config("index dimension must be at least 1"));
        }

        let mut ids = Vec::with_capacity(entries.len());
        let mut seen = HashSet::with_capacity(entries.len());
        let mut data = Vec::with_capacity(entries.len() * dimension);

        for (id, vector) in entries {
            if vector.len() != dimension {
                return Err(ReciperankError::dimension(
                    format!("record {}", id),
                    dimension,
                    vector.len(),
                ));
            }
            if !seen.insert(id.clone()) {
                return Err(ReciperankError::schema(
                    format!("record {}", id),
                    "duplicate id in index entries",
                ));
            }

            data.extend(normalized(&id, &vector)?);
            ids.push(id);
        }

        let vectors = Array2::from_shape_vec((ids.len(), dimension), data)
            .map_err(|e| anyhow::anyhow!("Failed to shape index matrix: {}", e))?;

        let index = Self {
            ids,
            vectors,
            model_id: model_id.into(),
        };
        info!(
            "Vector index built - {} entries, dimension {}, model {}",
            index.len(),
            dimension,
            index.model_id
        );
        Ok(index)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Vector dimension D
    pub fn dimension(&self) -> usize {
        self.vectors.ncols()
    }

    /// Embedding model the vectors came from
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Stored (normalized) vector at an insertion position
    pub fn vector_at(&self, position: usize) -> Option<ArrayView1<'_, f32>> {
        (position < self.len()).then(|| self.vectors.row(position))
    }

    /// SHA-256 over model id, ids and the stored vector bits
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.model_id.as_bytes());
        hasher.update((self.dimension() as u64).to_le_bytes());
        for id in &self.ids {
            hasher.update(id.as_bytes());
            hasher.update([0u8]);
        }
        for value in self.vectors.iter() {
            hasher.update(value.to_bits().to_le_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// Top-`k` entries by cosine similarity to `query`.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        self.search_for("query", query, k)
    }

    /// [`search`](Self::search) with `query_id` used in error messages.
    ///
    /// Results are sorted by descending score, ties broken by ascending
    /// insertion position. When `k` exceeds the index size every entry is
    /// returned (short read, not an error).
    pub fn search_for(&self, query_id: &str, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dimension() {
            return Err(ReciperankError::dimension(
                format!("query {}", query_id),
                self.dimension(),
                query.len(),
            ));
        }
        let query = normalized(query_id, query)?;
        let query = ArrayView1::from(&query[..]);

        if k > self.len() {
            debug!(
                "Short read for query {}: k={} exceeds index size {}",
                query_id,
                k,
                self.len()
            );
        }
        let k = k.min(self.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        // Min-heap of the best k seen so far; the root is the current worst
        let mut heap: BinaryHeap<Reverse<Candidate>> = BinaryHeap::with_capacity(k + 1);
        for (position, row) in self.vectors.outer_iter().enumerate() {
            // f32 rounding can overshoot 1.0 by an ulp; + 0.0 folds -0.0
            // into 0.0 so signed zeros tie
            let candidate = Candidate {
                score: dot(row, query).clamp(-1.0, 1.0) + 0.0,
                position,
            };

            if heap.len() < k {
                heap.push(Reverse(candidate));
            } else if let Some(Reverse(worst)) = heap.peek() {
                if candidate > *worst {
                    heap.pop();
                    heap.push(Reverse(candidate));
                }
            }
        }

        let mut best: Vec<Candidate> = heap.into_iter().map(|Reverse(c)| c).collect();
        best.sort_unstable_by(|a, b| b.cmp(a));

        Ok(best
            .into_iter()
            .map(|c| SearchHit {
                position: c.position,
                record_id: self.ids[c.position].clone(),
                score: c.score,
            })
            .collect())
    }
}

/// Scored row; ordered so that "greater" means "ranks earlier"
#[derive(Debug, Clone, Copy)]
struct Candidate {
    score: f32,
    position: usize,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.position.cmp(&self.position))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

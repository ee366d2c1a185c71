//! Reciperank Vector Search Engine
//!
//! Exact cosine-similarity index and the retrieval engine built on it

mod engine;
mod index;
mod similarity;
mod types;

pub use engine::{retrieval_text, save_results, RetrievalConfig, RetrievalEngine};
pub use index::VectorIndex;
pub use similarity::{l2_norm, normalized};
pub use types::{QueryResults, RankedRecipe, RetrievalResult, SearchHit};

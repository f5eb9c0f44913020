//! Vector store abstraction for Pitwall.
//!
//! Vectors live in named namespaces, one per data source, so searches can be
//! limited to a single source or run across all of them.

mod memory;
mod pinecone;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use pinecone::PineconeStore;
pub use sqlite::SqliteVectorStore;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

/// An embedded chunk ready to be stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: Map<String, Value>,
}

/// A stored vector matched by a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchMatch {
    pub id: String,
    /// Cosine similarity to the query, in [-1, 1].
    pub score: f32,
    pub namespace: String,
    pub metadata: Map<String, Value>,
}

/// Per-namespace statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceStats {
    pub vector_count: u64,
}

/// Whole-index statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_vectors: u64,
    /// Vector length, if known.
    pub dimension: Option<usize>,
    pub namespaces: BTreeMap<String, NamespaceStats>,
}

impl IndexStats {
    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.namespaces.contains_key(namespace)
    }
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace vectors in a namespace. Returns the number written.
    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<usize>;

    /// Nearest neighbours by cosine similarity, best first.
    ///
    /// `None` searches every namespace. Equal scores keep the store's native order.
    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        namespace: Option<&str>,
    ) -> Result<Vec<SearchMatch>>;

    /// Remove every vector in a namespace. Removing an absent namespace succeeds.
    async fn delete_namespace(&self, namespace: &str) -> Result<()>;

    /// Vector counts per namespace.
    async fn stats(&self) -> Result<IndexStats>;

    /// Human-readable name of the backing index.
    fn index_name(&self) -> &str;
}

/// Deterministic vector id for a chunk, so re-ingesting a document overwrites
/// its previous vectors instead of duplicating them.
pub fn vector_id(namespace: &str, source_id: &str, sequence_index: usize) -> String {
    let name = format!("{}/{}/{}", namespace, source_id, sequence_index);
    Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes()).to_string()
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Order matches best first and keep `top_k`. The sort is stable, so equal
/// scores stay in the order they were produced.
pub fn rank_matches(mut matches: Vec<SearchMatch>, top_k: usize) -> Vec<SearchMatch> {
    matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    matches.truncate(top_k);
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: &str, score: f32) -> SearchMatch {
        SearchMatch {
            id: id.to_string(),
            score,
            namespace: "wikipedia".to_string(),
            metadata: Map::new(),
        }
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);

        assert_eq!(cosine_similarity(&a, &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_rank_matches_is_stable_for_ties() {
        let ranked = rank_matches(
            vec![hit("a", 0.5), hit("b", 0.9), hit("c", 0.5), hit("d", 0.7)],
            3,
        );
        let ids: Vec<&str> = ranked.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d", "a"]);
    }

    #[test]
    fn test_vector_id_is_deterministic() {
        let a = vector_id("wikipedia", "https://en.wikipedia.org/wiki/McLaren", 3);
        let b = vector_id("wikipedia", "https://en.wikipedia.org/wiki/McLaren", 3);
        let c = vector_id("wikipedia", "https://en.wikipedia.org/wiki/McLaren", 4);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}

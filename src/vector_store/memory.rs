//! In-memory vector store implementation.
//!
//! Useful for testing and offline demos.

use super::{
    cosine_similarity, rank_matches, IndexStats, NamespaceStats, SearchMatch, VectorRecord,
    VectorStore,
};
use crate::error::{PitwallError, Result, Stage};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// In-memory vector store. Records keep insertion order within a namespace.
pub struct MemoryVectorStore {
    namespaces: RwLock<BTreeMap<String, Vec<VectorRecord>>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            namespaces: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_error(e: impl std::fmt::Display) -> PitwallError {
    PitwallError::unavailable(Stage::VectorStore, format!("Failed to acquire lock: {}", e))
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<usize> {
        let mut namespaces = self.namespaces.write().map_err(lock_error)?;
        let stored = namespaces.entry(namespace.to_string()).or_default();

        for record in records {
            match stored.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record.clone(),
                None => stored.push(record.clone()),
            }
        }
        Ok(records.len())
    }

    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        namespace: Option<&str>,
    ) -> Result<Vec<SearchMatch>> {
        let namespaces = self.namespaces.read().map_err(lock_error)?;

        let matches: Vec<SearchMatch> = namespaces
            .iter()
            .filter(|(name, _)| namespace.map_or(true, |ns| ns == name.as_str()))
            .flat_map(|(name, records)| {
                records.iter().map(move |record| SearchMatch {
                    id: record.id.clone(),
                    score: cosine_similarity(query, &record.values),
                    namespace: name.clone(),
                    metadata: record.metadata.clone(),
                })
            })
            .collect();

        Ok(rank_matches(matches, top_k))
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<()> {
        let mut namespaces = self.namespaces.write().map_err(lock_error)?;
        namespaces.remove(namespace);
        Ok(())
    }

    async fn stats(&self) -> Result<IndexStats> {
        let namespaces = self.namespaces.read().map_err(lock_error)?;

        let mut stats = IndexStats::default();
        for (name, records) in namespaces.iter().filter(|(_, r)| !r.is_empty()) {
            let count = records.len() as u64;
            stats.total_vectors += count;
            stats.dimension = stats.dimension.or(records.first().map(|r| r.values.len()));
            stats
                .namespaces
                .insert(name.clone(), NamespaceStats { vector_count: count });
        }
        Ok(stats)
    }

    fn index_name(&self) -> &str {
        "memory"
    }
}

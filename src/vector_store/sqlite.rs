//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity.
//! Suitable for a local knowledge base; the hosted index is the production store.

use super::{
    cosine_similarity, rank_matches, IndexStats, NamespaceStats, SearchMatch, VectorRecord,
    VectorStore,
};
use crate::error::{PitwallError, Result, Stage};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS vectors (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        namespace TEXT NOT NULL,
        id TEXT NOT NULL,
        embedding BLOB NOT NULL,
        metadata TEXT NOT NULL,
        UNIQUE(namespace, id)
    );

    CREATE INDEX IF NOT EXISTS idx_vectors_namespace ON vectors(namespace);
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
    name: String,
}

impl SqliteVectorStore {
    /// Open (or create) a store at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
            name: path.display().to_string(),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
            name: ":memory:".to_string(),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            PitwallError::unavailable(Stage::VectorStore, format!("Failed to acquire lock: {}", e))
        })
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn write_rows(&self, namespace: &str, records: &[VectorRecord]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for record in records {
            // ON CONFLICT keeps the original row, and with it the insertion order
            tx.execute(
                r#"
                INSERT INTO vectors (namespace, id, embedding, metadata)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(namespace, id) DO UPDATE SET
                    embedding = excluded.embedding,
                    metadata = excluded.metadata
                "#,
                params![
                    namespace,
                    record.id,
                    Self::embedding_to_bytes(&record.values),
                    serde_json::to_string(&record.metadata)?,
                ],
            )?;
        }

        tx.commit()?;
        Ok(records.len())
    }

    fn scan_rows(&self, query: &[f32], namespace: Option<&str>) -> Result<Vec<SearchMatch>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, namespace, embedding, metadata FROM vectors
            WHERE ?1 IS NULL OR namespace = ?1
            ORDER BY namespace, seq
            "#,
        )?;

        let rows = stmt.query_map(params![namespace], |row| {
            let id: String = row.get(0)?;
            let namespace: String = row.get(1)?;
            let embedding: Vec<u8> = row.get(2)?;
            let metadata: String = row.get(3)?;
            Ok((id, namespace, embedding, metadata))
        })?;

        let mut matches = Vec::new();
        for row in rows {
            let (id, namespace, embedding, metadata) = row?;
            let metadata: Map<String, Value> = serde_json::from_str(&metadata)?;
            matches.push(SearchMatch {
                id,
                score: cosine_similarity(query, &Self::bytes_to_embedding(&embedding)),
                namespace,
                metadata,
            });
        }
        Ok(matches)
    }

    fn delete_rows(&self, namespace: &str) -> Result<usize> {
        let conn = self.lock()?;
        Ok(conn.execute("DELETE FROM vectors WHERE namespace = ?1", params![namespace])?)
    }

    fn count_rows(&self) -> Result<IndexStats> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT namespace, COUNT(*), MAX(LENGTH(embedding)) FROM vectors GROUP BY namespace ORDER BY namespace",
        )?;
        let rows = stmt.query_map([], |row| {
            let namespace: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            let bytes: i64 = row.get(2)?;
            Ok((namespace, count, bytes))
        })?;

        let mut stats = IndexStats::default();
        for row in rows {
            let (namespace, count, bytes) = row?;
            stats.total_vectors += count as u64;
            stats.dimension = stats.dimension.or(Some(bytes as usize / 4));
            stats.namespaces.insert(
                namespace,
                NamespaceStats {
                    vector_count: count as u64,
                },
            );
        }
        Ok(stats)
    }
}

/// Database and metadata failures surface as an unavailable vector store.
fn store_error(err: PitwallError) -> PitwallError {
    match err {
        err @ PitwallError::ProviderUnavailable { .. } => err,
        other => PitwallError::unavailable(Stage::VectorStore, other.to_string()),
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<usize> {
        let written = self.write_rows(namespace, records).map_err(store_error)?;
        debug!("Upserted {} vectors into {}", written, namespace);
        Ok(written)
    }

    #[instrument(skip(self, query))]
    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        namespace: Option<&str>,
    ) -> Result<Vec<SearchMatch>> {
        let matches = self.scan_rows(query, namespace).map_err(store_error)?;
        Ok(rank_matches(matches, top_k))
    }

    #[instrument(skip(self))]
    async fn delete_namespace(&self, namespace: &str) -> Result<()> {
        let deleted = self.delete_rows(namespace).map_err(store_error)?;
        info!("Deleted {} vectors from {}", deleted, namespace);
        Ok(())
    }

    async fn stats(&self) -> Result<IndexStats> {
        self.count_rows().map_err(store_error)
    }

    fn index_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, values: Vec<f32>, title: &str) -> VectorRecord {
        let mut metadata = Map::new();
        metadata.insert("title".into(), title.into());
        VectorRecord {
            id: id.to_string(),
            values,
            metadata,
        }
    }

    #[tokio::test]
    async fn test_sqlite_vector_store() {
        let store = SqliteVectorStore::in_memory().unwrap();

        store
            .upsert(
                "wikipedia",
                &[
                    record("a", vec![1.0, 0.0, 0.0], "McLaren"),
                    record("b", vec![0.0, 1.0, 0.0], "Ferrari"),
                ],
            )
            .await
            .unwrap();
        store
            .upsert("ergast-drivers", &[record("c", vec![0.5, 0.5, 0.0], "Drivers 2024")])
            .await
            .unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_vectors, 3);
        assert_eq!(stats.dimension, Some(3));
        assert_eq!(stats.namespaces["wikipedia"].vector_count, 2);

        let results = store.search(&[1.0, 0.0, 0.0], 10, None).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].id, "a");
        assert!((results[0].score - 1.0).abs() < 0.001);
        assert_eq!(results[0].metadata["title"], "McLaren");

        let filtered = store
            .search(&[1.0, 0.0, 0.0], 10, Some("ergast-drivers"))
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].namespace, "ergast-drivers");

        store.delete_namespace("wikipedia").await.unwrap();
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_vectors, 1);
        assert!(!stats.has_namespace("wikipedia"));
    }

    #[tokio::test]
    async fn test_upsert_overwrites_same_id() {
        let store = SqliteVectorStore::in_memory().unwrap();
        store
            .upsert("ns", &[record("a", vec![1.0, 0.0], "old")])
            .await
            .unwrap();
        store
            .upsert("ns", &[record("a", vec![0.0, 1.0], "new")])
            .await
            .unwrap();

        let results = store.search(&[0.0, 1.0], 5, Some("ns")).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].metadata["title"], "new");
    }

    #[tokio::test]
    async fn test_database_failures_are_store_unavailable() {
        let store = SqliteVectorStore::in_memory().unwrap();
        store
            .lock()
            .unwrap()
            .execute_batch("DROP TABLE vectors;")
            .unwrap();

        let err = store.search(&[1.0, 0.0], 5, None).await.unwrap_err();
        assert_eq!(err.kind(), "provider_unavailable");
        assert_eq!(err.stage(), Some(Stage::VectorStore));
        assert!(err.to_string().contains("no such table"));

        let err = store.stats().await.unwrap_err();
        assert_eq!(err.kind(), "provider_unavailable");

        let err = store
            .upsert("ns", &[record("a", vec![1.0, 0.0], "x")])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "provider_unavailable");
        assert!(store.delete_namespace("ns").await.is_err());
    }

    #[test]
    fn test_embedding_bytes_round_trip() {
        let embedding = vec![0.25_f32, -1.5, 3.0];
        let bytes = SqliteVectorStore::embedding_to_bytes(&embedding);
        assert_eq!(bytes.len(), 12);
        assert_eq!(SqliteVectorStore::bytes_to_embedding(&bytes), embedding);
    }
}

//! Ingestion pipeline: collect, chunk, embed, upsert.

use super::{
    Collected, DocumentSource, ErgastSource, IngestionResult, IngestionSource, RawDocument,
    WikipediaSource,
};
use crate::chunking::{Chunk, ChunkingConfig, WindowChunker};
use crate::config::IngestionSettings;
use crate::embedding::Embedder;
use crate::error::{PitwallError, Result, Stage};
use crate::vector_store::{vector_id, VectorRecord, VectorStore};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};

/// Chunk text stored alongside each vector is capped at this many chars.
const METADATA_TEXT_CHARS: usize = 3000;

/// Runs sources through the chunker and embedder into the vector store.
pub struct IngestionPipeline {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    chunker: WindowChunker,
    settings: IngestionSettings,
    http: reqwest::Client,
}

impl IngestionPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        chunking: ChunkingConfig,
        settings: IngestionSettings,
        http: reqwest::Client,
    ) -> Self {
        Self {
            embedder,
            store,
            chunker: WindowChunker::new(chunking),
            settings,
            http,
        }
    }

    /// Collectors for a requested source.
    pub fn sources(&self, source: IngestionSource) -> Vec<Box<dyn DocumentSource>> {
        let delay = Duration::from_millis(self.settings.scrape_delay_ms);
        let mut sources: Vec<Box<dyn DocumentSource>> = Vec::new();

        if source.includes_wikipedia() {
            sources.push(Box::new(WikipediaSource::new(
                self.http.clone(),
                &self.settings.wikipedia_api_url,
                delay,
                self.settings.scrape_retries,
            )));
        }

        let datasets = source.ergast_datasets();
        if !datasets.is_empty() {
            sources.push(Box::new(ErgastSource::new(
                self.http.clone(),
                &self.settings.ergast_base_url,
                self.settings.ergast_years.clone(),
                datasets,
                delay,
                self.settings.scrape_retries,
            )));
        }

        sources
    }

    /// Ingest a source end to end. Never fails as a whole; problems are listed
    /// in the result's `errors`.
    #[instrument(skip(self))]
    pub async fn run(&self, source: IngestionSource, force_refresh: bool) -> IngestionResult {
        let sources = self.sources(source);
        self.run_sources(source.as_str(), &sources, force_refresh).await
    }

    /// Ingest from explicit collectors, aggregating into one result.
    pub async fn run_sources(
        &self,
        label: &str,
        sources: &[Box<dyn DocumentSource>],
        force_refresh: bool,
    ) -> IngestionResult {
        let started = Instant::now();
        let mut result = IngestionResult {
            success: false,
            source: label.to_string(),
            documents_processed: 0,
            chunks_created: 0,
            vectors_upserted: 0,
            namespaces: Vec::new(),
            errors: Vec::new(),
            duration_seconds: 0.0,
        };
        let mut namespaces = BTreeSet::new();

        for source in sources {
            info!(source = source.name(), "Collecting documents");
            let Collected { documents, errors } = source.collect().await;
            result.errors.extend(errors);

            if documents.is_empty() {
                warn!(source = source.name(), "No documents collected");
                result
                    .errors
                    .push(format!("{}: no documents collected", source.name()));
                continue;
            }

            // Clear only once there is something to replace it with
            if force_refresh {
                for namespace in source.namespaces() {
                    if let Err(e) = self.store.delete_namespace(&namespace).await {
                        error!(%namespace, "Failed to clear namespace: {}", e);
                        result
                            .errors
                            .push(format!("Clearing namespace {}: {}", namespace, e));
                    }
                }
            }

            for doc in &documents {
                match self.ingest_document(doc).await {
                    Ok((chunks, upserted)) => {
                        result.documents_processed += 1;
                        result.chunks_created += chunks;
                        result.vectors_upserted += upserted;
                        namespaces.insert(doc.namespace.clone());
                    }
                    Err(e) => {
                        error!(
                            source = source.name(),
                            namespace = %doc.namespace,
                            stage = ?e.stage(),
                            "Failed to ingest {}: {}",
                            doc.title,
                            e
                        );
                        result.errors.push(format!("{} ({}): {}", doc.title, doc.source_id, e));
                    }
                }
            }
        }

        result.namespaces = namespaces.into_iter().collect();
        result.success = result.errors.is_empty();
        result.duration_seconds = (started.elapsed().as_secs_f64() * 100.0).round() / 100.0;

        info!(
            "Ingestion of {} complete: {} documents, {} chunks, {} vectors, {} errors",
            label,
            result.documents_processed,
            result.chunks_created,
            result.vectors_upserted,
            result.errors.len()
        );
        result
    }

    /// Chunk, embed and upsert a single document. Returns (chunks, upserted).
    async fn ingest_document(&self, doc: &RawDocument) -> Result<(usize, usize)> {
        let chunks: Vec<Chunk> = self.chunker.chunks(&doc.source_id, &doc.content).collect();
        if chunks.is_empty() {
            return Ok((0, 0));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_documents(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(PitwallError::unavailable(
                Stage::Embedding,
                format!("{} embeddings for {} chunks", embeddings.len(), chunks.len()),
            ));
        }

        let records: Vec<VectorRecord> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, values)| VectorRecord {
                id: vector_id(&doc.namespace, &doc.source_id, chunk.sequence_index),
                values,
                metadata: record_metadata(doc, chunk),
            })
            .collect();

        let upserted = self.store.upsert(&doc.namespace, &records).await?;
        info!(
            namespace = %doc.namespace,
            "Upserted {} vectors for {}",
            upserted,
            doc.title
        );
        Ok((chunks.len(), upserted))
    }
}

/// Flat metadata stored with a chunk's vector.
fn record_metadata(doc: &RawDocument, chunk: &Chunk) -> Map<String, Value> {
    let mut meta = chunk.metadata();
    meta.insert(
        "text".into(),
        chunk.text.chars().take(METADATA_TEXT_CHARS).collect::<String>().into(),
    );
    meta.insert("namespace".into(), doc.namespace.clone().into());
    meta.insert("source".into(), doc.source_id.clone().into());
    meta.insert("title".into(), doc.title.clone().into());
    meta.insert("category".into(), doc.category.clone().into());
    meta.insert("priority".into(), doc.priority.into());
    meta.insert("fetched_at".into(), doc.fetched_at.to_rfc3339().into());
    meta
}

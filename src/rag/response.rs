//! Answers, sources and metrics returned to callers.

use super::ResponseMode;
use crate::config::Settings;
use crate::error::{PitwallError, Stage};
use crate::vector_store::{NamespaceStats, SearchMatch};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

/// Metadata keys promoted to top-level `SourceDocument` fields.
const PROMOTED_KEYS: &[&str] = &["title", "source", "category", "namespace", "text"];

/// A retrieved chunk as shown to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceDocument {
    pub title: String,
    pub source_url: String,
    pub category: String,
    pub namespace: String,
    /// Cosine similarity to the question.
    pub similarity_score: f32,
    pub excerpt: String,
    /// Remaining stored metadata (tags, chunk offsets).
    pub metadata: Map<String, Value>,
}

impl SourceDocument {
    pub fn from_match(hit: &SearchMatch, excerpt_chars: usize) -> Self {
        let text = |key: &str, default: &str| {
            hit.metadata
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or(default)
                .to_string()
        };

        let namespace = match hit.metadata.get("namespace").and_then(Value::as_str) {
            Some(ns) => ns.to_string(),
            None => hit.namespace.clone(),
        };

        Self {
            title: text("title", "Unknown"),
            source_url: text("source", "Unknown"),
            category: text("category", "general"),
            namespace,
            similarity_score: hit.score,
            excerpt: text("text", "").chars().take(excerpt_chars).collect(),
            metadata: hit
                .metadata
                .iter()
                .filter(|(k, _)| !PROMOTED_KEYS.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

/// Per-request timings and retrieval figures.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub retrieval_latency_ms: Option<f64>,
    pub generation_latency_ms: Option<f64>,
    pub total_latency_ms: f64,
    pub tokens_estimated: u32,
    pub documents_retrieved: usize,
    /// Mean score over the returned sources; zero when there are none.
    pub avg_similarity_score: f32,
}

impl Metrics {
    /// Record the returned sources.
    pub fn record_sources(&mut self, sources: &[SourceDocument]) {
        self.documents_retrieved = sources.len();
        self.avg_similarity_score = if sources.is_empty() {
            0.0
        } else {
            let sum: f32 = sources.iter().map(|s| s.similarity_score).sum();
            ((sum / sources.len() as f32) * 10_000.0).round() / 10_000.0
        };
    }
}

/// Milliseconds rounded to two decimals.
pub fn millis(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 100_000.0).round() / 100.0
}

/// Machine-readable description of a failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPayload {
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
}

impl From<&PitwallError> for ErrorPayload {
    fn from(err: &PitwallError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
            stage: err.stage(),
        }
    }
}

/// The answer to one question in one mode.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    pub answer: String,
    pub mode: ResponseMode,
    /// Best first.
    pub sources: Vec<SourceDocument>,
    pub metrics: Metrics,
    /// Retrieved chunks placed in the prompt.
    pub context_used: usize,
    pub live_data_used: bool,
    /// Non-fatal problems worth telling the caller about.
    pub notices: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

impl ChatResponse {
    /// A failed exchange carrying whatever was gathered before the failure.
    pub fn failure(
        mode: ResponseMode,
        err: &PitwallError,
        sources: Vec<SourceDocument>,
        metrics: Metrics,
    ) -> Self {
        let answer = match err {
            PitwallError::ProviderUnavailable { stage, .. } => {
                format!("Sorry, the {} service is unavailable right now: {}", stage, err)
            }
            _ => format!("An error occurred: {}", err),
        };

        Self {
            success: false,
            answer,
            mode,
            sources,
            metrics,
            context_used: 0,
            live_data_used: false,
            notices: Vec::new(),
            error: Some(ErrorPayload::from(err)),
        }
    }
}

/// Grounded and ungrounded answers to the same question.
#[derive(Debug, Clone, Serialize)]
pub struct CompareResponse {
    pub question: String,
    pub rag_response: ChatResponse,
    pub direct_response: ChatResponse,
    pub total_latency_ms: f64,
}

/// Configuration echoed by the status report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusConfig {
    pub embedding_provider: String,
    pub embedding_model: String,
    pub embedding_dimensions: u32,
    pub llm_provider: String,
    pub llm_model: String,
    pub vector_store: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub max_top_k: usize,
    pub similarity_threshold: f32,
}

impl StatusConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            embedding_provider: settings.embedding.provider.to_string(),
            embedding_model: settings.embedding.model.clone(),
            embedding_dimensions: settings.embedding.dimensions,
            llm_provider: settings.llm.provider.to_string(),
            llm_model: settings.llm.model.clone(),
            vector_store: settings.vector_store.provider.to_string(),
            chunk_size: settings.chunking.chunk_size,
            chunk_overlap: settings.chunking.chunk_overlap,
            top_k: settings.retrieval.top_k,
            max_top_k: settings.retrieval.max_top_k,
            similarity_threshold: settings.retrieval.similarity_threshold,
        }
    }
}

/// Health of the backing services.
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    /// Whether the vector store answered a stats request.
    pub pinecone_connected: bool,
    pub llm_connected: bool,
    pub index_name: String,
    pub total_vectors: u64,
    pub namespaces: BTreeMap<String, NamespaceStats>,
    pub config: StatusConfig,
}

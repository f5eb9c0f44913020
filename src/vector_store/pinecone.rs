//! Pinecone vector store over the REST API.
//!
//! The data-plane host is taken from settings or resolved once through the
//! control plane, which also creates the index when it is missing.

use super::{rank_matches, IndexStats, NamespaceStats, SearchMatch, VectorRecord, VectorStore};
use crate::client::{api_key, create_http_client, ensure_success, send, send_json};
use crate::config::{PineconeSettings, ProviderSettings};
use crate::error::{PitwallError, Result, Stage};
use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::{RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

const API_VERSION: &str = "2024-07";

/// Polls of the control plane while a new index comes up.
const READY_POLLS: usize = 30;

/// Pinecone-backed vector store.
pub struct PineconeStore {
    client: reqwest::Client,
    api_key: String,
    settings: PineconeSettings,
    dimension: usize,
    max_retries: usize,
    host: OnceCell<String>,
}

impl PineconeStore {
    /// Create a store from settings, reading `PINECONE_API_KEY`.
    pub fn new(
        settings: &PineconeSettings,
        dimension: usize,
        providers: &ProviderSettings,
    ) -> Result<Self> {
        Self::with_api_key(api_key("PINECONE_API_KEY")?, settings, dimension, providers)
    }

    pub fn with_api_key(
        api_key: String,
        settings: &PineconeSettings,
        dimension: usize,
        providers: &ProviderSettings,
    ) -> Result<Self> {
        let host = OnceCell::new();
        if let Some(configured) = &settings.index_host {
            host.set(normalize_host(configured)).ok();
        }

        Ok(Self {
            client: create_http_client(Duration::from_secs(providers.request_timeout_secs))?,
            api_key,
            settings: settings.clone(),
            dimension,
            max_retries: providers.max_retries,
            host,
        })
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    fn control_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.settings.control_plane_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Data-plane base URL, resolving it on first use.
    async fn host(&self) -> Result<&str> {
        self.host
            .get_or_try_init(|| self.resolve_host())
            .await
            .map(String::as_str)
    }

    #[instrument(skip(self), fields(index = %self.settings.index_name))]
    async fn resolve_host(&self) -> Result<String> {
        if let Some(description) = self.describe_index().await? {
            if let Some(host) = description.host.filter(|h| !h.is_empty()) {
                info!("Resolved index host {}", host);
                return Ok(normalize_host(&host));
            }
        } else if self.settings.create_if_missing {
            self.create_index().await?;
        } else {
            return Err(PitwallError::NotFound(format!(
                "Pinecone index {}",
                self.settings.index_name
            )));
        }

        for _ in 0..READY_POLLS {
            if let Some(description) = self.describe_index().await? {
                let ready = description.status.map(|s| s.ready).unwrap_or(false);
                if let Some(host) = description.host.filter(|h| ready && !h.is_empty()) {
                    info!("Index ready at {}", host);
                    return Ok(normalize_host(&host));
                }
            }
            tokio::time::sleep(Duration::from_secs(2)).await;
        }

        Err(PitwallError::unavailable(
            Stage::VectorStore,
            format!("index {} did not become ready", self.settings.index_name),
        ))
    }

    async fn describe_index(&self) -> Result<Option<IndexDescription>> {
        let url = self.control_url(&format!("indexes/{}", self.settings.index_name));
        let resp = send(self.authed(self.client.get(url)), self.max_retries, Stage::VectorStore).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = ensure_success(resp, Stage::VectorStore, "describe index").await?;
        let description = resp
            .json()
            .await
            .map_err(|e| PitwallError::unavailable(Stage::VectorStore, e.to_string()))?;
        Ok(Some(description))
    }

    async fn create_index(&self) -> Result<()> {
        warn!(
            "Index {} not found, creating it ({} dims, cosine)",
            self.settings.index_name, self.dimension
        );
        let body = CreateIndexRequest {
            name: &self.settings.index_name,
            dimension: self.dimension,
            metric: "cosine",
            spec: IndexSpec {
                serverless: Serverless {
                    cloud: &self.settings.cloud,
                    region: &self.settings.region,
                },
            },
        };
        let request = self.authed(self.client.post(self.control_url("indexes")).json(&body));
        let resp = send(request, self.max_retries, Stage::VectorStore).await?;
        // Someone else created it first
        if resp.status() == StatusCode::CONFLICT {
            return Ok(());
        }
        ensure_success(resp, Stage::VectorStore, "create index").await?;
        Ok(())
    }

    async fn post<B: Serialize + Sync, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        what: &str,
    ) -> Result<T> {
        let url = format!("{}{}", self.host().await?, path);
        let request = self.authed(self.client.post(url).json(body));
        send_json(request, self.max_retries, Stage::VectorStore, what).await
    }

    async fn query_namespace(
        &self,
        query: &[f32],
        top_k: usize,
        namespace: &str,
    ) -> Result<Vec<SearchMatch>> {
        let body = QueryRequest {
            vector: query,
            top_k,
            namespace,
            include_metadata: true,
            include_values: false,
        };
        let response: QueryResponse = self.post("/query", &body, "query").await?;
        Ok(response.into_matches(namespace))
    }
}

/// Prefix a bare host name with a scheme.
fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

#[async_trait]
impl VectorStore for PineconeStore {
    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<usize> {
        let mut upserted = 0;
        for batch in records.chunks(self.settings.upsert_batch_size.max(1)) {
            let body = UpsertRequest {
                vectors: batch,
                namespace,
            };
            let response: UpsertResponse = self.post("/vectors/upsert", &body, "upsert").await?;
            upserted += response.upserted_count;
        }
        debug!("Upserted {} vectors into {}", upserted, namespace);
        Ok(upserted)
    }

    #[instrument(skip(self, query))]
    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        namespace: Option<&str>,
    ) -> Result<Vec<SearchMatch>> {
        if let Some(namespace) = namespace {
            return self.query_namespace(query, top_k, namespace).await;
        }

        // A query only covers one namespace, so fan out over all of them
        let stats = self.stats().await?;
        let per_namespace = try_join_all(
            stats
                .namespaces
                .keys()
                .map(|ns| self.query_namespace(query, top_k, ns)),
        )
        .await?;

        Ok(rank_matches(per_namespace.into_iter().flatten().collect(), top_k))
    }

    #[instrument(skip(self))]
    async fn delete_namespace(&self, namespace: &str) -> Result<()> {
        let url = format!("{}/vectors/delete", self.host().await?);
        let body = DeleteRequest {
            delete_all: true,
            namespace,
        };
        let resp = send(
            self.authed(self.client.post(url).json(&body)),
            self.max_retries,
            Stage::VectorStore,
        )
        .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            debug!("Namespace {} did not exist", namespace);
            return Ok(());
        }
        ensure_success(resp, Stage::VectorStore, "delete namespace").await?;
        info!("Deleted namespace {}", namespace);
        Ok(())
    }

    async fn stats(&self) -> Result<IndexStats> {
        let response: StatsResponse = self
            .post("/describe_index_stats", &serde_json::json!({}), "describe index stats")
            .await?;
        Ok(response.into())
    }

    fn index_name(&self) -> &str {
        &self.settings.index_name
    }
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    host: Option<String>,
    status: Option<IndexStatus>,
}

#[derive(Debug, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
}

#[derive(Debug, Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: usize,
    metric: &'static str,
    spec: IndexSpec<'a>,
}

#[derive(Debug, Serialize)]
struct IndexSpec<'a> {
    serverless: Serverless<'a>,
}

#[derive(Debug, Serialize)]
struct Serverless<'a> {
    cloud: &'a str,
    region: &'a str,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    namespace: &'a str,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    score: f32,
    #[serde(default)]
    metadata: Map<String, Value>,
}

impl QueryResponse {
    fn into_matches(self, namespace: &str) -> Vec<SearchMatch> {
        self.matches
            .into_iter()
            .map(|m| SearchMatch {
                id: m.id,
                score: m.score,
                namespace: namespace.to_string(),
                metadata: m.metadata,
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteRequest<'a> {
    delete_all: bool,
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    #[serde(default)]
    namespaces: BTreeMap<String, NamespaceSummary>,
    dimension: Option<usize>,
    #[serde(default)]
    total_vector_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceSummary {
    #[serde(default)]
    vector_count: u64,
}

impl From<StatsResponse> for IndexStats {
    fn from(response: StatsResponse) -> Self {
        IndexStats {
            total_vectors: response.total_vector_count,
            dimension: response.dimension,
            namespaces: response
                .namespaces
                .into_iter()
                .map(|(name, s)| {
                    (
                        name,
                        NamespaceStats {
                            vector_count: s.vector_count,
                        },
                    )
                })
                .collect(),
        }
    }
}

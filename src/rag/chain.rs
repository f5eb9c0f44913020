//! The retrieval/generation chain.

use super::context::{assemble_context, filter_matches};
use super::live::{needs_live_data, LiveDataSource};
use super::response::millis;
use super::{
    ChatRequest, ChatResponse, CompareResponse, Metrics, ResponseMode, SourceDocument,
    StatusConfig, SystemStatus,
};
use crate::config::{Prompts, RetrievalSettings};
use crate::embedding::Embedder;
use crate::error::{PitwallError, Result, Stage};
use crate::llm::LlmProvider;
use crate::vector_store::{IndexStats, VectorStore};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};

/// Default bound on a single provider call.
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Answers questions against the knowledge base.
pub struct RagChain {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn LlmProvider>,
    live: Option<Arc<dyn LiveDataSource>>,
    prompts: Prompts,
    retrieval: RetrievalSettings,
    call_timeout: Duration,
    status_config: StatusConfig,
}

/// What a rag exchange has gathered so far, reported if a later step fails.
#[derive(Default)]
struct Progress {
    sources: Vec<SourceDocument>,
    metrics: Metrics,
    notices: Vec<String>,
    live_data_used: bool,
}

impl RagChain {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn LlmProvider>,
        retrieval: RetrievalSettings,
    ) -> Self {
        Self {
            embedder,
            store,
            llm,
            live: None,
            prompts: Prompts::default(),
            retrieval,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            status_config: StatusConfig::default(),
        }
    }

    /// Consult a live data source for questions about the current session.
    pub fn with_live_data(mut self, live: Arc<dyn LiveDataSource>) -> Self {
        self.live = Some(live);
        self
    }

    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Bound every provider call made by the chain.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_status_config(mut self, config: StatusConfig) -> Self {
        self.status_config = config;
        self
    }

    pub fn default_top_k(&self) -> usize {
        self.retrieval.top_k
    }

    pub fn max_top_k(&self) -> usize {
        self.retrieval.max_top_k
    }

    /// Answer a request in its mode. Never fails; errors come back as an
    /// unsuccessful response.
    pub async fn chat(&self, request: &ChatRequest) -> ChatResponse {
        if let Err(e) = request.validate(self.retrieval.max_top_k) {
            warn!("Rejected request: {}", e);
            return ChatResponse::failure(request.mode, &e, Vec::new(), Metrics::default());
        }

        let top_k = request.top_k.unwrap_or(self.retrieval.top_k);
        match request.mode {
            ResponseMode::Rag => self.rag(&request.question, top_k, request.namespace()).await,
            ResponseMode::Direct => self.direct(&request.question).await,
            ResponseMode::Compare => {
                let mut response = self.rag(&request.question, top_k, request.namespace()).await;
                response.notices.push(
                    "Compare mode answers in rag mode here; use /compare for both answers."
                        .to_string(),
                );
                response
            }
        }
    }

    /// Answer grounded in retrieved context.
    #[instrument(skip(self, question))]
    pub async fn rag(&self, question: &str, top_k: usize, namespace: Option<&str>) -> ChatResponse {
        let started = Instant::now();
        let mut progress = Progress::default();

        match self.run_rag(question, top_k, namespace, started, &mut progress).await {
            Ok(response) => response,
            Err(e) => {
                error!(stage = ?e.stage(), namespace = ?namespace, "RAG query failed: {}", e);
                progress.metrics.total_latency_ms = millis(started.elapsed());
                let mut response = ChatResponse::failure(
                    ResponseMode::Rag,
                    &e,
                    progress.sources,
                    progress.metrics,
                );
                response.notices = progress.notices;
                response.live_data_used = progress.live_data_used;
                response
            }
        }
    }

    async fn run_rag(
        &self,
        question: &str,
        top_k: usize,
        namespace: Option<&str>,
        started: Instant,
        progress: &mut Progress,
    ) -> Result<ChatResponse> {
        let top_k = top_k.clamp(1, self.retrieval.max_top_k.max(1));

        let live = self.fetch_live(question, progress).await;

        let retrieval_started = Instant::now();
        if let Some(ns) = namespace {
            let stats = self.bounded(Stage::VectorStore, self.store.stats()).await?;
            if !stats.has_namespace(ns) {
                return Err(PitwallError::NotFound(format!("namespace '{}'", ns)));
            }
        }

        let query = self
            .bounded(Stage::Embedding, self.embedder.embed_query(question))
            .await?;
        let matches = self
            .bounded(Stage::VectorStore, self.store.search(&query, top_k, namespace))
            .await?;
        let retrieved = matches.len();
        let matches = filter_matches(matches, self.retrieval.similarity_threshold, top_k);

        progress.metrics.retrieval_latency_ms = Some(millis(retrieval_started.elapsed()));
        progress.sources = matches
            .iter()
            .map(|m| SourceDocument::from_match(m, self.retrieval.excerpt_chars))
            .collect();
        progress.metrics.record_sources(&progress.sources);
        info!(
            "Retrieved {} matches, {} above threshold {}",
            retrieved,
            matches.len(),
            self.retrieval.similarity_threshold
        );

        if matches.is_empty() && live.is_none() {
            progress.metrics.total_latency_ms = millis(started.elapsed());
            return Ok(ChatResponse {
                success: true,
                answer: self.prompts.rag.no_context_answer.clone(),
                mode: ResponseMode::Rag,
                sources: Vec::new(),
                metrics: std::mem::take(&mut progress.metrics),
                context_used: 0,
                live_data_used: false,
                notices: std::mem::take(&mut progress.notices),
                error: None,
            });
        }

        let context = assemble_context(
            &matches,
            live.as_deref(),
            self.retrieval.max_context_chars,
            &self.prompts.rag.no_context_marker,
        );
        let prompt = self.prompts.rag_prompt(&context, question);

        let generation_started = Instant::now();
        let generation = self
            .bounded(Stage::Generation, self.llm.generate(&prompt))
            .await?;
        progress.metrics.generation_latency_ms = Some(millis(generation_started.elapsed()));
        progress.metrics.tokens_estimated = generation.tokens_used;
        progress.metrics.total_latency_ms = millis(started.elapsed());

        Ok(ChatResponse {
            success: true,
            answer: generation.text,
            mode: ResponseMode::Rag,
            sources: std::mem::take(&mut progress.sources),
            metrics: std::mem::take(&mut progress.metrics),
            context_used: matches.len(),
            live_data_used: progress.live_data_used,
            notices: std::mem::take(&mut progress.notices),
            error: None,
        })
    }

    /// Live context for questions that ask for it. Failures become notices.
    async fn fetch_live(&self, question: &str, progress: &mut Progress) -> Option<String> {
        let live = self.live.as_ref()?;
        if !needs_live_data(question) {
            return None;
        }

        info!("Question needs live data, querying live source");
        match self.bounded(Stage::LiveData, live.live_context()).await {
            Ok(context) => {
                progress.live_data_used = true;
                Some(context)
            }
            Err(e) => {
                warn!(stage = %Stage::LiveData, "Live data unavailable: {}", e);
                progress
                    .notices
                    .push(format!("Live session data unavailable: {}", e));
                None
            }
        }
    }

    /// Answer from the model alone.
    #[instrument(skip(self, question))]
    pub async fn direct(&self, question: &str) -> ChatResponse {
        let started = Instant::now();
        let prompt = self.prompts.direct_prompt(question);

        match self.bounded(Stage::Generation, self.llm.generate(&prompt)).await {
            Ok(generation) => {
                let elapsed = millis(started.elapsed());
                ChatResponse {
                    success: true,
                    answer: generation.text,
                    mode: ResponseMode::Direct,
                    sources: Vec::new(),
                    metrics: Metrics {
                        generation_latency_ms: Some(elapsed),
                        total_latency_ms: elapsed,
                        tokens_estimated: generation.tokens_used,
                        ..Metrics::default()
                    },
                    context_used: 0,
                    live_data_used: false,
                    notices: Vec::new(),
                    error: None,
                }
            }
            Err(e) => {
                error!(stage = ?e.stage(), "Direct query failed: {}", e);
                let metrics = Metrics {
                    total_latency_ms: millis(started.elapsed()),
                    ..Metrics::default()
                };
                ChatResponse::failure(ResponseMode::Direct, &e, Vec::new(), metrics)
            }
        }
    }

    /// Answer in rag and direct mode at the same time.
    pub async fn compare(&self, request: &ChatRequest) -> CompareResponse {
        let started = Instant::now();

        if let Err(e) = request.validate(self.retrieval.max_top_k) {
            warn!("Rejected compare request: {}", e);
            return CompareResponse {
                question: request.question.clone(),
                rag_response: ChatResponse::failure(ResponseMode::Rag, &e, Vec::new(), Metrics::default()),
                direct_response: ChatResponse::failure(ResponseMode::Direct, &e, Vec::new(), Metrics::default()),
                total_latency_ms: millis(started.elapsed()),
            };
        }

        let top_k = request.top_k.unwrap_or(self.retrieval.top_k);
        let (rag_response, direct_response) = tokio::join!(
            self.rag(&request.question, top_k, request.namespace()),
            self.direct(&request.question),
        );

        CompareResponse {
            question: request.question.clone(),
            rag_response,
            direct_response,
            total_latency_ms: millis(started.elapsed()),
        }
    }

    /// Namespace statistics from the store.
    pub async fn namespaces(&self) -> Result<IndexStats> {
        self.bounded(Stage::VectorStore, self.store.stats()).await
    }

    /// Probe the store and the model.
    pub async fn status(&self) -> SystemStatus {
        let (stats, probe) = tokio::join!(
            self.namespaces(),
            self.bounded(Stage::Generation, self.llm.generate("Respond with OK")),
        );

        let llm_connected = match probe {
            Ok(generation) => !generation.text.trim().is_empty(),
            Err(e) => {
                warn!("LLM status check failed: {}", e);
                false
            }
        };

        let (store_connected, stats) = match stats {
            Ok(stats) => (true, stats),
            Err(e) => {
                warn!("Vector store status check failed: {}", e);
                (false, IndexStats::default())
            }
        };

        SystemStatus {
            pinecone_connected: store_connected,
            llm_connected,
            index_name: self.store.index_name().to_string(),
            total_vectors: stats.total_vectors,
            namespaces: stats.namespaces,
            config: self.status_config.clone(),
        }
    }

    async fn bounded<T>(&self, stage: Stage, call: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(PitwallError::unavailable(
                stage,
                format!("timed out after {}s", self.call_timeout.as_secs_f32()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Generation;
    use crate::vector_store::{MemoryVectorStore, VectorRecord};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Embeds queries along the first axis.
    struct AxisEmbedder {
        fail: bool,
    }

    #[async_trait]
    impl Embedder for AxisEmbedder {
        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        async fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
            if self.fail {
                return Err(PitwallError::unavailable(Stage::Embedding, "503 from provider"));
            }
            Ok(vec![1.0, 0.0])
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn model(&self) -> &str {
            "axis"
        }
    }

    /// Records prompts and answers with a fixed reply, or fails.
    struct ScriptedLlm {
        reply: Option<String>,
        delay: Duration,
        prompts: Mutex<Vec<String>>,
        calls: AtomicUsize,
    }

    impl ScriptedLlm {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                delay: Duration::ZERO,
                prompts: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                reply: None,
                ..Self::replying("")
            }
        }

        fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        async fn generate(&self, prompt: &str) -> Result<Generation> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match &self.reply {
                Some(text) => Ok(Generation {
                    text: text.clone(),
                    tokens_used: 42,
                    latency: self.delay,
                }),
                None => Err(PitwallError::unavailable(Stage::Generation, "quota exceeded")),
            }
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    struct FixedLive(Option<&'static str>);

    #[async_trait]
    impl LiveDataSource for FixedLive {
        async fn live_context(&self) -> Result<String> {
            match self.0 {
                Some(text) => Ok(text.to_string()),
                None => Err(PitwallError::unavailable(Stage::LiveData, "connection refused")),
            }
        }
    }

    /// A record whose cosine similarity to the query axis is `score`.
    fn record(id: &str, score: f32, title: &str, text: &str) -> VectorRecord {
        let metadata = json!({
            "title": title,
            "source": format!("https://example.org/{}", id),
            "category": "team",
            "namespace": "wikipedia",
            "text": text,
        });
        VectorRecord {
            id: id.to_string(),
            values: vec![score, (1.0 - score * score).max(0.0).sqrt()],
            metadata: metadata.as_object().unwrap().clone(),
        }
    }

    async fn seeded_store() -> Arc<MemoryVectorStore> {
        let store = Arc::new(MemoryVectorStore::new());
        store
            .upsert(
                "wikipedia",
                &[
                    record("cadillac", 0.92, "Cadillac F1", "Cadillac joins the grid in 2026."),
                    record("audi", 0.85, "Audi F1", "Audi takes over Sauber for 2026."),
                    record("weak", 0.50, "Monaco", "Monaco is a street circuit."),
                ],
            )
            .await
            .unwrap();
        store
            .upsert(
                "ergast-drivers",
                &[record("hamilton", 0.75, "Drivers 2025", "Lewis Hamilton drives for Ferrari.")],
            )
            .await
            .unwrap();
        store
    }

    fn chain(store: Arc<MemoryVectorStore>, llm: Arc<ScriptedLlm>) -> RagChain {
        RagChain::new(
            Arc::new(AxisEmbedder { fail: false }),
            store,
            llm,
            RetrievalSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_rag_filters_and_orders_sources() {
        let llm = Arc::new(ScriptedLlm::replying("Cadillac and Audi."));
        let chain = chain(seeded_store().await, llm.clone());

        let response = chain.chat(&ChatRequest::new("Which new teams join in 2026?")).await;

        assert!(response.success);
        assert_eq!(response.answer, "Cadillac and Audi.");
        let titles: Vec<&str> = response.sources.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Cadillac F1", "Audi F1", "Drivers 2025"]);
        assert!(response.sources.iter().all(|s| s.similarity_score >= 0.70));
        assert_eq!(response.metrics.documents_retrieved, 3);
        assert_eq!(response.context_used, 3);
        assert_eq!(response.metrics.tokens_estimated, 42);
        assert!(response.metrics.retrieval_latency_ms.is_some());
        assert!(response.metrics.generation_latency_ms.is_some());

        let prompt = llm.last_prompt();
        assert!(prompt.contains("--- Source 1: Cadillac F1"));
        assert!(!prompt.contains("Monaco"));
        assert!(prompt.contains("Which new teams join in 2026?"));
    }

    #[tokio::test]
    async fn test_rag_respects_top_k_and_namespace() {
        let llm = Arc::new(ScriptedLlm::replying("ok"));
        let chain = chain(seeded_store().await, llm);

        let response = chain.chat(&ChatRequest::new("teams?").with_top_k(1)).await;
        assert_eq!(response.sources.len(), 1);

        let response = chain
            .chat(&ChatRequest::new("drivers?").with_namespace("ergast-drivers"))
            .await;
        assert_eq!(response.sources.len(), 1);
        assert_eq!(response.sources[0].title, "Drivers 2025");
    }

    #[tokio::test]
    async fn test_unknown_namespace_is_not_found() {
        let llm = Arc::new(ScriptedLlm::replying("ok"));
        let chain = chain(seeded_store().await, llm.clone());

        let response = chain
            .chat(&ChatRequest::new("q").with_namespace("news"))
            .await;
        assert!(!response.success);
        assert_eq!(response.error.unwrap().kind, "not_found");
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_context_answers_without_llm() {
        let store = Arc::new(MemoryVectorStore::new());
        store
            .upsert("wikipedia", &[record("weak", 0.3, "Monaco", "Tunnel.")])
            .await
            .unwrap();
        let llm = Arc::new(ScriptedLlm::replying("should not be used"));
        let chain = chain(store, llm.clone());

        let response = chain.chat(&ChatRequest::new("Who won in 1950?")).await;

        assert!(response.success);
        assert_eq!(response.answer, Prompts::default().rag.no_context_answer);
        assert!(response.sources.is_empty());
        assert_eq!(response.metrics.documents_retrieved, 0);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_generation_failure_keeps_partial_sources() {
        let chain = chain(seeded_store().await, Arc::new(ScriptedLlm::failing()));

        let response = chain.chat(&ChatRequest::new("Tell me about Audi")).await;

        assert!(!response.success);
        let error = response.error.unwrap();
        assert_eq!(error.kind, "provider_unavailable");
        assert_eq!(error.stage, Some(Stage::Generation));
        assert_eq!(response.sources.len(), 3);
        assert_eq!(response.metrics.documents_retrieved, 3);
        assert!(response.metrics.retrieval_latency_ms.is_some());
        assert!(response.metrics.generation_latency_ms.is_none());
    }

    #[tokio::test]
    async fn test_embedding_failure_is_reported() {
        let chain = RagChain::new(
            Arc::new(AxisEmbedder { fail: true }),
            seeded_store().await,
            Arc::new(ScriptedLlm::replying("ok")),
            RetrievalSettings::default(),
        );

        let response = chain.chat(&ChatRequest::new("q")).await;
        assert!(!response.success);
        assert_eq!(response.error.unwrap().stage, Some(Stage::Embedding));
        assert!(response.sources.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_request_is_rejected() {
        let chain = chain(seeded_store().await, Arc::new(ScriptedLlm::replying("ok")));
        let response = chain.chat(&ChatRequest::new("q").with_top_k(99)).await;
        assert!(!response.success);
        assert_eq!(response.error.unwrap().kind, "invalid_configuration");
    }

    #[tokio::test]
    async fn test_live_data_folded_into_context() {
        let llm = Arc::new(ScriptedLlm::replying("Norris leads."));
        let chain = chain(seeded_store().await, llm.clone())
            .with_live_data(Arc::new(FixedLive(Some("P1: Lando NORRIS (#4)"))));

        let response = chain.chat(&ChatRequest::new("Who is leading right now?")).await;

        assert!(response.success);
        assert!(response.live_data_used);
        assert!(llm.last_prompt().contains("P1: Lando NORRIS (#4)"));
    }

    #[tokio::test]
    async fn test_live_data_failure_is_a_notice() {
        let llm = Arc::new(ScriptedLlm::replying("From the archive."));
        let chain = chain(seeded_store().await, llm.clone())
            .with_live_data(Arc::new(FixedLive(None)));

        let response = chain.chat(&ChatRequest::new("Who is leading right now?")).await;

        assert!(response.success);
        assert!(!response.live_data_used);
        assert_eq!(response.notices.len(), 1);
        assert!(response.notices[0].contains("Live session data unavailable"));
        assert_eq!(response.sources.len(), 3);
    }

    #[tokio::test]
    async fn test_live_data_without_matches_still_calls_llm() {
        let llm = Arc::new(ScriptedLlm::replying("Track is 41C."));
        let chain = chain(Arc::new(MemoryVectorStore::new()), llm.clone())
            .with_live_data(Arc::new(FixedLive(Some("Track Temperature: 41°C"))));

        let response = chain.chat(&ChatRequest::new("What is the track temperature?")).await;

        assert!(response.success);
        assert_eq!(response.answer, "Track is 41C.");
        let prompt = llm.last_prompt();
        assert!(prompt.contains(&Prompts::default().rag.no_context_marker));
        assert!(prompt.contains("Track Temperature: 41°C"));
    }

    #[tokio::test]
    async fn test_direct_has_no_sources() {
        let llm = Arc::new(ScriptedLlm::replying("Schumacher and Hamilton."));
        let chain = chain(seeded_store().await, llm.clone());

        let response = chain
            .chat(&ChatRequest::new("Who has seven titles?").with_mode(ResponseMode::Direct))
            .await;

        assert!(response.success);
        assert_eq!(response.mode, ResponseMode::Direct);
        assert!(response.sources.is_empty());
        assert_eq!(response.metrics.avg_similarity_score, 0.0);
        assert!(response.metrics.retrieval_latency_ms.is_none());
        assert!(!llm.last_prompt().contains("CONTEXT"));
    }

    #[tokio::test]
    async fn test_compare_mode_on_chat_adds_notice() {
        let chain = chain(seeded_store().await, Arc::new(ScriptedLlm::replying("ok")));
        let response = chain
            .chat(&ChatRequest::new("q").with_mode(ResponseMode::Compare))
            .await;
        assert_eq!(response.mode, ResponseMode::Rag);
        assert!(response.notices.iter().any(|n| n.contains("/compare")));
    }

    #[tokio::test]
    async fn test_compare_runs_both_concurrently() {
        let mut llm = ScriptedLlm::replying("answer");
        llm.delay = Duration::from_millis(200);
        let chain = chain(seeded_store().await, Arc::new(llm));

        let compare = chain.compare(&ChatRequest::new("Who joins in 2026?")).await;

        assert!(compare.rag_response.success);
        assert!(compare.direct_response.success);
        assert_eq!(compare.rag_response.mode, ResponseMode::Rag);
        assert_eq!(compare.direct_response.mode, ResponseMode::Direct);
        let serial = compare.rag_response.metrics.total_latency_ms
            + compare.direct_response.metrics.total_latency_ms;
        assert!(compare.total_latency_ms <= serial);
        assert!(compare.total_latency_ms < 390.0);
    }

    #[tokio::test]
    async fn test_compare_reports_each_side_independently() {
        let llm = Arc::new(ScriptedLlm::replying("Max Verstappen."));
        let chain = RagChain::new(
            Arc::new(AxisEmbedder { fail: true }),
            seeded_store().await,
            llm.clone(),
            RetrievalSettings::default(),
        );

        let compare = chain.compare(&ChatRequest::new("Who won in 2021?")).await;

        assert!(!compare.rag_response.success);
        let error = compare.rag_response.error.unwrap();
        assert_eq!(error.kind, "provider_unavailable");
        assert_eq!(error.stage, Some(Stage::Embedding));

        assert!(compare.direct_response.success);
        assert!(compare.direct_response.error.is_none());
        assert_eq!(compare.direct_response.answer, "Max Verstappen.");
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let mut llm = ScriptedLlm::replying("late");
        llm.delay = Duration::from_millis(500);
        let chain = chain(seeded_store().await, Arc::new(llm))
            .with_call_timeout(Duration::from_millis(50));

        let response = chain.direct("q").await;
        assert!(!response.success);
        let error = response.error.unwrap();
        assert_eq!(error.stage, Some(Stage::Generation));
        assert!(error.message.contains("timed out"));
    }

    #[tokio::test]
    async fn test_status() {
        let chain = chain(seeded_store().await, Arc::new(ScriptedLlm::replying("OK")));
        let status = chain.status().await;
        assert!(status.pinecone_connected);
        assert!(status.llm_connected);
        assert_eq!(status.index_name, "memory");
        assert_eq!(status.total_vectors, 4);
        assert_eq!(status.namespaces["wikipedia"].vector_count, 3);

        let chain = chain_with_failing_llm().await;
        assert!(!chain.status().await.llm_connected);
    }

    async fn chain_with_failing_llm() -> RagChain {
        chain(seeded_store().await, Arc::new(ScriptedLlm::failing()))
    }
}

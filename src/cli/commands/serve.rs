//! HTTP API server for the chat frontend.
//!
//! Routes live under `/api/v1`; `/health` sits at the root.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::PitwallError;
use crate::evaluation::{run_evaluation, EVALUATION_DATASET};
use crate::ingest::IngestionSource;
use crate::orchestrator::Orchestrator;
use crate::rag::{ChatRequest, ChatResponse, ErrorPayload, RagChain};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

/// Shared application state.
pub struct AppState {
    orchestrator: Orchestrator,
    chain: RagChain,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        let chain = orchestrator.rag_chain();
        Self {
            orchestrator,
            chain,
        }
    }

    fn settings(&self) -> &Settings {
        self.orchestrator.settings()
    }
}

/// Run the HTTP API server until Ctrl-C.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    let orchestrator = Orchestrator::new(settings)?;
    let state = Arc::new(AppState::new(orchestrator));
    let ingestion_enabled = state.settings().ingestion.api_enabled;
    let app = router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Pitwall API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Chat", "POST /api/v1/chat");
    Output::kv("Compare", "POST /api/v1/compare");
    Output::kv(
        "Ingest",
        if ingestion_enabled {
            "POST /api/v1/ingest"
        } else {
            "POST /api/v1/ingest (disabled)"
        },
    );
    Output::kv("Status", "GET  /api/v1/status");
    Output::kv("Evaluate", "GET  /api/v1/evaluate");
    Output::kv("Namespaces", "GET  /api/v1/namespaces");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.settings().server.cors_origin_list());

    let api = Router::new()
        .route("/chat", post(chat))
        .route("/compare", post(compare))
        .route("/ingest", post(ingest))
        .route("/status", get(status))
        .route("/evaluate", get(evaluate))
        .route("/namespaces", get(namespaces));

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(
            origins
                .iter()
                .filter_map(|origin| HeaderValue::from_str(origin).ok())
                .collect::<Vec<_>>(),
        )
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct IngestRequest {
    #[serde(default)]
    source: IngestionSource,
    #[serde(default)]
    force_refresh: bool,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorPayload,
}

fn status_code(err: &PitwallError) -> StatusCode {
    match err {
        PitwallError::InvalidConfiguration(_) => StatusCode::BAD_REQUEST,
        PitwallError::NotFound(_) => StatusCode::NOT_FOUND,
        PitwallError::Disabled(_) => StatusCode::FORBIDDEN,
        PitwallError::ProviderUnavailable { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: &PitwallError) -> Response {
    (
        status_code(err),
        Json(ErrorResponse {
            error: ErrorPayload::from(err),
        }),
    )
        .into_response()
}

fn bad_body(rejection: JsonRejection) -> Response {
    error_response(&PitwallError::InvalidConfiguration(rejection.body_text()))
}

/// Request errors map to 4xx. Provider failures answer 200 with
/// `success: false` and whatever was retrieved.
fn chat_status(response: &ChatResponse) -> StatusCode {
    match response.error.as_ref().map(|e| e.kind.as_str()) {
        Some("invalid_configuration") => StatusCode::BAD_REQUEST,
        Some("not_found") => StatusCode::NOT_FOUND,
        _ => StatusCode::OK,
    }
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn chat(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_body(rejection),
    };

    let response = state.chain.chat(&request).await;
    (chat_status(&response), Json(response)).into_response()
}

async fn compare(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_body(rejection),
    };

    // Once the request is valid each side reports its own outcome
    if let Err(e) = request.validate(state.chain.max_top_k()) {
        return error_response(&e);
    }

    Json(state.chain.compare(&request).await).into_response()
}

async fn ingest(
    State(state): State<Arc<AppState>>,
    body: Result<Json<IngestRequest>, JsonRejection>,
) -> Response {
    if !state.settings().ingestion.api_enabled {
        return error_response(&PitwallError::Disabled(
            "ingestion is disabled in this deployment".to_string(),
        ));
    }

    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_body(rejection),
    };

    let pipeline = match state.orchestrator.ingestion_pipeline() {
        Ok(pipeline) => pipeline,
        Err(e) => return error_response(&e),
    };

    info!(source = %request.source, force = request.force_refresh, "Ingestion requested");
    Json(pipeline.run(request.source, request.force_refresh).await).into_response()
}

async fn status(State(state): State<Arc<AppState>>) -> Response {
    Json(state.chain.status().await).into_response()
}

async fn evaluate(State(state): State<Arc<AppState>>) -> Response {
    Json(run_evaluation(&state.chain, EVALUATION_DATASET).await).into_response()
}

async fn namespaces(State(state): State<Arc<AppState>>) -> Response {
    match state.chain.namespaces().await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::Embedder;
    use crate::error::Result;
    use crate::llm::{Generation, LlmProvider};
    use crate::vector_store::MemoryVectorStore;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::time::Duration;

    struct ZeroEmbedder;

    #[async_trait]
    impl Embedder for ZeroEmbedder {
        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        async fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn model(&self) -> &str {
            "zero"
        }
    }

    struct EchoLlm;

    #[async_trait]
    impl LlmProvider for EchoLlm {
        async fn generate(&self, _prompt: &str) -> Result<Generation> {
            Ok(Generation {
                text: "Max Verstappen.".to_string(),
                tokens_used: 3,
                latency: Duration::ZERO,
            })
        }

        fn model(&self) -> &str {
            "echo"
        }
    }

    /// Serve the router on an ephemeral port and return its base URL.
    async fn spawn_server(settings: Settings) -> String {
        let orchestrator = Orchestrator::with_components(
            settings,
            Arc::new(ZeroEmbedder),
            Arc::new(EchoLlm),
            Arc::new(MemoryVectorStore::new()),
        )
        .unwrap();
        let app = router(Arc::new(AppState::new(orchestrator)));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_health() {
        let base = spawn_server(Settings::default()).await;
        let body: Value = reqwest::get(format!("{}/health", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_chat_direct() {
        let base = spawn_server(Settings::default()).await;
        let resp = reqwest::Client::new()
            .post(format!("{}/api/v1/chat", base))
            .json(&json!({"question": "Who won in 2021?", "mode": "direct"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["mode"], "direct");
        assert_eq!(body["answer"], "Max Verstappen.");
    }

    #[tokio::test]
    async fn test_chat_rejects_bad_requests() {
        let base = spawn_server(Settings::default()).await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{}/api/v1/chat", base))
            .json(&json!({"question": "", "mode": "rag"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["kind"], "invalid_configuration");

        let resp = client
            .post(format!("{}/api/v1/chat", base))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);

        let resp = client
            .post(format!("{}/api/v1/chat", base))
            .json(&json!({"question": "q", "namespace_filter": "news"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn test_ingest_disabled_by_default() {
        let base = spawn_server(Settings::default()).await;
        let resp = reqwest::Client::new()
            .post(format!("{}/api/v1/ingest", base))
            .json(&json!({"source": "wikipedia"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 403);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["kind"], "disabled");
    }

    #[tokio::test]
    async fn test_compare_reports_each_side() {
        let base = spawn_server(Settings::default()).await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{}/api/v1/compare", base))
            .json(&json!({"question": "Who won in 2021?", "namespace_filter": "nope"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["rag_response"]["success"], false);
        assert_eq!(body["rag_response"]["error"]["kind"], "not_found");
        assert_eq!(body["direct_response"]["success"], true);
        assert_eq!(body["direct_response"]["answer"], "Max Verstappen.");

        let resp = client
            .post(format!("{}/api/v1/compare", base))
            .json(&json!({"question": "Who won in 2021?", "top_k": 0}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["kind"], "invalid_configuration");
    }

    #[tokio::test]
    async fn test_compare_and_namespaces() {
        let base = spawn_server(Settings::default()).await;
        let client = reqwest::Client::new();

        let body: Value = client
            .post(format!("{}/api/v1/compare", base))
            .json(&json!({"question": "Who won in 2021?"}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["question"], "Who won in 2021?");
        assert_eq!(body["rag_response"]["mode"], "rag");
        assert_eq!(body["direct_response"]["answer"], "Max Verstappen.");

        let body: Value = client
            .get(format!("{}/api/v1/namespaces", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["total_vectors"], 0);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(status_code(&PitwallError::Disabled("x".into())), StatusCode::FORBIDDEN);
        assert_eq!(
            status_code(&PitwallError::unavailable(crate::error::Stage::Embedding, "x")),
            StatusCode::BAD_GATEWAY
        );
    }
}

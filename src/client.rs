//! Outbound HTTP clients and the retry policy shared by every provider.

use crate::error::{PitwallError, Result, Stage};
use async_openai::{config::OpenAIConfig, Client};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::warn;

/// Longest pause between two attempts.
const MAX_BACKOFF_EXPONENT: u32 = 5;

/// Create a plain HTTP client with the given timeout.
pub fn create_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("pitwall/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| PitwallError::InvalidConfiguration(format!("HTTP client: {}", e)))
}

/// Create an OpenAI client backed by a timeout-bounded HTTP client.
pub fn create_openai_client(timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = create_http_client(timeout)?;
    Ok(Client::with_config(OpenAIConfig::default()).with_http_client(http_client))
}

/// Read a required API key from the environment.
pub fn api_key(var: &str) -> Result<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| PitwallError::InvalidConfiguration(format!("{} is not set", var)))
}

/// Whether a response status is worth another attempt.
pub fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Pause before retry number `attempt` (1-based).
pub fn retry_backoff(attempt: usize) -> Duration {
    let capped = (attempt as u32).min(MAX_BACKOFF_EXPONENT);
    Duration::from_millis(500 * (1 << capped))
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

/// Send a request, retrying rate limits, server errors and transport failures
/// up to `max_retries` extra times.
///
/// Returns the last response whatever its status once retries run out; only
/// transport failures become errors here.
pub async fn send(request: RequestBuilder, max_retries: usize, stage: Stage) -> Result<Response> {
    let mut attempt = 0usize;
    loop {
        let builder = request
            .try_clone()
            .ok_or_else(|| PitwallError::unavailable(stage, "request body cannot be retried"))?;

        match builder.send().await {
            Ok(resp) => {
                let status = resp.status();
                if should_retry(status) && attempt < max_retries {
                    attempt += 1;
                    let delay = retry_backoff(attempt);
                    warn!(%stage, %status, attempt, "Retrying in {:?}", delay);
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Ok(resp);
            }
            Err(err) => {
                if is_retryable_error(&err) && attempt < max_retries {
                    attempt += 1;
                    let delay = retry_backoff(attempt);
                    warn!(%stage, error = %err, attempt, "Retrying in {:?}", delay);
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Err(PitwallError::unavailable(stage, err.to_string()));
            }
        }
    }
}

/// Turn a non-2xx response into a provider error carrying the body.
pub async fn ensure_success(resp: Response, stage: Stage, what: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp
        .text()
        .await
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    Err(PitwallError::unavailable(
        stage,
        format!("{} failed ({}): {}", what, status, truncate(&body, 500)),
    ))
}

/// Send with retries and decode a successful JSON body.
pub async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    max_retries: usize,
    stage: Stage,
    what: &str,
) -> Result<T> {
    let resp = send(request, max_retries, stage).await?;
    let resp = ensure_success(resp, stage, what).await?;
    resp.json::<T>()
        .await
        .map_err(|e| PitwallError::unavailable(stage, format!("{}: malformed response: {}", what, e)))
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

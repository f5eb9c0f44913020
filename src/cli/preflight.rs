//! Pre-flight checks before network-bound operations.
//!
//! Validates that the API keys the configured providers need are present
//! before starting work that would otherwise fail midway.

use crate::config::{ModelProvider, Settings, VectorStoreProvider};
use crate::error::{PitwallError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Answering needs the embedding, LLM and vector store keys.
    Ask,
    /// Ingestion needs the embedding and vector store keys.
    Ingest,
    /// Reading stats needs only the vector store key.
    Stats,
}

/// Environment variables holding an API key for a model provider.
pub fn model_key_var(provider: ModelProvider) -> &'static str {
    match provider {
        ModelProvider::Gemini => "GOOGLE_API_KEY",
        ModelProvider::OpenAI => "OPENAI_API_KEY",
    }
}

/// API keys the configured providers need for an operation, deduplicated.
pub fn required_keys(settings: &Settings, operation: Operation) -> Vec<&'static str> {
    let mut keys = Vec::new();

    if matches!(operation, Operation::Ask | Operation::Ingest) {
        keys.push(model_key_var(settings.embedding.provider));
    }
    if matches!(operation, Operation::Ask) {
        keys.push(model_key_var(settings.llm.provider));
    }
    if settings.vector_store.provider == VectorStoreProvider::Pinecone {
        keys.push("PINECONE_API_KEY");
    }

    keys.sort_unstable();
    keys.dedup();
    keys
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error naming what is missing.
pub fn check(settings: &Settings, operation: Operation) -> Result<()> {
    check_with(settings, operation, |var| std::env::var(var).ok())
}

fn check_with<F>(settings: &Settings, operation: Operation, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let missing: Vec<&str> = required_keys(settings, operation)
        .into_iter()
        .filter(|var| lookup(var).map_or(true, |v| v.trim().is_empty()))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(PitwallError::InvalidConfiguration(format!(
            "{} not set. Set with: export {}='...'",
            missing.join(", "),
            missing[0]
        )))
    }
}

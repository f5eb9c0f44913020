//! Answer generation.

mod gemini;
mod openai;

pub use gemini::GeminiLlm;
pub use openai::OpenAILlm;

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// A completed generation.
#[derive(Debug, Clone)]
pub struct Generation {
    pub text: String,
    /// Reported by the provider, or estimated when it does not say.
    pub tokens_used: u32,
    pub latency: Duration,
}

/// Trait for text generation.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for a single prompt.
    async fn generate(&self, prompt: &str) -> Result<Generation>;

    /// Model identifier.
    fn model(&self) -> &str;
}

/// Rough token count: one token per whitespace-separated word.
pub fn estimate_tokens(prompt: &str, answer: &str) -> u32 {
    (prompt.split_whitespace().count() + answer.split_whitespace().count()) as u32
}

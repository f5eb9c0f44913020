//! Retrieval-augmented question answering over the F1 knowledge base.
//!
//! A question is answered in one of three modes: grounded in retrieved
//! context (`rag`), from the model alone (`direct`), or both side by side
//! (`compare`).

mod chain;
pub mod context;
pub mod live;
mod response;

pub use chain::RagChain;
pub use live::{needs_live_data, LiveDataSource, OpenF1Client, LIVE_DATA_KEYWORDS};
pub use response::{
    ChatResponse, CompareResponse, ErrorPayload, Metrics, SourceDocument, StatusConfig,
    SystemStatus,
};

use crate::error::{PitwallError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Longest question accepted, in characters.
pub const MAX_QUESTION_CHARS: usize = 2000;

/// How a question is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    #[default]
    Rag,
    Direct,
    Compare,
}

impl ResponseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseMode::Rag => "rag",
            ResponseMode::Direct => "direct",
            ResponseMode::Compare => "compare",
        }
    }
}

impl std::fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rag" => Ok(ResponseMode::Rag),
            "direct" => Ok(ResponseMode::Direct),
            "compare" => Ok(ResponseMode::Compare),
            _ => Err(format!("Unknown mode: {} (expected rag, direct or compare)", s)),
        }
    }
}

/// A question from a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    #[serde(default)]
    pub mode: ResponseMode,
    /// Results to retrieve; the configured default when absent.
    #[serde(default)]
    pub top_k: Option<usize>,
    /// Limit retrieval to one namespace.
    #[serde(default)]
    pub namespace_filter: Option<String>,
}

impl ChatRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            mode: ResponseMode::Rag,
            top_k: None,
            namespace_filter: None,
        }
    }

    pub fn with_mode(mut self, mode: ResponseMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace_filter = Some(namespace.into());
        self
    }

    /// Check the question length and `top_k` bounds.
    pub fn validate(&self, max_top_k: usize) -> Result<()> {
        if self.question.trim().is_empty() {
            return Err(PitwallError::InvalidConfiguration(
                "question must not be empty".to_string(),
            ));
        }

        let chars = self.question.chars().count();
        if chars > MAX_QUESTION_CHARS {
            return Err(PitwallError::InvalidConfiguration(format!(
                "question is {} characters; the limit is {}",
                chars, MAX_QUESTION_CHARS
            )));
        }

        if let Some(top_k) = self.top_k {
            if top_k == 0 || top_k > max_top_k {
                return Err(PitwallError::InvalidConfiguration(format!(
                    "top_k must be between 1 and {}, got {}",
                    max_top_k, top_k
                )));
            }
        }

        Ok(())
    }

    /// The namespace filter, with blank values treated as no filter.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace_filter
            .as_deref()
            .map(str::trim)
            .filter(|ns| !ns.is_empty())
    }
}

//! Configuration module for Pitwall.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{DirectPrompts, Prompts, RagPrompts};
pub use settings::{
    ChunkingSettings, EmbeddingSettings, GeneralSettings, IngestionSettings, LiveDataSettings,
    LlmSettings, ModelProvider, PineconeSettings, PromptSettings, ProviderSettings,
    RetrievalSettings, ServerSettings, Settings, VectorStoreProvider, VectorStoreSettings,
};

//! Pitwall - Formula 1 retrieval-augmented question answering
//!
//! A CLI and HTTP service that builds a searchable knowledge base from
//! Wikipedia articles and Ergast race data, then answers questions with or
//! without the retrieved context so the two can be compared.
//!
//! # Overview
//!
//! Pitwall allows you to:
//! - Ingest F1 articles and historical results into a vector store
//! - Ask questions and get answers grounded in cited sources
//! - Compare retrieval-grounded answers with model-only answers
//! - Score answer quality against a reference question set
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Settings, environment overrides and prompt templates
//! - `chunking` - Overlapping character-window chunking with metadata tags
//! - `embedding` - Embedding providers
//! - `llm` - Text generation providers
//! - `vector_store` - Vector database abstraction
//! - `ingest` - Document sources and the ingestion pipeline
//! - `rag` - Retrieval, context assembly and the answer chain
//! - `evaluation` - Keyword-based answer scoring
//! - `orchestrator` - Provider wiring
//!
//! # Example
//!
//! ```rust,no_run
//! use pitwall::config::Settings;
//! use pitwall::orchestrator::Orchestrator;
//! use pitwall::rag::ChatRequest;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let response = orchestrator
//!         .rag_chain()
//!         .chat(&ChatRequest::new("Who won the 2021 drivers' championship?"))
//!         .await;
//!     println!("{}", response.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod client;
pub mod config;
pub mod embedding;
pub mod error;
pub mod evaluation;
pub mod ingest;
pub mod llm;
pub mod orchestrator;
pub mod rag;
pub mod vector_store;

pub use error::{PitwallError, Result};

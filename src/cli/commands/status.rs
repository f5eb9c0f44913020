//! Status and namespaces command implementations.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{create_vector_store, Orchestrator};
use anyhow::Result;

/// Probe the vector store and the model.
pub async fn run_status(settings: Settings) -> Result<()> {
    preflight::check(&settings, Operation::Ask)?;

    let chain = Orchestrator::new(settings)?.rag_chain();
    let spinner = Output::spinner("Checking services...");
    let status = chain.status().await;
    spinner.finish_and_clear();

    Output::header("System Status");
    let connected = |ok: bool| if ok { "connected" } else { "unreachable" };
    Output::kv("Vector store", connected(status.pinecone_connected));
    Output::kv("LLM", connected(status.llm_connected));
    Output::kv("Index", &status.index_name);
    Output::kv("Total vectors", &status.total_vectors.to_string());

    Output::header("Configuration");
    let config = &status.config;
    Output::kv(
        "Embedding",
        &format!(
            "{} {} ({} dims)",
            config.embedding_provider, config.embedding_model, config.embedding_dimensions
        ),
    );
    Output::kv("LLM", &format!("{} {}", config.llm_provider, config.llm_model));
    Output::kv(
        "Chunking",
        &format!("{} chars, {} overlap", config.chunk_size, config.chunk_overlap),
    );
    Output::kv(
        "Retrieval",
        &format!(
            "top_k {} (max {}), threshold {}",
            config.top_k, config.max_top_k, config.similarity_threshold
        ),
    );

    if !status.pinecone_connected || !status.llm_connected {
        Output::warning("Some services are unreachable. Run with -v for details.");
    }
    Ok(())
}

/// List namespaces and their vector counts.
pub async fn run_namespaces(settings: Settings) -> Result<()> {
    preflight::check(&settings, Operation::Stats)?;

    let store = create_vector_store(&settings)?;
    let stats = store.stats().await?;

    if stats.namespaces.is_empty() {
        Output::info("The index is empty. Run 'pitwall ingest' to populate it.");
        return Ok(());
    }

    Output::header("Namespaces");
    for (name, ns) in &stats.namespaces {
        Output::list_item(&format!("{} ({} vectors)", name, ns.vector_count));
    }
    println!();
    Output::kv("Total", &stats.total_vectors.to_string());
    if let Some(dimension) = stats.dimension {
        Output::kv("Dimension", &dimension.to_string());
    }
    Ok(())
}

//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::ingest::{IngestionResult, IngestionSource};
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the ingest command.
pub async fn run_ingest(source: IngestionSource, force: bool, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(&settings, Operation::Ingest) {
        Output::error(&e.to_string());
        Output::info("Run 'pitwall doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let pipeline = orchestrator.ingestion_pipeline()?;

    if force {
        Output::warning(&format!("Existing vectors for '{}' will be replaced.", source));
    }

    let spinner = Output::spinner(&format!("Ingesting {}...", source));
    let result = pipeline.run(source, force).await;
    spinner.finish_and_clear();

    print_summary(&result);

    if result.success {
        Ok(())
    } else {
        anyhow::bail!("ingestion finished with {} error(s)", result.errors.len())
    }
}

fn print_summary(result: &IngestionResult) {
    if result.success {
        Output::success(&format!("Ingested {} in {:.1}s", result.source, result.duration_seconds));
    } else {
        Output::warning(&format!(
            "Ingested {} with errors in {:.1}s",
            result.source, result.duration_seconds
        ));
    }

    Output::kv("Documents", &result.documents_processed.to_string());
    Output::kv("Chunks", &result.chunks_created.to_string());
    Output::kv("Vectors", &result.vectors_upserted.to_string());
    Output::kv("Namespaces", &result.namespaces.join(", "));

    if !result.errors.is_empty() {
        Output::header("Errors");
        for error in &result.errors {
            Output::list_item(error);
        }
    }
}

//! Ask and compare command implementations.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::rag::{ChatRequest, ChatResponse, ResponseMode};
use anyhow::Result;
use console::style;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    mode: ResponseMode,
    top_k: Option<usize>,
    namespace: Option<String>,
    json: bool,
    settings: Settings,
) -> Result<()> {
    if mode == ResponseMode::Compare {
        return run_compare(question, top_k, namespace, settings).await;
    }

    preflight_or_hint(&settings)?;

    let chain = Orchestrator::new(settings)?.rag_chain();
    let mut request = ChatRequest::new(question).with_mode(mode);
    if let Some(top_k) = top_k {
        request = request.with_top_k(top_k);
    }
    if let Some(namespace) = namespace {
        request = request.with_namespace(namespace);
    }

    let spinner = Output::spinner(match mode {
        ResponseMode::Direct => "Asking the model...",
        _ => "Searching knowledge base...",
    });
    let response = chain.chat(&request).await;
    spinner.finish_and_clear();

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        Output::chat_response(&response);
    }

    finish(&response)
}

/// Run the compare command.
pub async fn run_compare(
    question: &str,
    top_k: Option<usize>,
    namespace: Option<String>,
    settings: Settings,
) -> Result<()> {
    preflight_or_hint(&settings)?;

    let chain = Orchestrator::new(settings)?.rag_chain();
    let mut request = ChatRequest::new(question);
    if let Some(top_k) = top_k {
        request = request.with_top_k(top_k);
    }
    if let Some(namespace) = namespace {
        request = request.with_namespace(namespace);
    }

    let spinner = Output::spinner("Answering with and without retrieval...");
    let response = chain.compare(&request).await;
    spinner.finish_and_clear();

    Output::header("With retrieval (rag)");
    Output::chat_response(&response.rag_response);

    Output::header("Model only (direct)");
    Output::chat_response(&response.direct_response);

    println!();
    println!(
        "  {}",
        style(format!("compare total {:.0}ms", response.total_latency_ms)).dim()
    );

    finish(&response.rag_response)?;
    finish(&response.direct_response)
}

fn preflight_or_hint(settings: &Settings) -> Result<()> {
    if let Err(e) = preflight::check(settings, Operation::Ask) {
        Output::error(&e.to_string());
        Output::info("Run 'pitwall doctor' for detailed diagnostics.");
        return Err(e.into());
    }
    Ok(())
}

fn finish(response: &ChatResponse) -> Result<()> {
    match &response.error {
        Some(error) => Err(anyhow::anyhow!("{}: {}", error.kind, error.message)),
        None => Ok(()),
    }
}

//! CLI output formatting utilities.

use crate::rag::{ChatResponse, Metrics, SourceDocument};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print a retrieved source.
    pub fn source(index: usize, source: &SourceDocument) {
        println!(
            "\n{} [{}] {} ({}, score: {:.3})",
            style(">>").green(),
            index,
            style(&source.title).bold(),
            style(&source.namespace).cyan(),
            source.similarity_score
        );
        println!("   {}", content_preview(&source.excerpt, 200));
        println!("   {}", style(&source.source_url).dim());
    }

    /// Print a latency summary line.
    pub fn metrics(metrics: &Metrics) {
        let ms = |v: Option<f64>| v.map(|v| format!("{:.0}ms", v)).unwrap_or_else(|| "-".to_string());
        println!(
            "  {}",
            style(format!(
                "retrieval {} | generation {} | total {:.0}ms | {} docs | avg score {:.3} | ~{} tokens",
                ms(metrics.retrieval_latency_ms),
                ms(metrics.generation_latency_ms),
                metrics.total_latency_ms,
                metrics.documents_retrieved,
                metrics.avg_similarity_score,
                metrics.tokens_estimated
            ))
            .dim()
        );
    }

    /// Print a full chat response: answer, notices, sources and metrics.
    pub fn chat_response(response: &ChatResponse) {
        if response.success {
            println!("\n{}", response.answer);
        } else {
            Output::error(&response.answer);
        }

        for notice in &response.notices {
            Output::warning(notice);
        }
        if response.live_data_used {
            Output::info("Live session data was included.");
        }

        if !response.sources.is_empty() {
            Output::header("Sources");
            for (i, source) in response.sources.iter().enumerate() {
                Output::source(i + 1, source);
            }
        }

        println!();
        Output::metrics(&response.metrics);
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Flatten and truncate content with an ellipsis.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    match content.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &content[..idx]),
        None => content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_preview() {
        assert_eq!(content_preview("line one\nline two", 50), "line one line two");
        assert_eq!(content_preview("Hülkenberg", 3), "Hül...");
    }
}

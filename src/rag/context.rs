//! Context building for grounded prompts.

use crate::vector_store::{rank_matches, SearchMatch};
use serde_json::Value;

/// Drop matches scoring below `threshold`, then order best first and keep
/// `top_k`. Equal scores keep the order the store returned them in.
pub fn filter_matches(matches: Vec<SearchMatch>, threshold: f32, top_k: usize) -> Vec<SearchMatch> {
    let kept = matches.into_iter().filter(|m| m.score >= threshold).collect();
    rank_matches(kept, top_k)
}

/// Stored chunk text of a match.
pub fn match_text(hit: &SearchMatch) -> &str {
    hit.metadata.get("text").and_then(Value::as_str).unwrap_or("")
}

/// Cut `text` to at most `max_chars` characters, marking the cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Format retrieved chunks as numbered, titled blocks for the prompt.
pub fn format_context_for_prompt(matches: &[SearchMatch], max_chunk_chars: usize) -> String {
    matches
        .iter()
        .enumerate()
        .map(|(i, hit)| {
            let title = hit
                .metadata
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or("Unknown Source");
            format!(
                "--- Source {}: {} (relevance: {:.3}) ---\n{}",
                i + 1,
                title,
                hit.score,
                truncate_chars(match_text(hit), max_chunk_chars)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Assemble the full context pool: retrieved chunks (or `no_context_marker`
/// when there are none), followed by live session data if any.
pub fn assemble_context(
    matches: &[SearchMatch],
    live: Option<&str>,
    max_chunk_chars: usize,
    no_context_marker: &str,
) -> String {
    let mut context = if matches.is_empty() {
        no_context_marker.to_string()
    } else {
        format_context_for_prompt(matches, max_chunk_chars)
    };

    if let Some(live) = live {
        context.push_str("\n\n--- Live Session Data (OpenF1) ---\n");
        context.push_str(live);
    }

    context
}

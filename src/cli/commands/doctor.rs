//! Doctor command - verify API keys and configuration.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Prompts, Settings, VectorStoreProvider};
use console::style;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Pitwall Doctor");
    println!();
    println!("Checking API keys and configuration...\n");

    let mut checks = Vec::new();

    println!("{}", style("Providers").bold());
    Output::kv("Embedding", &format!("{} ({})", settings.embedding.provider, settings.embedding.model));
    Output::kv("LLM", &format!("{} ({})", settings.llm.provider, settings.llm.model));
    Output::kv("Vector store", &settings.vector_store.provider.to_string());
    println!();

    println!("{}", style("API Keys").bold());
    let key_checks = check_api_keys(settings, |var| std::env::var(var).ok());
    for check in &key_checks {
        check.print();
    }
    checks.extend(key_checks);

    println!();

    println!("{}", style("Configuration").bold());
    let config_checks = vec![
        check_config_file(),
        check_settings(settings),
        check_prompts(settings),
        check_storage(settings),
    ];
    for check in &config_checks {
        check.print();
    }
    checks.extend(config_checks);

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Pitwall.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Pitwall is ready to use.");
    }

    Ok(())
}

/// One check per API key the configured providers need.
fn check_api_keys<F>(settings: &Settings, lookup: F) -> Vec<CheckResult>
where
    F: Fn(&str) -> Option<String>,
{
    preflight::required_keys(settings, Operation::Ask)
        .into_iter()
        .map(|var| match lookup(var) {
            Some(key) if key.trim().is_empty() => {
                CheckResult::error(var, "empty", &format!("Set with: export {}='...'", var))
            }
            Some(key) => CheckResult::ok(var, &format!("configured ({})", mask_key(&key))),
            None => CheckResult::error(var, "not set", &format!("Set with: export {}='...'", var)),
        })
        .collect()
}

/// Show only the ends of a key.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.trim().chars().collect();
    if chars.len() <= 12 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            &format!("Create {} to override defaults", config_path.display()),
        )
    }
}

fn check_settings(settings: &Settings) -> CheckResult {
    match settings.validate() {
        Ok(()) => CheckResult::ok(
            "Settings",
            &format!(
                "chunk {} / overlap {}, top_k {}, threshold {}",
                settings.chunking.chunk_size,
                settings.chunking.chunk_overlap,
                settings.retrieval.top_k,
                settings.retrieval.similarity_threshold
            ),
        ),
        Err(e) => CheckResult::error("Settings", &e.to_string(), "Fix the value in the config file"),
    }
}

fn check_prompts(settings: &Settings) -> CheckResult {
    match (&settings.prompts.custom_dir, Prompts::load(settings.prompts.custom_dir.as_deref())) {
        (_, Err(e)) => CheckResult::error("Prompts", &e.to_string(), "Check the custom prompt files"),
        (Some(dir), Ok(_)) => CheckResult::ok("Prompts", &format!("custom ({})", dir)),
        (None, Ok(_)) => CheckResult::ok("Prompts", "built-in"),
    }
}

fn check_storage(settings: &Settings) -> CheckResult {
    match settings.vector_store.provider {
        VectorStoreProvider::Pinecone => CheckResult::ok(
            "Vector store",
            &format!("pinecone index '{}'", settings.pinecone.index_name),
        ),
        VectorStoreProvider::Memory => CheckResult::warning(
            "Vector store",
            "in-memory",
            "Ingested vectors are lost when the process exits",
        ),
        VectorStoreProvider::Sqlite => {
            let db_path = settings.sqlite_path();
            if db_path.exists() {
                let size = std::fs::metadata(&db_path)
                    .map(|m| format_size(m.len()))
                    .unwrap_or_else(|_| "unknown size".to_string());
                CheckResult::ok("Vector store", &format!("{} ({})", db_path.display(), size))
            } else {
                CheckResult::warning(
                    "Vector store",
                    &format!("{} (not created yet)", db_path.display()),
                    "Run 'pitwall ingest' to populate it",
                )
            }
        }
    }
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelProvider;

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[test]
    fn test_check_api_keys() {
        let mut settings = Settings::default();
        settings.embedding.provider = ModelProvider::OpenAI;
        settings.llm.provider = ModelProvider::Gemini;
        settings.vector_store.provider = VectorStoreProvider::Memory;

        let checks = check_api_keys(&settings, |var| {
            (var == "OPENAI_API_KEY").then(|| "sk-test-1234567890abcd".to_string())
        });
        assert_eq!(checks.len(), 2);
        assert_eq!(checks[0].name, "GOOGLE_API_KEY");
        assert_eq!(checks[0].status, CheckStatus::Error);
        assert_eq!(checks[1].status, CheckStatus::Ok);
        assert_eq!(checks[1].message, "configured (sk-t...abcd)");
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("short"), "****");
        assert_eq!(mask_key("AIzaSyExampleKey9876"), "AIza...9876");
    }

    #[test]
    fn test_check_settings() {
        assert_eq!(check_settings(&Settings::default()).status, CheckStatus::Ok);

        let mut settings = Settings::default();
        settings.chunking.chunk_overlap = settings.chunking.chunk_size;
        assert_eq!(check_settings(&settings).status, CheckStatus::Error);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
    }
}

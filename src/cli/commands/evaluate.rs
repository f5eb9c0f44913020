//! Evaluate command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::evaluation::EvaluationReport;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use console::style;

/// Run the reference question set and print the report.
pub async fn run_evaluate(json: bool, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(&settings, Operation::Ask) {
        Output::error(&e.to_string());
        Output::info("Run 'pitwall doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Running evaluation questions...");
    let report = orchestrator.evaluate().await;
    spinner.finish_and_clear();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &EvaluationReport) {
    Output::header("Evaluation");

    for result in &report.results {
        let marker = if result.success {
            style("✓").green()
        } else {
            style("✗").red()
        };
        println!(
            "\n  {} {} {}",
            marker,
            style(&result.question).bold(),
            style(format!("[{}]", result.category)).dim()
        );
        println!(
            "    keywords {:.2} | {} sources | similarity {:.3} | {:.0}ms",
            result.keyword_score, result.sources_found, result.avg_similarity, result.total_ms
        );
        match &result.error {
            Some(error) => println!("    {}", style(error).red()),
            None => println!("    {}", style(&result.answer_excerpt).dim()),
        }
    }

    Output::header("Summary");
    Output::kv(
        "Questions",
        &format!(
            "{} ({} successful, {} failed)",
            report.total_questions, report.successful, report.failed
        ),
    );
    Output::kv("Avg keyword score", &format!("{:.3}", report.avg_keyword_score));
    Output::kv("Avg retrieval", &format!("{:.0}ms", report.avg_retrieval_ms));
    Output::kv("Avg generation", &format!("{:.0}ms", report.avg_generation_ms));
    Output::kv("Avg sources", &format!("{:.2}", report.avg_sources_per_query));
}

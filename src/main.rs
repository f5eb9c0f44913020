//! Pitwall CLI entry point.

use anyhow::Result;
use clap::Parser;
use pitwall::cli::{commands, Cli, Commands};
use pitwall::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&Settings::expand_path(path)))?,
        None => Settings::load()?,
    };

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("pitwall={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Execute command
    match cli.command {
        Commands::Serve { host, port } => {
            commands::run_serve(host, port, settings).await?;
        }

        Commands::Ask {
            question,
            mode,
            top_k,
            namespace,
            json,
        } => {
            commands::run_ask(&question, mode, top_k, namespace, json, settings).await?;
        }

        Commands::Compare {
            question,
            top_k,
            namespace,
        } => {
            commands::run_compare(&question, top_k, namespace, settings).await?;
        }

        Commands::Ingest { source, force } => {
            commands::run_ingest(source, force, settings).await?;
        }

        Commands::Evaluate { json } => {
            commands::run_evaluate(json, settings).await?;
        }

        Commands::Status => {
            commands::run_status(settings).await?;
        }

        Commands::Namespaces => {
            commands::run_namespaces(settings).await?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings)?;
        }

        Commands::Config { action } => {
            commands::run_config(&action, cli.config.as_deref(), &settings)?;
        }
    }

    Ok(())
}

//! CLI module for Pitwall.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use crate::ingest::IngestionSource;
use crate::rag::ResponseMode;
use clap::{Parser, Subcommand};

/// Pitwall - Formula 1 question answering over a retrieval-augmented knowledge base
///
/// Ingests Wikipedia articles and Ergast race data into a vector store, then
/// answers questions grounded in what it retrieved, from the model alone, or both.
#[derive(Parser, Debug)]
#[command(name = "pitwall")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ask a question
    Ask {
        /// The question to ask
        question: String,

        /// Answer mode: rag, direct or compare
        #[arg(short, long, default_value = "rag")]
        mode: ResponseMode,

        /// Number of documents to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Only search this namespace
        #[arg(short, long)]
        namespace: Option<String>,

        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Answer a question with and without retrieval, side by side
    Compare {
        /// The question to ask
        question: String,

        /// Number of documents to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Only search this namespace
        #[arg(short, long)]
        namespace: Option<String>,
    },

    /// Populate the vector store from a source
    Ingest {
        /// wikipedia, ergast-results, ergast-drivers, ergast-constructors, ergast-circuits or all
        #[arg(default_value = "all")]
        source: IngestionSource,

        /// Clear the target namespaces before writing
        #[arg(short, long)]
        force: bool,
    },

    /// Run the reference question set and score the answers
    Evaluate {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check the vector store and model connections
    Status,

    /// List namespaces and their vector counts
    Namespaces,

    /// Check API keys and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}

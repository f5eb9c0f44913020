//! Knowledge-base ingestion: collect source documents, chunk, embed, upsert.

mod ergast;
mod pipeline;
mod wikipedia;

pub use ergast::{ErgastDataset, ErgastSource};
pub use pipeline::IngestionPipeline;
pub use wikipedia::{WikipediaPage, WikipediaSource, WIKIPEDIA_PAGES};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Namespace holding scraped encyclopedia articles.
pub const WIKIPEDIA_NAMESPACE: &str = "wikipedia";

/// A fetched document before chunking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    /// Where the document came from (its URL).
    pub source_id: String,
    pub title: String,
    pub category: String,
    /// Vector store namespace the document's chunks go to.
    pub namespace: String,
    pub content: String,
    /// Lower is more important.
    pub priority: u8,
    pub fetched_at: DateTime<Utc>,
}

/// Output of a collection run. Failures never abort the run; they are listed.
#[derive(Debug, Default)]
pub struct Collected {
    pub documents: Vec<RawDocument>,
    pub errors: Vec<String>,
}

/// A place documents are collected from.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Short name used in logs and results.
    fn name(&self) -> &str;

    /// Namespaces this source writes to.
    fn namespaces(&self) -> Vec<String>;

    /// Fetch every document this source knows about.
    async fn collect(&self) -> Collected;
}

/// What to ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum IngestionSource {
    Wikipedia,
    ErgastResults,
    ErgastDrivers,
    ErgastConstructors,
    ErgastCircuits,
    #[default]
    All,
}

impl IngestionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestionSource::Wikipedia => "wikipedia",
            IngestionSource::ErgastResults => "ergast-results",
            IngestionSource::ErgastDrivers => "ergast-drivers",
            IngestionSource::ErgastConstructors => "ergast-constructors",
            IngestionSource::ErgastCircuits => "ergast-circuits",
            IngestionSource::All => "all",
        }
    }

    /// Ergast datasets feeding this source (empty for Wikipedia).
    pub fn ergast_datasets(&self) -> Vec<ErgastDataset> {
        match self {
            IngestionSource::Wikipedia => Vec::new(),
            IngestionSource::ErgastResults => vec![
                ErgastDataset::RaceResults,
                ErgastDataset::DriverStandings,
                ErgastDataset::ConstructorStandings,
            ],
            IngestionSource::ErgastDrivers => vec![ErgastDataset::Drivers],
            IngestionSource::ErgastConstructors => vec![ErgastDataset::Constructors],
            IngestionSource::ErgastCircuits => vec![ErgastDataset::Circuits],
            IngestionSource::All => ErgastDataset::ALL.to_vec(),
        }
    }

    pub fn includes_wikipedia(&self) -> bool {
        matches!(self, IngestionSource::Wikipedia | IngestionSource::All)
    }
}

impl std::fmt::Display for IngestionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IngestionSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wikipedia" => Ok(IngestionSource::Wikipedia),
            "ergast-results" => Ok(IngestionSource::ErgastResults),
            "ergast-drivers" => Ok(IngestionSource::ErgastDrivers),
            "ergast-constructors" => Ok(IngestionSource::ErgastConstructors),
            "ergast-circuits" => Ok(IngestionSource::ErgastCircuits),
            "all" => Ok(IngestionSource::All),
            _ => Err(format!(
                "Unknown source: {} (expected wikipedia, ergast-results, ergast-drivers, \
                 ergast-constructors, ergast-circuits or all)",
                s
            )),
        }
    }
}

/// Outcome of an ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionResult {
    pub success: bool,
    pub source: String,
    pub documents_processed: usize,
    pub chunks_created: usize,
    pub vectors_upserted: usize,
    /// Namespaces written to, sorted.
    pub namespaces: Vec<String>,
    pub errors: Vec<String>,
    pub duration_seconds: f64,
}

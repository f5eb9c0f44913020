//! Wikipedia articles, fetched as plain text through the MediaWiki API.

use super::{Collected, DocumentSource, RawDocument, WIKIPEDIA_NAMESPACE};
use crate::client::send_json;
use crate::error::{PitwallError, Result, Stage};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, instrument, warn};
use url::Url;

/// Articles shorter than this are treated as failed fetches.
const MIN_CONTENT_CHARS: usize = 100;

/// A page in the fixed article list.
#[derive(Debug, Clone, Copy)]
pub struct WikipediaPage {
    pub url: &'static str,
    pub title: &'static str,
    pub category: &'static str,
    pub priority: u8,
}

/// Seasons, teams (including the 2026 entrants) and the 2026 regulations.
pub const WIKIPEDIA_PAGES: &[WikipediaPage] = &[
    WikipediaPage {
        url: "https://en.wikipedia.org/wiki/2025_Formula_One_World_Championship",
        title: "2025 F1 Season",
        category: "season",
        priority: 1,
    },
    WikipediaPage {
        url: "https://en.wikipedia.org/wiki/2026_Formula_One_World_Championship",
        title: "2026 F1 Season",
        category: "season",
        priority: 1,
    },
    WikipediaPage {
        url: "https://en.wikipedia.org/wiki/Red_Bull_Racing",
        title: "Red Bull Racing",
        category: "team",
        priority: 1,
    },
    WikipediaPage {
        url: "https://en.wikipedia.org/wiki/Scuderia_Ferrari",
        title: "Ferrari",
        category: "team",
        priority: 1,
    },
    WikipediaPage {
        url: "https://en.wikipedia.org/wiki/McLaren",
        title: "McLaren",
        category: "team",
        priority: 1,
    },
    WikipediaPage {
        url: "https://en.wikipedia.org/wiki/Mercedes-Benz_in_Formula_One",
        title: "Mercedes F1",
        category: "team",
        priority: 1,
    },
    WikipediaPage {
        url: "https://en.wikipedia.org/wiki/Cadillac_in_Formula_One",
        title: "Cadillac F1 (2026 Entry)",
        category: "team",
        priority: 1,
    },
    WikipediaPage {
        url: "https://en.wikipedia.org/wiki/Audi_in_Formula_One",
        title: "Audi F1 (Sauber Takeover)",
        category: "team",
        priority: 1,
    },
    WikipediaPage {
        url: "https://en.wikipedia.org/wiki/2026_Formula_One_regulations",
        title: "2026 F1 Regulations",
        category: "regulations",
        priority: 1,
    },
];

impl WikipediaPage {
    /// Article title as used by the MediaWiki API (the last path segment).
    pub fn article_title(&self) -> Result<String> {
        let url = Url::parse(self.url)
            .map_err(|e| PitwallError::InvalidConfiguration(format!("{}: {}", self.url, e)))?;
        url.path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_string))
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PitwallError::InvalidConfiguration(format!("no article in {}", self.url)))
    }
}

/// Collects the fixed article list.
pub struct WikipediaSource {
    client: reqwest::Client,
    api_url: String,
    pages: Vec<WikipediaPage>,
    delay: Duration,
    retries: usize,
}

impl WikipediaSource {
    pub fn new(client: reqwest::Client, api_url: &str, delay: Duration, retries: usize) -> Self {
        let mut pages = WIKIPEDIA_PAGES.to_vec();
        pages.sort_by_key(|p| p.priority);
        Self {
            client,
            api_url: api_url.to_string(),
            pages,
            delay,
            retries,
        }
    }

    #[instrument(skip(self, page), fields(title = page.title))]
    async fn fetch(&self, page: &WikipediaPage) -> Result<RawDocument> {
        let article = page.article_title()?;
        let request = self.client.get(&self.api_url).query(&[
            ("action", "query"),
            ("prop", "extracts"),
            ("explaintext", "1"),
            ("redirects", "1"),
            ("format", "json"),
            ("formatversion", "2"),
            ("titles", article.as_str()),
        ]);

        let response: QueryResponse =
            send_json(request, self.retries, Stage::Source, "Wikipedia extract").await?;
        let content = response.extract().unwrap_or_default();

        let chars = content.chars().count();
        if chars < MIN_CONTENT_CHARS {
            return Err(PitwallError::unavailable(
                Stage::Source,
                format!("only {} chars extracted", chars),
            ));
        }

        info!("Scraped {}: {} chars", page.title, chars);
        Ok(RawDocument {
            source_id: page.url.to_string(),
            title: page.title.to_string(),
            category: page.category.to_string(),
            namespace: WIKIPEDIA_NAMESPACE.to_string(),
            content,
            priority: page.priority,
            fetched_at: Utc::now(),
        })
    }
}

#[async_trait]
impl DocumentSource for WikipediaSource {
    fn name(&self) -> &str {
        "wikipedia"
    }

    fn namespaces(&self) -> Vec<String> {
        vec![WIKIPEDIA_NAMESPACE.to_string()]
    }

    async fn collect(&self) -> Collected {
        let mut collected = Collected::default();

        for (i, page) in self.pages.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            match self.fetch(page).await {
                Ok(doc) => collected.documents.push(doc),
                Err(e) => {
                    warn!("Failed to scrape {}: {}", page.url, e);
                    collected
                        .errors
                        .push(format!("Failed: {} ({}): {}", page.title, page.url, e));
                }
            }
        }

        info!(
            "Wikipedia scrape complete: {} ok, {} failed",
            collected.documents.len(),
            collected.errors.len()
        );
        collected
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    query: Option<QueryPages>,
}

#[derive(Debug, Deserialize)]
struct QueryPages {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    missing: bool,
    extract: Option<String>,
}

impl QueryResponse {
    fn extract(self) -> Option<String> {
        self.query?
            .pages
            .into_iter()
            .find(|p| !p.missing)
            .and_then(|p| p.extract)
            .map(|text| text.trim().to_string())
    }
}

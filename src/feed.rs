use std::time::Duration;

use chrono::{DateTime, Utc};
use feed_rs::parser;
use reqwest::Client;
use tracing::{error, info};

const FEED_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = "AiTrends/1.0 (AI News Aggregator)";

/// One normalized entry from an RSS/Atom feed.
#[derive(Debug, Clone)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub published: DateTime<Utc>,
    pub snippet: Option<String>,
    pub guid: String,
}

pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(FEED_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    /// Fetch and normalize a feed. Entries without a title or link are
    /// dropped; a missing publish date falls back to now. Any network or
    /// parse failure yields an empty list, which callers treat as zero new
    /// items rather than a fatal error.
    pub async fn fetch_feed(&self, feed_url: &str) -> Vec<FeedItem> {
        info!("Fetching feed: {}", feed_url);

        let bytes = match self.fetch_bytes(feed_url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Failed to fetch feed {}: {}", feed_url, e);
                return Vec::new();
            }
        };

        let parsed = match parser::parse(&bytes[..]) {
            Ok(feed) => feed,
            Err(e) => {
                error!("Failed to parse feed {}: {}", feed_url, e);
                return Vec::new();
            }
        };

        let items: Vec<FeedItem> = parsed
            .entries
            .into_iter()
            .filter_map(|entry| {
                let title = entry.title.as_ref().map(|t| t.content.clone())?;
                let link = entry.links.first().map(|l| l.href.clone())?;
                if title.is_empty() || link.is_empty() {
                    return None;
                }

                let published: DateTime<Utc> = entry
                    .published
                    .or(entry.updated)
                    .map(|dt| dt.into())
                    .unwrap_or_else(Utc::now);

                let guid = if entry.id.is_empty() {
                    link.clone()
                } else {
                    entry.id.clone()
                };

                Some(FeedItem {
                    title,
                    link,
                    published,
                    snippet: entry.summary.map(|s| s.content),
                    guid,
                })
            })
            .collect();

        info!("Fetched {} items from {}", items.len(), feed_url);
        items
    }

    async fn fetch_bytes(&self, feed_url: &str) -> anyhow::Result<Vec<u8>> {
        let response = self.client.get(feed_url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("HTTP {}", response.status());
        }
        Ok(response.bytes().await?.to_vec())
    }
}

impl Default for FeedFetcher {
    fn default() -> Self {
        Self::new()
    }
}

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::SummarizerConfig;
use crate::db::Database;
use crate::scraper::Scraper;

const REQUEST_TIMEOUT_SECS: u64 = 60;
const ANTHROPIC_VERSION: &str = "2023-06-01";
// ~2500 tokens; keeps long articles inside the model context window
const MAX_CONTENT_CHARS: usize = 10_000;
const MAX_RETRIES: u32 = 3;
const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(1000);

const SYSTEM_PROMPT: &str = "\
You are an AI news summarizer. Your task is to create concise, informative summaries of AI-related articles.

Focus on:
- Key developments and announcements
- Technical implications and innovations
- Why this matters to the AI community
- Practical applications or impacts

Keep summaries:
- Under 150 words
- Factual and objective
- Accessible to a technical audience
- Free of marketing language

Return only the summary text, no headers or prefixes.";

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("summarization request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("summarization API error: {0}")]
    Api(String),
    #[error("no text content in model response")]
    EmptyResponse,
}

#[derive(Debug, Serialize)]
struct MessageRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

pub struct Summarizer {
    client: Client,
    db: Arc<Database>,
    scraper: Arc<Scraper>,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    batch_size: i64,
    retry_delay: Duration,
}

impl Summarizer {
    pub fn new(
        config: &SummarizerConfig,
        api_key: String,
        db: Arc<Database>,
        scraper: Arc<Scraper>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            db,
            scraper,
            api_key,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            batch_size: config.batch_size,
            retry_delay: INITIAL_RETRY_DELAY,
        }
    }

    /// Produce a bounded-length summary of `content`, retrying transient
    /// failures with exponential backoff. After the final attempt the last
    /// error propagates: a permanently failed summary must be visible to
    /// the caller.
    pub async fn summarize_article(&self, content: &str) -> Result<String, SummarizeError> {
        let content = truncate_chars(content, MAX_CONTENT_CHARS);

        let mut last_error = None;
        for attempt in 1..=MAX_RETRIES {
            debug!("Summarization attempt {}/{}", attempt, MAX_RETRIES);

            match self.request_summary(content).await {
                Ok(summary) => return Ok(summary),
                Err(e) => {
                    warn!("Summarization attempt {} failed: {}", attempt, e);
                    last_error = Some(e);

                    if attempt < MAX_RETRIES {
                        let delay = self.retry_delay * 2u32.pow(attempt - 1);
                        debug!("Retrying in {:?}", delay);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(SummarizeError::EmptyResponse))
    }

    async fn request_summary(&self, content: &str) -> Result<String, SummarizeError> {
        let request = MessageRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: SYSTEM_PROMPT.to_string(),
            messages: vec![Message {
                role: "user".to_string(),
                content: format!("Please summarize this article:\n\n{}", content),
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizeError::Api(format!("HTTP {}: {}", status, body)));
        }

        let message: MessageResponse = response.json().await?;
        let text = message
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or(SummarizeError::EmptyResponse)?;

        Ok(text.trim().to_string())
    }

    /// Work through the summarization backlog: scrape and summarize up to
    /// `limit` unsummarized articles, newest first. Per-article failures are
    /// logged and skipped so one bad article never blocks the batch. Returns
    /// the number of articles successfully summarized.
    pub async fn summarize_unsummarized(&self, limit: Option<i64>) -> usize {
        let limit = limit.unwrap_or(self.batch_size);

        let articles = match self.db.get_unsummarized(limit).await {
            Ok(articles) => articles,
            Err(e) => {
                error!("Failed to query summarization backlog: {}", e);
                return 0;
            }
        };

        info!("Found {} articles to summarize", articles.len());

        let mut summarized = 0;
        for article in articles {
            let scraped = match self.scraper.scrape_article(&article.url).await {
                Some(scraped) => scraped,
                None => {
                    warn!("Could not scrape content for: {}", article.title);
                    continue;
                }
            };

            debug!(
                "Scraped content for \"{}\": {} characters",
                article.title,
                scraped.content.len()
            );

            let summary = match self.summarize_article(&scraped.content).await {
                Ok(summary) => summary,
                Err(e) => {
                    error!("Failed to summarize article {}: {}", article.title, e);
                    continue;
                }
            };

            match self.db.set_article_summary(article.id, &summary).await {
                Ok(()) => {
                    summarized += 1;
                    info!("Summarized article: {}", article.title);
                }
                Err(e) => error!("Failed to store summary for {}: {}", article.title, e),
            }
        }

        info!("Summarization complete: {} articles processed", summarized);
        summarized
    }
}

fn truncate_chars(content: &str, max_chars: usize) -> &str {
    match content.char_indices().nth(max_chars) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}

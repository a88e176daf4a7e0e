use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, error, warn};
use url::Url;

use crate::rate_limit::DomainRateLimiter;

const SCRAPE_TIMEOUT_SECS: u64 = 30;
// Desktop user agent; article pages often serve stripped markup to bots
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";
const RENDER_WIDTH: usize = 80;
const MIN_CONTENT_LENGTH: usize = 200;

#[derive(Debug, Clone)]
pub struct ScrapedArticle {
    pub title: String,
    pub content: String,
    pub author: Option<String>,
    pub published: Option<String>,
    pub description: Option<String>,
}

pub struct Scraper {
    client: Client,
    limiter: Arc<DomainRateLimiter>,
}

impl Scraper {
    pub fn new(limiter: Arc<DomainRateLimiter>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(SCRAPE_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, limiter }
    }

    /// Fetch an article page and extract its readable content. Returns None
    /// on any failure: a page that cannot be scraped is skipped, never
    /// fatal to the caller.
    pub async fn scrape_article(&self, url: &str) -> Option<ScrapedArticle> {
        let domain = domain_of(url);
        self.limiter.wait_for_domain(&domain).await;

        debug!("Scraping article: {}", url);

        let html = match self.fetch_html(url).await {
            Ok(html) => html,
            Err(e) => {
                error!("Failed to scrape article {}: {}", url, e);
                return None;
            }
        };

        let content = match extract_readable_text(&html) {
            Some(content) => content,
            None => {
                warn!("No content extracted from {}", url);
                return None;
            }
        };

        Some(ScrapedArticle {
            title: extract_title(&html).unwrap_or_default(),
            content,
            author: extract_meta_content(&html, "name=\"author\""),
            published: extract_meta_content(&html, "property=\"article:published_time\""),
            description: extract_meta_content(&html, "name=\"description\""),
        })
    }

    async fn fetch_html(&self, url: &str) -> anyhow::Result<String> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("HTTP {}", response.status());
        }
        Ok(response.text().await?)
    }
}

/// Rate-limit key for a URL; falls back to the raw string when it does not
/// parse, so malformed URLs still throttle consistently.
fn domain_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .unwrap_or_else(|| url.to_string())
}

fn extract_readable_text(html: &str) -> Option<String> {
    let text = match html2text::from_read(html.as_bytes(), RENDER_WIDTH) {
        Ok(text) => text,
        Err(e) => {
            debug!("Failed to convert HTML to text: {}", e);
            return None;
        }
    };

    let cleaned: String = text
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if cleaned.len() >= MIN_CONTENT_LENGTH {
        Some(cleaned)
    } else {
        debug!("Extracted content too short ({} chars)", cleaned.len());
        None
    }
}

fn extract_title(html: &str) -> Option<String> {
    let start = html.find("<title>")? + "<title>".len();
    let end = html[start..].find("</title>")? + start;
    let title = html[start..end].trim();
    (!title.is_empty()).then(|| title.to_string())
}

/// Pull the content attribute out of the meta tag carrying `attr`
/// (e.g. `name="description"`).
fn extract_meta_content(html: &str, attr: &str) -> Option<String> {
    let pos = html.find(attr)?;
    let tag_start = html[..pos].rfind('<')?;
    let tag_end = html[pos..].find('>')? + pos;
    let tag = &html[tag_start..tag_end];

    let content_start = tag.find("content=\"")? + "content=\"".len();
    let content_end = tag[content_start..].find('"')? + content_start;
    let value = tag[content_start..content_end].trim();
    (!value.is_empty()).then(|| value.to_string())
}

//! AI Trends Tracker - an AI news aggregation service
//!
//! Fetches articles from configured RSS sources, deduplicates them by
//! content fingerprint, enriches them with model-generated summaries, and
//! serves them over a JSON API with pagination, filtering, and sorting.

pub mod config;
pub mod db;
pub mod feed;
pub mod hash;
pub mod rate_limit;
pub mod refresh;
pub mod routes;
pub mod scraper;
pub mod summarizer;

mod config;
mod db;
mod feed;
mod hash;
mod rate_limit;
mod refresh;
mod routes;
mod scraper;
mod summarizer;

use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::Database;
use crate::feed::FeedFetcher;
use crate::rate_limit::DomainRateLimiter;
use crate::refresh::{start_background_refresh, Refresher};
use crate::routes::AppState;
use crate::scraper::Scraper;
use crate::summarizer::Summarizer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ai_trends=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load("config.toml")?;
    info!("Loaded {} sources from configuration", config.sources.len());

    let api_key = std::env::var("ANTHROPIC_API_KEY")
        .map_err(|_| anyhow::anyhow!("ANTHROPIC_API_KEY environment variable is required"))?;

    // Initialize database
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:ai_trends.db?mode=rwc".to_string());
    let db = Database::new(&database_url).await?;
    db.initialize().await?;
    db.sync_sources(&config.sources).await?;
    info!("Database initialized");

    let db = Arc::new(db);

    // Wire up the ingestion pipeline
    let limiter = Arc::new(DomainRateLimiter::new());
    let scraper = Arc::new(Scraper::new(limiter));
    let summarizer = Arc::new(Summarizer::new(
        &config.summarizer,
        api_key,
        db.clone(),
        scraper,
    ));
    let refresher = Arc::new(Refresher::new(db.clone(), FeedFetcher::new(), summarizer));

    // Start the scheduled refresh loop unless disabled
    if config.refresh_interval > 0 {
        let bg_refresher = refresher.clone();
        let refresh_interval = config.refresh_interval;
        tokio::spawn(async move {
            start_background_refresh(bg_refresher, refresh_interval).await;
        });
    } else {
        info!("Scheduled refresh disabled; refresh via POST /api/refresh");
    }

    // Create app state and router
    let state = Arc::new(AppState {
        db: db.clone(),
        refresher: refresher.clone(),
    });
    let app = routes::router(state).layer(TraceLayer::new_for_http());

    // Start server
    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("Server starting on http://localhost:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}

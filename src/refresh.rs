use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::db::{Database, RefreshRun};
use crate::feed::FeedFetcher;
use crate::hash::content_hash;
use crate::summarizer::Summarizer;

/// Per-run ingestion counters, summed across sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshStats {
    pub found: i64,
    pub new: i64,
    pub errors: i64,
}

impl RefreshStats {
    fn absorb(&mut self, other: RefreshStats) {
        self.found += other.found;
        self.new += other.new;
        self.errors += other.errors;
    }
}

/// Coordinates one refresh cycle: feed fetch per source, dedupe/insert,
/// backlog summarization, and the audited run record around it all.
pub struct Refresher {
    db: Arc<Database>,
    feeds: FeedFetcher,
    summarizer: Arc<Summarizer>,
}

impl Refresher {
    pub fn new(db: Arc<Database>, feeds: FeedFetcher, summarizer: Arc<Summarizer>) -> Self {
        Self {
            db,
            feeds,
            summarizer,
        }
    }

    /// Ingest one source's feed. Infallible by contract: a missing source,
    /// a missing feed URL, and every per-item failure resolve into the
    /// returned counters. A single bad item never aborts the batch.
    pub async fn refresh_source(&self, source_id: i64) -> RefreshStats {
        let mut stats = RefreshStats::default();

        let source = match self.db.get_source(source_id).await {
            Ok(Some(source)) => source,
            Ok(None) => {
                warn!("Source {} not found", source_id);
                return stats;
            }
            Err(e) => {
                error!("Failed to look up source {}: {}", source_id, e);
                stats.errors += 1;
                return stats;
            }
        };

        let Some(feed_url) = source.feed_url.as_deref() else {
            warn!("Source {} has no feed URL", source.slug);
            return stats;
        };

        info!("Refreshing source: {}", source.name);

        let items = self.feeds.fetch_feed(feed_url).await;
        stats.found = items.len() as i64;

        for item in items {
            let hash = content_hash(&item.link, &item.title);

            match self.db.article_exists(&hash).await {
                Ok(true) => {
                    debug!("Article already exists: {}", item.title);
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    stats.errors += 1;
                    error!("Error processing article {}: {}", item.title, e);
                    continue;
                }
            }

            match self
                .db
                .insert_article(source.id, &item.title, &item.link, &hash, item.published)
                .await
            {
                Ok(true) => {
                    stats.new += 1;
                    info!("Added new article: {}", item.title);
                }
                // Lost the race to another writer; same as already existing
                Ok(false) => debug!("Article already exists: {}", item.title),
                Err(e) => {
                    stats.errors += 1;
                    error!("Error processing article {}: {}", item.title, e);
                }
            }
        }

        info!(
            "Source {} refresh complete: {} found, {} new, {} errors",
            source.name, stats.found, stats.new, stats.errors
        );
        stats
    }

    /// Refresh every active source sequentially and sum the counters.
    /// Sequential processing keeps per-domain rate limiting honest and
    /// bounds load on the feed hosts and the store. Only the source listing
    /// itself can fail here; that failure belongs to the run, not a source.
    pub async fn refresh_all_sources(&self) -> anyhow::Result<RefreshStats> {
        let sources = self.db.get_active_sources().await?;
        info!("Refreshing {} active sources", sources.len());

        let mut aggregated = RefreshStats::default();
        for source in sources {
            aggregated.absorb(self.refresh_source(source.id).await);
        }

        info!(
            "All sources refresh complete: {} found, {} new, {} errors",
            aggregated.found, aggregated.new, aggregated.errors
        );
        Ok(aggregated)
    }

    /// One audited end-to-end refresh invocation. Creates a running run
    /// record, refreshes all sources, summarizes the backlog, and records
    /// the terminal state. On failure the same record is marked failed with
    /// the error message before the error is re-surfaced, so a run is never
    /// left in running state after this returns.
    pub async fn run_refresh(&self) -> anyhow::Result<RefreshRun> {
        info!("Starting content refresh");
        let run = self.db.create_run().await?;

        match self.execute(run.id).await {
            Ok(completed) => Ok(completed),
            Err(e) => {
                if let Err(mark_err) = self.db.fail_run(run.id, &e.to_string()).await {
                    error!("Failed to record failed run {}: {}", run.id, mark_err);
                }
                Err(e)
            }
        }
    }

    async fn execute(&self, run_id: i64) -> anyhow::Result<RefreshRun> {
        let stats = self.refresh_all_sources().await?;
        let summarized = self.summarizer.summarize_unsummarized(None).await;

        self.db
            .complete_run(run_id, stats.found, stats.new, summarized as i64)
            .await?;

        let completed = self
            .db
            .get_run(run_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("refresh run {} missing after completion", run_id))?;

        info!("Content refresh completed successfully");
        Ok(completed)
    }
}

/// Scheduled trigger: an initial refresh, then one per interval, each an
/// ordinary audited run.
pub async fn start_background_refresh(refresher: Arc<Refresher>, interval_minutes: u64) {
    let interval = Duration::from_secs(interval_minutes * 60);

    info!("Starting initial content refresh");
    if let Err(e) = refresher.run_refresh().await {
        error!("Initial refresh failed: {}", e);
    }

    loop {
        tokio::time::sleep(interval).await;
        info!("Starting scheduled content refresh");
        if let Err(e) = refresher.run_refresh().await {
            error!("Scheduled refresh failed: {}", e);
        }
    }
}

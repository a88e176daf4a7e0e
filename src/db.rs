use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqlitePoolOptions, FromRow, SqlitePool};

use crate::config::SourceConfig;

#[derive(Debug, Clone, FromRow)]
pub struct Source {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub kind: String,
    pub feed_url: Option<String>,
    pub website_url: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct SourceWithCount {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub kind: String,
    pub website_url: String,
    pub is_active: bool,
    pub article_count: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct Article {
    pub id: i64,
    pub source_id: i64,
    pub title: String,
    pub url: String,
    pub content_hash: String,
    pub published_at: String,
    pub fetched_at: String,
    pub summary: Option<String>,
    pub summarized_at: Option<String>,
}

/// Article row joined with the owning source's display fields.
#[derive(Debug, Clone, FromRow)]
pub struct ArticleWithSource {
    pub id: i64,
    pub source_id: i64,
    pub title: String,
    pub url: String,
    pub content_hash: String,
    pub published_at: String,
    pub fetched_at: String,
    pub summary: Option<String>,
    pub summarized_at: Option<String>,
    pub source_name: String,
    pub source_slug: String,
    pub source_website_url: String,
}

/// Audit record for one refresh invocation. Lifecycle is strictly linear:
/// running -> completed | failed, never re-opened.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRun {
    pub id: i64,
    pub status: String,
    pub articles_found: i64,
    pub articles_new: i64,
    pub articles_summarized: i64,
    pub error_message: Option<String>,
    pub started_at: String,
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum SortBy {
    #[serde(rename = "publishedAt")]
    PublishedAt,
    #[serde(rename = "fetchedAt")]
    FetchedAt,
}

impl SortBy {
    fn column(self) -> &'static str {
        match self {
            SortBy::PublishedAt => "a.published_at",
            SortBy::FetchedAt => "a.fetched_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum SortOrder {
    #[serde(rename = "asc")]
    Asc,
    #[serde(rename = "desc")]
    Desc,
}

impl SortOrder {
    fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

const ARTICLE_SELECT: &str = r#"
    SELECT a.id, a.source_id, a.title, a.url, a.content_hash,
           a.published_at, a.fetched_at, a.summary, a.summarized_at,
           s.name AS source_name, s.slug AS source_slug,
           s.website_url AS source_website_url
    FROM articles a
    JOIN sources s ON s.id = a.source_id
"#;

pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn initialize(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sources (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                kind TEXT NOT NULL DEFAULT 'rss',
                feed_url TEXT,
                website_url TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY,
                source_id INTEGER NOT NULL REFERENCES sources(id),
                title TEXT NOT NULL,
                url TEXT NOT NULL,
                content_hash TEXT NOT NULL UNIQUE,
                published_at TEXT NOT NULL,
                fetched_at TEXT NOT NULL,
                summary TEXT,
                summarized_at TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_articles_published
            ON articles(published_at DESC)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_articles_source
            ON articles(source_id)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS refresh_runs (
                id INTEGER PRIMARY KEY,
                status TEXT NOT NULL,
                articles_found INTEGER NOT NULL DEFAULT 0,
                articles_new INTEGER NOT NULL DEFAULT 0,
                articles_summarized INTEGER NOT NULL DEFAULT 0,
                error_message TEXT,
                started_at TEXT NOT NULL,
                completed_at TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_runs_started
            ON refresh_runs(started_at DESC)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Upsert the configured source registry, keyed by slug.
    pub async fn sync_sources(&self, configs: &[SourceConfig]) -> anyhow::Result<()> {
        for config in configs {
            sqlx::query(
                r#"
                INSERT INTO sources (name, slug, kind, feed_url, website_url, is_active)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(slug) DO UPDATE SET
                    name = excluded.name,
                    kind = excluded.kind,
                    feed_url = excluded.feed_url,
                    website_url = excluded.website_url,
                    is_active = excluded.is_active
                "#,
            )
            .bind(&config.name)
            .bind(&config.slug)
            .bind(&config.kind)
            .bind(&config.feed_url)
            .bind(&config.website_url)
            .bind(config.is_active)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    pub async fn get_active_sources(&self) -> anyhow::Result<Vec<Source>> {
        let sources =
            sqlx::query_as::<_, Source>("SELECT * FROM sources WHERE is_active = 1 ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(sources)
    }

    pub async fn get_source(&self, source_id: i64) -> anyhow::Result<Option<Source>> {
        let source = sqlx::query_as::<_, Source>("SELECT * FROM sources WHERE id = ?")
            .bind(source_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(source)
    }

    pub async fn get_sources_with_counts(&self) -> anyhow::Result<Vec<SourceWithCount>> {
        let sources = sqlx::query_as::<_, SourceWithCount>(
            r#"
            SELECT s.id, s.name, s.slug, s.kind, s.website_url, s.is_active,
                   COUNT(a.id) AS article_count
            FROM sources s
            LEFT JOIN articles a ON a.source_id = s.id
            WHERE s.is_active = 1
            GROUP BY s.id
            ORDER BY s.name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(sources)
    }

    pub async fn article_exists(&self, content_hash: &str) -> anyhow::Result<bool> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM articles WHERE content_hash = ?")
                .bind(content_hash)
                .fetch_one(&self.pool)
                .await?;
        Ok(count.0 > 0)
    }

    /// Insert a new article, returning false when the fingerprint already
    /// exists. A duplicate is an expected outcome, never an error.
    pub async fn insert_article(
        &self,
        source_id: i64,
        title: &str,
        url: &str,
        content_hash: &str,
        published_at: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO articles (source_id, title, url, content_hash, published_at, fetched_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(content_hash) DO NOTHING
            "#,
        )
        .bind(source_id)
        .bind(title)
        .bind(url)
        .bind(content_hash)
        .bind(published_at.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_articles(
        &self,
        source_slug: Option<&str>,
        sort_by: SortBy,
        sort_order: SortOrder,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<ArticleWithSource>> {
        // Sort column and direction come from closed enums, never user text
        let order = format!("ORDER BY {} {}", sort_by.column(), sort_order.keyword());

        let articles = match source_slug {
            Some(slug) => {
                let sql = format!("{ARTICLE_SELECT} WHERE s.slug = ? {order} LIMIT ? OFFSET ?");
                sqlx::query_as::<_, ArticleWithSource>(&sql)
                    .bind(slug)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!("{ARTICLE_SELECT} {order} LIMIT ? OFFSET ?");
                sqlx::query_as::<_, ArticleWithSource>(&sql)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(articles)
    }

    pub async fn count_articles(&self, source_slug: Option<&str>) -> anyhow::Result<i64> {
        let count: (i64,) = match source_slug {
            Some(slug) => {
                sqlx::query_as(
                    r#"
                    SELECT COUNT(*) FROM articles a
                    JOIN sources s ON s.id = a.source_id
                    WHERE s.slug = ?
                    "#,
                )
                .bind(slug)
                .fetch_one(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as("SELECT COUNT(*) FROM articles")
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(count.0)
    }

    pub async fn get_article(&self, id: i64) -> anyhow::Result<Option<ArticleWithSource>> {
        let sql = format!("{ARTICLE_SELECT} WHERE a.id = ?");
        let article = sqlx::query_as::<_, ArticleWithSource>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(article)
    }

    /// The summarization backlog: articles with no summary yet,
    /// most-recently-published first.
    pub async fn get_unsummarized(&self, limit: i64) -> anyhow::Result<Vec<Article>> {
        let articles = sqlx::query_as::<_, Article>(
            r#"
            SELECT * FROM articles
            WHERE summary IS NULL
            ORDER BY published_at DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(articles)
    }

    pub async fn set_article_summary(&self, id: i64, summary: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE articles SET summary = ?, summarized_at = ? WHERE id = ?")
            .bind(summary)
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn create_run(&self) -> anyhow::Result<RefreshRun> {
        let started_at = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"
            INSERT INTO refresh_runs (status, articles_found, articles_new, articles_summarized, started_at)
            VALUES ('running', 0, 0, 0, ?)
            "#,
        )
        .bind(&started_at)
        .execute(&self.pool)
        .await?;

        Ok(RefreshRun {
            id: result.last_insert_rowid(),
            status: "running".to_string(),
            articles_found: 0,
            articles_new: 0,
            articles_summarized: 0,
            error_message: None,
            started_at,
            completed_at: None,
        })
    }

    pub async fn complete_run(
        &self,
        id: i64,
        found: i64,
        new: i64,
        summarized: i64,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE refresh_runs
            SET status = 'completed', articles_found = ?, articles_new = ?,
                articles_summarized = ?, completed_at = ?
            WHERE id = ?
            "#,
        )
        .bind(found)
        .bind(new)
        .bind(summarized)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn fail_run(&self, id: i64, message: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE refresh_runs
            SET status = 'failed', error_message = ?, completed_at = ?
            WHERE id = ?
            "#,
        )
        .bind(message)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_run(&self, id: i64) -> anyhow::Result<Option<RefreshRun>> {
        let run = sqlx::query_as::<_, RefreshRun>("SELECT * FROM refresh_runs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(run)
    }

    /// Most recently started run, or None when no refresh has ever executed.
    pub async fn get_latest_run(&self) -> anyhow::Result<Option<RefreshRun>> {
        let run = sqlx::query_as::<_, RefreshRun>(
            "SELECT * FROM refresh_runs ORDER BY started_at DESC, id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(run)
    }
}

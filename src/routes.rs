use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db::{ArticleWithSource, Database, SortBy, SortOrder, SourceWithCount};
use crate::refresh::Refresher;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

pub struct AppState {
    pub db: Arc<Database>,
    pub refresher: Arc<Refresher>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/articles", get(list_articles))
        .route("/api/articles/:id", get(get_article))
        .route("/api/sources", get(list_sources))
        .route("/api/refresh", post(trigger_refresh))
        .route("/api/refresh/status", get(refresh_status))
        .with_state(state)
}

// API error envelope shared by every handler
pub enum ApiError {
    NotFound(String),
    Validation(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "NOT_FOUND", message),
            ApiError::Validation(message) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
            }
            ApiError::Internal(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
        };

        (
            status,
            Json(json!({
                "success": false,
                "error": { "code": code, "message": message }
            })),
        )
            .into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for ApiError {
    fn from(err: E) -> Self {
        ApiError::Internal(err.into())
    }
}

// Response DTOs
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub website_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleResponse {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub summary: Option<String>,
    pub published_at: String,
    pub fetched_at: String,
    pub summarized_at: Option<String>,
    pub source: SourceRef,
}

impl From<ArticleWithSource> for ArticleResponse {
    fn from(article: ArticleWithSource) -> Self {
        Self {
            id: article.id,
            title: article.title,
            url: article.url,
            summary: article.summary,
            published_at: article.published_at,
            fetched_at: article.fetched_at,
            summarized_at: article.summarized_at,
            source: SourceRef {
                id: article.source_id,
                name: article.source_name,
                slug: article.source_slug,
                website_url: article.source_website_url,
            },
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceResponse {
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub website_url: String,
    pub is_active: bool,
    pub article_count: i64,
}

impl From<SourceWithCount> for SourceResponse {
    fn from(source: SourceWithCount) -> Self {
        Self {
            id: source.id,
            name: source.name,
            slug: source.slug,
            kind: source.kind,
            website_url: source.website_url,
            is_active: source.is_active,
            article_count: source.article_count,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

#[derive(Serialize)]
struct DataResponse<T: Serialize> {
    success: bool,
    data: T,
}

#[derive(Serialize)]
struct PaginatedResponse<T: Serialize> {
    success: bool,
    data: Vec<T>,
    pagination: Pagination,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlesQuery {
    pub source: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default = "default_sort_by")]
    pub sort_by: SortBy,
    #[serde(default = "default_sort_order")]
    pub sort_order: SortOrder,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_SIZE
}

fn default_sort_by() -> SortBy {
    SortBy::PublishedAt
}

fn default_sort_order() -> SortOrder {
    SortOrder::Desc
}

// Route handlers
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "timestamp": Utc::now().to_rfc3339() }))
}

pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ArticlesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if query.page < 1 {
        return Err(ApiError::Validation("page must be a positive integer".to_string()));
    }
    if query.limit < 1 || query.limit > MAX_PAGE_SIZE {
        return Err(ApiError::Validation(format!(
            "limit must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }

    let source = query.source.as_deref();
    let total = state.db.count_articles(source).await?;
    let offset = (query.page - 1) * query.limit;
    let articles = state
        .db
        .get_articles(source, query.sort_by, query.sort_order, query.limit, offset)
        .await?;

    Ok(Json(PaginatedResponse {
        success: true,
        data: articles.into_iter().map(ArticleResponse::from).collect(),
        pagination: Pagination {
            page: query.page,
            limit: query.limit,
            total,
            total_pages: (total + query.limit - 1) / query.limit,
        },
    }))
}

pub async fn get_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let article = state
        .db
        .get_article(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Article not found".to_string()))?;

    Ok(Json(DataResponse {
        success: true,
        data: ArticleResponse::from(article),
    }))
}

pub async fn list_sources(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let sources = state.db.get_sources_with_counts().await?;

    Ok(Json(DataResponse {
        success: true,
        data: sources
            .into_iter()
            .map(SourceResponse::from)
            .collect::<Vec<_>>(),
    }))
}

/// Trigger a full refresh and return the terminal run snapshot. The run is
/// already recorded as failed before an error surfaces here, so the client
/// never observes a run stuck in running state.
pub async fn trigger_refresh(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let run = state.refresher.run_refresh().await?;

    Ok(Json(DataResponse {
        success: true,
        data: run,
    }))
}

pub async fn refresh_status(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    match state.db.get_latest_run().await? {
        Some(run) => Ok(Json(json!({ "success": true, "data": run }))),
        None => Ok(Json(json!({
            "success": true,
            "data": null,
            "message": "No refresh operations found"
        }))),
    }
}

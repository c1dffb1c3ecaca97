use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use nw_core::{Candidate, Error};

use crate::AppState;

/// Maps domain errors onto HTTP statuses at the boundary.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.0.to_string()).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl Pagination {
    fn resolve(&self) -> (u32, u32) {
        (self.page.unwrap_or(1), self.page_size.unwrap_or(20))
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct FeaturedParams {
    pub count: Option<u32>,
}

pub async fn latest_news(
    State(state): State<Arc<AppState>>,
    Query(pagination): Query<Pagination>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, page_size) = pagination.resolve();
    Ok(Json(state.news.latest(page, page_size).await?))
}

pub async fn news_by_category(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Query(pagination): Query<Pagination>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, page_size) = pagination.resolve();
    Ok(Json(state.news.by_category(&slug, page, page_size).await?))
}

pub async fn news_by_source(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Query(pagination): Query<Pagination>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, page_size) = pagination.resolve();
    Ok(Json(state.news.by_source(&slug, page, page_size).await?))
}

pub async fn news_detail(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    match state.news.detail(&slug).await? {
        Some(article) => Ok(Json(article).into_response()),
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}

pub async fn featured_news(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FeaturedParams>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.news.featured(params.count.unwrap_or(5)).await?))
}

pub async fn search_news(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = params.page.unwrap_or(1);
    let page_size = params.page_size.unwrap_or(20);
    Ok(Json(state.news.search(&params.q, page, page_size).await?))
}

pub async fn create_news(
    State(state): State<Arc<AppState>>,
    Json(candidate): Json<Candidate>,
) -> Result<impl IntoResponse, ApiError> {
    let article = state.news.create(candidate).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.categories.all().await?))
}

pub async fn list_sources(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.sources.active().await?))
}

/// Manual "fetch now" for one source; failures surface to the caller.
pub async fn fetch_source(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let accepted = state.scheduler.run_one(id).await?;
    Ok(Json(serde_json::json!({ "accepted": accepted })))
}

pub async fn get_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.images.get_bytes(&id).await {
        Some((bytes, content_type)) => {
            ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

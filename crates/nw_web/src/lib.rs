use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub mod handlers;
pub mod state;

pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/api/news/latest", get(handlers::latest_news))
        .route("/api/news/featured", get(handlers::featured_news))
        .route("/api/news/category/:slug", get(handlers::news_by_category))
        .route("/api/news/source/:slug", get(handlers::news_by_source))
        .route("/api/news/:slug", get(handlers::news_detail))
        .route("/api/news", post(handlers::create_news))
        .route("/api/search", get(handlers::search_news))
        .route("/api/categories", get(handlers::list_categories))
        .route("/api/sources", get(handlers::list_sources))
        .route("/api/sources/:id/fetch", post(handlers::fetch_source))
        .route("/api/images/:id", get(handlers::get_image))
        .layer(cors)
        .with_state(Arc::new(state))
}

pub mod prelude {
    pub use crate::AppState;
    pub use nw_core::{Article, Error, Result};
}

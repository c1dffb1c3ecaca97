use std::sync::Arc;

use nw_fetch::FetchScheduler;
use nw_images::ImageService;
use nw_news::{CategoryService, NewsService, SourceService};

pub struct AppState {
    pub news: Arc<NewsService>,
    pub categories: Arc<CategoryService>,
    pub sources: Arc<SourceService>,
    pub images: Arc<ImageService>,
    pub scheduler: Arc<FetchScheduler>,
}

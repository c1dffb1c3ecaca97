use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{Article, Category, Source};
use crate::Result;

/// Article persistence. Uniqueness of `slug` and `source_url` is enforced
/// here; violations surface as [`crate::Error::Conflict`].
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// Persist a new article and return it with its assigned id.
    async fn insert(&self, article: &Article) -> Result<Article>;

    /// Active article by slug.
    async fn by_slug(&self, slug: &str) -> Result<Option<Article>>;

    /// Whether any article (active or not) carries this source URL.
    async fn exists_by_source_url(&self, source_url: &str) -> Result<bool>;

    async fn list_latest(&self, page: u32, page_size: u32) -> Result<Vec<Article>>;

    async fn list_by_category(
        &self,
        category_id: i64,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Article>>;

    async fn list_by_source(
        &self,
        source_id: i64,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Article>>;

    async fn list_featured(&self, count: u32) -> Result<Vec<Article>>;

    /// Case-insensitive substring match over title, summary and plain text.
    async fn search(&self, query: &str, page: u32, page_size: u32) -> Result<Vec<Article>>;

    async fn count_search(&self, query: &str) -> Result<u64>;

    async fn count_active(&self) -> Result<u64>;
    async fn count_by_category(&self, category_id: i64) -> Result<u64>;
    async fn count_by_source(&self, source_id: i64) -> Result<u64>;

    /// Best-effort view counter bump.
    async fn increment_view_count(&self, id: i64) -> Result<()>;

    /// Detach all articles from a category (category deletion must not
    /// delete articles).
    async fn clear_category(&self, category_id: i64) -> Result<()>;
}

#[async_trait]
pub trait SourceRepository: Send + Sync {
    async fn insert(&self, source: &Source) -> Result<Source>;
    async fn update(&self, source: &Source) -> Result<()>;
    async fn delete(&self, id: i64) -> Result<()>;
    async fn by_id(&self, id: i64) -> Result<Option<Source>>;
    async fn by_slug(&self, slug: &str) -> Result<Option<Source>>;
    async fn list_active(&self) -> Result<Vec<Source>>;
    async fn update_last_fetched(&self, id: i64, when: DateTime<Utc>) -> Result<()>;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn insert(&self, category: &Category) -> Result<Category>;
    async fn update(&self, category: &Category) -> Result<()>;
    async fn delete(&self, id: i64) -> Result<()>;
    async fn by_id(&self, id: i64) -> Result<Option<Category>>;
    async fn by_slug(&self, slug: &str) -> Result<Option<Category>>;
    async fn list_active(&self) -> Result<Vec<Category>>;
}

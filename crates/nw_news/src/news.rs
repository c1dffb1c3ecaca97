use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use nw_cache::{get_or_set, keys, TTL_MEDIUM, TTL_SHORT};
use nw_core::cache::CacheStore;
use nw_core::storage::{ArticleRepository, CategoryRepository, SourceRepository};
use nw_core::text::{generate_slug, strip_html_opt};
use nw_core::{Article, Candidate, Error, PagedResult, Result};
use nw_fetch::scheduler::CandidateImporter;
use nw_images::ImageService;

/// Read paths, direct creation and batch ingestion for articles. Reads go
/// through the cache; writes persist first and then issue best-effort point
/// invalidations.
pub struct NewsService {
    articles: Arc<dyn ArticleRepository>,
    sources: Arc<dyn SourceRepository>,
    categories: Arc<dyn CategoryRepository>,
    cache: Arc<dyn CacheStore>,
    images: Arc<ImageService>,
}

impl NewsService {
    pub fn new(
        articles: Arc<dyn ArticleRepository>,
        sources: Arc<dyn SourceRepository>,
        categories: Arc<dyn CategoryRepository>,
        cache: Arc<dyn CacheStore>,
        images: Arc<ImageService>,
    ) -> Self {
        Self {
            articles,
            sources,
            categories,
            cache,
            images,
        }
    }

    pub async fn latest(&self, page: u32, page_size: u32) -> Result<PagedResult<Article>> {
        let key = keys::latest(page, page_size);
        get_or_set(self.cache.as_ref(), &key, TTL_SHORT, || async {
            let items = self.articles.list_latest(page, page_size).await?;
            let total_count = self.articles.count_active().await?;
            Ok(PagedResult {
                items,
                total_count,
                page,
                page_size,
            })
        })
        .await
    }

    pub async fn by_category(
        &self,
        category_slug: &str,
        page: u32,
        page_size: u32,
    ) -> Result<PagedResult<Article>> {
        let Some(category) = self.categories.by_slug(category_slug).await? else {
            return Ok(PagedResult::empty(page, page_size));
        };

        let key = keys::by_category(category.id, page, page_size);
        get_or_set(self.cache.as_ref(), &key, TTL_SHORT, || async {
            let items = self
                .articles
                .list_by_category(category.id, page, page_size)
                .await?;
            let total_count = self.articles.count_by_category(category.id).await?;
            Ok(PagedResult {
                items,
                total_count,
                page,
                page_size,
            })
        })
        .await
    }

    pub async fn by_source(
        &self,
        source_slug: &str,
        page: u32,
        page_size: u32,
    ) -> Result<PagedResult<Article>> {
        let Some(source) = self.sources.by_slug(source_slug).await? else {
            return Ok(PagedResult::empty(page, page_size));
        };

        let key = keys::by_source(source.id, page, page_size);
        get_or_set(self.cache.as_ref(), &key, TTL_SHORT, || async {
            let items = self
                .articles
                .list_by_source(source.id, page, page_size)
                .await?;
            let total_count = self.articles.count_by_source(source.id).await?;
            Ok(PagedResult {
                items,
                total_count,
                page,
                page_size,
            })
        })
        .await
    }

    /// Article detail by slug. Served through the cache; every read fires a
    /// detached view-count increment the response does not wait for.
    pub async fn detail(&self, slug: &str) -> Result<Option<Article>> {
        let key = keys::article_slug(slug);
        let article = nw_cache::get_or_set_opt(self.cache.as_ref(), &key, TTL_MEDIUM, || async {
            self.articles.by_slug(slug).await
        })
        .await?;

        if let Some(article) = &article {
            let articles = self.articles.clone();
            let id = article.id;
            tokio::spawn(async move {
                if let Err(e) = articles.increment_view_count(id).await {
                    debug!("view count increment failed for article {}: {}", id, e);
                }
            });
        }

        Ok(article)
    }

    pub async fn featured(&self, count: u32) -> Result<Vec<Article>> {
        let key = keys::featured(count);
        get_or_set(self.cache.as_ref(), &key, TTL_SHORT, || async {
            self.articles.list_featured(count).await
        })
        .await
    }

    /// Substring search, straight from storage.
    pub async fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<PagedResult<Article>> {
        if query.trim().is_empty() {
            return Ok(PagedResult::empty(page, page_size));
        }

        let items = self.articles.search(query, page, page_size).await?;
        let total_count = self.articles.count_search(query).await?;
        Ok(PagedResult {
            items,
            total_count,
            page,
            page_size,
        })
    }

    /// Persist a single candidate as a new article. Unlike batch import,
    /// a duplicate source URL here is a conflict the caller hears about.
    pub async fn create(&self, candidate: Candidate) -> Result<Article> {
        if self
            .articles
            .exists_by_source_url(&candidate.source_url)
            .await?
        {
            return Err(Error::Conflict(format!(
                "article with source url already exists: {}",
                candidate.source_url
            )));
        }

        let mut article = Article {
            id: 0,
            title: candidate.title.clone(),
            slug: generate_slug(&candidate.title),
            summary: candidate.summary.clone(),
            content: candidate.content.clone(),
            plain_text: strip_html_opt(candidate.content.as_deref()),
            source_url: candidate.source_url.clone(),
            image_url: candidate.image_url.clone(),
            image_id: None,
            thumb_id: None,
            author: candidate.author.clone(),
            published_at: candidate.published_at,
            fetched_at: Utc::now(),
            view_count: 0,
            is_featured: false,
            is_active: true,
            source_id: candidate.source_id,
            category_id: candidate.category_id,
        };

        // The article id is assigned at insert; images uploaded before that
        // carry a zero article reference in their filename.
        if let Some(image_url) = candidate.image_url.as_deref().filter(|u| !u.is_empty()) {
            match self.images.ingest_from_url(image_url, 0).await {
                Some(image_id) => {
                    article.thumb_id = self.images.thumbnail_id(&image_id).await;
                    article.image_id = Some(image_id);
                }
                None => {
                    warn!(
                        "failed to store image for article: {}",
                        candidate.source_url
                    );
                }
            }
        }

        let stored = self.insert_with_fresh_slug(article).await?;

        self.invalidate_listings().await;

        Ok(stored)
    }

    /// Batch ingestion: candidates whose source URL is already stored are
    /// skipped, a malformed candidate never aborts the batch. Returns the
    /// number of newly accepted articles.
    pub async fn import(&self, candidates: Vec<Candidate>) -> Result<usize> {
        let mut accepted = 0;

        for candidate in candidates {
            match self
                .articles
                .exists_by_source_url(&candidate.source_url)
                .await
            {
                Ok(true) => {
                    debug!("skipping known article: {}", candidate.source_url);
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!("dedup check failed for {}: {}", candidate.source_url, e);
                    continue;
                }
            }

            let title = candidate.title.clone();
            match self.create(candidate).await {
                Ok(_) => accepted += 1,
                Err(e) => warn!("failed to import article {}: {}", title, e),
            }
        }

        info!("import accepted {} new articles", accepted);
        Ok(accepted)
    }

    /// Maintenance sweep: drop every cached news and search entry. Not used
    /// on the write paths, which invalidate point keys instead.
    pub async fn clear_news_cache(&self) -> Result<()> {
        self.cache
            .remove_by_pattern(&keys::prefix_pattern(keys::NEWS_PREFIX))
            .await?;
        self.cache
            .remove_by_pattern(&keys::prefix_pattern(keys::SEARCH_PREFIX))
            .await?;
        Ok(())
    }

    /// Retry slug collisions with fresh entropy; identical titles imported
    /// in the same second must still both land.
    async fn insert_with_fresh_slug(&self, mut article: Article) -> Result<Article> {
        let title = article.title.clone();
        for attempt in 0..3 {
            if attempt > 0 {
                let entropy = uuid::Uuid::new_v4().simple().to_string();
                article.slug = format!("{}-{}", generate_slug(&title), &entropy[..6]);
            }
            match self.articles.insert(&article).await {
                Ok(stored) => return Ok(stored),
                Err(Error::Conflict(message)) if message.contains("slug") => {
                    debug!("slug collision on {}, retrying", article.slug);
                }
                Err(e) => return Err(e),
            }
        }
        Err(Error::Conflict(format!(
            "could not generate a unique slug for: {}",
            title
        )))
    }

    async fn invalidate_listings(&self) {
        for pattern in [
            keys::prefix_pattern(keys::LATEST_PREFIX),
            keys::prefix_pattern(keys::FEATURED_PREFIX),
        ] {
            if let Err(e) = self.cache.remove_by_pattern(&pattern).await {
                warn!("cache invalidation failed for {}: {}", pattern, e);
            }
        }
    }
}

#[async_trait]
impl CandidateImporter for NewsService {
    async fn import(&self, candidates: Vec<Candidate>) -> Result<usize> {
        NewsService::import(self, candidates).await
    }
}

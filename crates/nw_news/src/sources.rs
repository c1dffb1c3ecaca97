use std::sync::Arc;

use tracing::warn;

use nw_cache::{get_or_set, keys, TTL_LONG};
use nw_core::cache::CacheStore;
use nw_core::storage::SourceRepository;
use nw_core::text::generate_slug;
use nw_core::{Error, FetchMethod, Result, ScrapingConfig, Source};

/// Fields accepted when creating or updating a source.
#[derive(Debug, Clone)]
pub struct NewSource {
    pub name: String,
    pub base_url: String,
    pub logo_url: Option<String>,
    pub fetch_method: FetchMethod,
    pub feed_url: Option<String>,
    pub api_endpoint: Option<String>,
    pub api_key: Option<String>,
    pub fetch_interval_minutes: i64,
    pub scraping: Option<ScrapingConfig>,
}

/// Source administration and the cached active-source listing.
pub struct SourceService {
    sources: Arc<dyn SourceRepository>,
    cache: Arc<dyn CacheStore>,
}

impl SourceService {
    pub fn new(sources: Arc<dyn SourceRepository>, cache: Arc<dyn CacheStore>) -> Self {
        Self { sources, cache }
    }

    pub async fn active(&self) -> Result<Vec<Source>> {
        get_or_set(self.cache.as_ref(), keys::SOURCES_ACTIVE, TTL_LONG, || async {
            self.sources.list_active().await
        })
        .await
    }

    pub async fn by_slug(&self, slug: &str) -> Result<Option<Source>> {
        self.sources.by_slug(slug).await
    }

    pub async fn create(&self, fields: NewSource) -> Result<Source> {
        let source = Source {
            id: 0,
            slug: generate_slug(&fields.name),
            name: fields.name,
            base_url: fields.base_url,
            logo_url: fields.logo_url,
            fetch_method: fields.fetch_method,
            feed_url: fields.feed_url,
            api_endpoint: fields.api_endpoint,
            api_key: fields.api_key,
            fetch_interval_minutes: fields.fetch_interval_minutes,
            last_fetched_at: None,
            is_active: true,
            scraping: fields.scraping,
        };

        let stored = self.sources.insert(&source).await?;
        self.invalidate().await;
        Ok(stored)
    }

    pub async fn update(&self, id: i64, fields: NewSource) -> Result<Source> {
        let mut source = self
            .sources
            .by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("source {}", id)))?;

        source.name = fields.name;
        source.base_url = fields.base_url;
        source.logo_url = fields.logo_url;
        source.fetch_method = fields.fetch_method;
        source.feed_url = fields.feed_url;
        source.api_endpoint = fields.api_endpoint;
        source.api_key = fields.api_key;
        source.fetch_interval_minutes = fields.fetch_interval_minutes;
        source.scraping = fields.scraping;

        self.sources.update(&source).await?;
        self.invalidate().await;
        Ok(source)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.sources.delete(id).await?;
        self.invalidate().await;
        Ok(())
    }

    async fn invalidate(&self) {
        if let Err(e) = self.cache.remove(keys::SOURCES_ACTIVE).await {
            warn!("cache invalidation failed for {}: {}", keys::SOURCES_ACTIVE, e);
        }
    }
}

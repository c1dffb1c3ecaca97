use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use nw_core::blobs::BlobStore;
use nw_core::models::BlobMetadata;
use nw_core::storage::{ArticleRepository, CategoryRepository, SourceRepository};
use nw_core::{Article, Category, Error, Result, Source};

/// In-memory backend for tests and development. Enforces the same slug and
/// source-URL uniqueness rules as the durable backend.
pub struct MemoryStorage {
    articles: RwLock<Vec<Article>>,
    sources: RwLock<Vec<Source>>,
    categories: RwLock<Vec<Category>>,
    next_id: AtomicI64,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            articles: RwLock::new(Vec::new()),
            sources: RwLock::new(Vec::new()),
            categories: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn page_slice(mut articles: Vec<Article>, page: u32, page_size: u32) -> Vec<Article> {
    articles.sort_by(|a, b| b.sort_time().cmp(&a.sort_time()));
    let offset = (page.max(1) - 1) as usize * page_size as usize;
    articles.into_iter().skip(offset).take(page_size as usize).collect()
}

#[async_trait]
impl ArticleRepository for MemoryStorage {
    async fn insert(&self, article: &Article) -> Result<Article> {
        let mut articles = self.articles.write().await;

        if articles.iter().any(|a| a.source_url == article.source_url) {
            return Err(Error::Conflict(format!(
                "article source url already exists: {}",
                article.source_url
            )));
        }
        if articles.iter().any(|a| a.slug == article.slug) {
            return Err(Error::Conflict(format!(
                "article slug already exists: {}",
                article.slug
            )));
        }

        let mut stored = article.clone();
        stored.id = self.next_id();
        articles.push(stored.clone());
        Ok(stored)
    }

    async fn by_slug(&self, slug: &str) -> Result<Option<Article>> {
        let articles = self.articles.read().await;
        Ok(articles
            .iter()
            .find(|a| a.slug == slug && a.is_active)
            .cloned())
    }

    async fn exists_by_source_url(&self, source_url: &str) -> Result<bool> {
        let articles = self.articles.read().await;
        Ok(articles.iter().any(|a| a.source_url == source_url))
    }

    async fn list_latest(&self, page: u32, page_size: u32) -> Result<Vec<Article>> {
        let articles = self.articles.read().await;
        let active: Vec<Article> = articles.iter().filter(|a| a.is_active).cloned().collect();
        Ok(page_slice(active, page, page_size))
    }

    async fn list_by_category(
        &self,
        category_id: i64,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Article>> {
        let articles = self.articles.read().await;
        let matching: Vec<Article> = articles
            .iter()
            .filter(|a| a.is_active && a.category_id == Some(category_id))
            .cloned()
            .collect();
        Ok(page_slice(matching, page, page_size))
    }

    async fn list_by_source(
        &self,
        source_id: i64,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Article>> {
        let articles = self.articles.read().await;
        let matching: Vec<Article> = articles
            .iter()
            .filter(|a| a.is_active && a.source_id == source_id)
            .cloned()
            .collect();
        Ok(page_slice(matching, page, page_size))
    }

    async fn list_featured(&self, count: u32) -> Result<Vec<Article>> {
        let articles = self.articles.read().await;
        let featured: Vec<Article> = articles
            .iter()
            .filter(|a| a.is_active && a.is_featured)
            .cloned()
            .collect();
        Ok(page_slice(featured, 1, count))
    }

    async fn search(&self, query: &str, page: u32, page_size: u32) -> Result<Vec<Article>> {
        let needle = query.to_lowercase();
        let articles = self.articles.read().await;
        let matching: Vec<Article> = articles
            .iter()
            .filter(|a| {
                a.is_active
                    && (a.title.to_lowercase().contains(&needle)
                        || a.summary
                            .as_deref()
                            .is_some_and(|s| s.to_lowercase().contains(&needle))
                        || a.plain_text
                            .as_deref()
                            .is_some_and(|s| s.to_lowercase().contains(&needle)))
            })
            .cloned()
            .collect();
        Ok(page_slice(matching, page, page_size))
    }

    async fn count_search(&self, query: &str) -> Result<u64> {
        let needle = query.to_lowercase();
        let articles = self.articles.read().await;
        Ok(articles
            .iter()
            .filter(|a| {
                a.is_active
                    && (a.title.to_lowercase().contains(&needle)
                        || a.summary
                            .as_deref()
                            .is_some_and(|s| s.to_lowercase().contains(&needle))
                        || a.plain_text
                            .as_deref()
                            .is_some_and(|s| s.to_lowercase().contains(&needle)))
            })
            .count() as u64)
    }

    async fn count_active(&self) -> Result<u64> {
        let articles = self.articles.read().await;
        Ok(articles.iter().filter(|a| a.is_active).count() as u64)
    }

    async fn count_by_category(&self, category_id: i64) -> Result<u64> {
        let articles = self.articles.read().await;
        Ok(articles
            .iter()
            .filter(|a| a.is_active && a.category_id == Some(category_id))
            .count() as u64)
    }

    async fn count_by_source(&self, source_id: i64) -> Result<u64> {
        let articles = self.articles.read().await;
        Ok(articles
            .iter()
            .filter(|a| a.is_active && a.source_id == source_id)
            .count() as u64)
    }

    async fn increment_view_count(&self, id: i64) -> Result<()> {
        let mut articles = self.articles.write().await;
        if let Some(article) = articles.iter_mut().find(|a| a.id == id) {
            article.view_count += 1;
        }
        Ok(())
    }

    async fn clear_category(&self, category_id: i64) -> Result<()> {
        let mut articles = self.articles.write().await;
        for article in articles.iter_mut() {
            if article.category_id == Some(category_id) {
                article.category_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SourceRepository for MemoryStorage {
    async fn insert(&self, source: &Source) -> Result<Source> {
        let mut sources = self.sources.write().await;
        if sources.iter().any(|s| s.slug == source.slug) {
            return Err(Error::Conflict(format!(
                "source slug already exists: {}",
                source.slug
            )));
        }
        let mut stored = source.clone();
        stored.id = self.next_id();
        sources.push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, source: &Source) -> Result<()> {
        let mut sources = self.sources.write().await;
        match sources.iter_mut().find(|s| s.id == source.id) {
            Some(existing) => {
                *existing = source.clone();
                Ok(())
            }
            None => Err(Error::NotFound(format!("source {}", source.id))),
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut sources = self.sources.write().await;
        let before = sources.len();
        sources.retain(|s| s.id != id);
        if sources.len() == before {
            return Err(Error::NotFound(format!("source {}", id)));
        }
        Ok(())
    }

    async fn by_id(&self, id: i64) -> Result<Option<Source>> {
        let sources = self.sources.read().await;
        Ok(sources.iter().find(|s| s.id == id).cloned())
    }

    async fn by_slug(&self, slug: &str) -> Result<Option<Source>> {
        let sources = self.sources.read().await;
        Ok(sources.iter().find(|s| s.slug == slug).cloned())
    }

    async fn list_active(&self) -> Result<Vec<Source>> {
        let sources = self.sources.read().await;
        let mut active: Vec<Source> = sources.iter().filter(|s| s.is_active).cloned().collect();
        active.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(active)
    }

    async fn update_last_fetched(&self, id: i64, when: DateTime<Utc>) -> Result<()> {
        let mut sources = self.sources.write().await;
        match sources.iter_mut().find(|s| s.id == id) {
            Some(source) => {
                source.last_fetched_at = Some(when);
                Ok(())
            }
            None => Err(Error::NotFound(format!("source {}", id))),
        }
    }
}

#[async_trait]
impl CategoryRepository for MemoryStorage {
    async fn insert(&self, category: &Category) -> Result<Category> {
        let mut categories = self.categories.write().await;
        if categories.iter().any(|c| c.slug == category.slug) {
            return Err(Error::Conflict(format!(
                "category slug already exists: {}",
                category.slug
            )));
        }
        let mut stored = category.clone();
        stored.id = self.next_id();
        categories.push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, category: &Category) -> Result<()> {
        let mut categories = self.categories.write().await;
        match categories.iter_mut().find(|c| c.id == category.id) {
            Some(existing) => {
                *existing = category.clone();
                Ok(())
            }
            None => Err(Error::NotFound(format!("category {}", category.id))),
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut categories = self.categories.write().await;
        let before = categories.len();
        categories.retain(|c| c.id != id);
        if categories.len() == before {
            return Err(Error::NotFound(format!("category {}", id)));
        }
        Ok(())
    }

    async fn by_id(&self, id: i64) -> Result<Option<Category>> {
        let categories = self.categories.read().await;
        Ok(categories.iter().find(|c| c.id == id).cloned())
    }

    async fn by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let categories = self.categories.read().await;
        Ok(categories
            .iter()
            .find(|c| c.slug == slug && c.is_active)
            .cloned())
    }

    async fn list_active(&self) -> Result<Vec<Category>> {
        let categories = self.categories.read().await;
        let mut active: Vec<Category> =
            categories.iter().filter(|c| c.is_active).cloned().collect();
        active.sort_by_key(|c| c.sort_order);
        Ok(active)
    }
}

/// In-memory blob store. Ids are opaque UUIDs as in the durable store.
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, (Vec<u8>, String, BlobMetadata)>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, bytes: Vec<u8>, filename: &str, meta: BlobMetadata) -> Result<String> {
        let id = Uuid::new_v4().simple().to_string();
        let mut blobs = self.blobs.write().await;
        blobs.insert(id.clone(), (bytes, filename.to_string(), meta));
        Ok(id)
    }

    async fn download(&self, id: &str) -> Result<Option<Vec<u8>>> {
        let blobs = self.blobs.read().await;
        Ok(blobs.get(id).map(|(bytes, _, _)| bytes.clone()))
    }

    async fn metadata(&self, id: &str) -> Result<Option<BlobMetadata>> {
        let blobs = self.blobs.read().await;
        Ok(blobs.get(id).map(|(_, _, meta)| meta.clone()))
    }

    async fn set_thumbnail(&self, id: &str, thumb_id: &str) -> Result<()> {
        let mut blobs = self.blobs.write().await;
        match blobs.get_mut(id) {
            Some((_, _, meta)) => {
                meta.thumb_id = Some(thumb_id.to_string());
                Ok(())
            }
            None => Err(Error::NotFound(format!("blob {}", id))),
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut blobs = self.blobs.write().await;
        blobs.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nw_core::FetchMethod;

    fn article(url: &str, slug: &str) -> Article {
        Article {
            id: 0,
            title: "Test Article".to_string(),
            slug: slug.to_string(),
            summary: Some("A summary".to_string()),
            content: None,
            plain_text: Some("full text body".to_string()),
            source_url: url.to_string(),
            image_url: None,
            image_id: None,
            thumb_id: None,
            author: None,
            published_at: None,
            fetched_at: Utc::now(),
            view_count: 0,
            is_featured: false,
            is_active: true,
            source_id: 1,
            category_id: None,
        }
    }

    #[tokio::test]
    async fn test_source_url_uniqueness() {
        let storage = MemoryStorage::new();
        ArticleRepository::insert(&storage, &article("http://a.example/1", "one-1"))
            .await
            .unwrap();

        let err = ArticleRepository::insert(&storage, &article("http://a.example/1", "one-2"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        assert!(storage.exists_by_source_url("http://a.example/1").await.unwrap());
        assert!(!storage.exists_by_source_url("http://a.example/2").await.unwrap());
    }

    #[tokio::test]
    async fn test_inactive_articles_hidden_but_still_dedup() {
        let storage = MemoryStorage::new();
        let mut a = article("http://a.example/1", "one-1");
        a.is_active = false;
        ArticleRepository::insert(&storage, &a).await.unwrap();

        assert!(ArticleRepository::by_slug(&storage, "one-1")
            .await
            .unwrap()
            .is_none());
        assert_eq!(storage.count_active().await.unwrap(), 0);
        // Inactive rows still block re-ingestion.
        assert!(storage.exists_by_source_url("http://a.example/1").await.unwrap());
    }

    #[tokio::test]
    async fn test_latest_ordering_and_paging() {
        let storage = MemoryStorage::new();
        for i in 0..5 {
            let mut a = article(&format!("http://a.example/{}", i), &format!("slug-{}", i));
            a.published_at = Some(Utc::now() - chrono::Duration::minutes(i));
            ArticleRepository::insert(&storage, &a).await.unwrap();
        }

        let first_page = storage.list_latest(1, 2).await.unwrap();
        assert_eq!(first_page.len(), 2);
        assert_eq!(first_page[0].slug, "slug-0");

        let third_page = storage.list_latest(3, 2).await.unwrap();
        assert_eq!(third_page.len(), 1);
        assert_eq!(third_page[0].slug, "slug-4");
    }

    #[tokio::test]
    async fn test_search_matches_title_summary_plaintext() {
        let storage = MemoryStorage::new();
        let mut a = article("http://a.example/1", "one-1");
        a.title = "Election Results".to_string();
        ArticleRepository::insert(&storage, &a).await.unwrap();

        let mut b = article("http://a.example/2", "two-1");
        b.plain_text = Some("the election body".to_string());
        ArticleRepository::insert(&storage, &b).await.unwrap();

        let hits = storage.search("ELECTION", 1, 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(storage.search("nothing", 1, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_category() {
        let storage = MemoryStorage::new();
        let mut a = article("http://a.example/1", "one-1");
        a.category_id = Some(9);
        let stored = ArticleRepository::insert(&storage, &a).await.unwrap();

        storage.clear_category(9).await.unwrap();
        let remaining = storage.list_latest(1, 10).await.unwrap();
        assert_eq!(remaining[0].id, stored.id);
        assert_eq!(remaining[0].category_id, None);
    }

    #[tokio::test]
    async fn test_update_last_fetched() {
        let storage = MemoryStorage::new();
        let source = Source {
            id: 0,
            name: "Example".to_string(),
            slug: "example".to_string(),
            base_url: "https://news.example".to_string(),
            logo_url: None,
            fetch_method: FetchMethod::Feed,
            feed_url: Some("https://news.example/feed".to_string()),
            api_endpoint: None,
            api_key: None,
            fetch_interval_minutes: 30,
            last_fetched_at: None,
            is_active: true,
            scraping: None,
        };
        let stored = SourceRepository::insert(&storage, &source).await.unwrap();

        let when = Utc::now();
        storage.update_last_fetched(stored.id, when).await.unwrap();
        let reloaded = SourceRepository::by_id(&storage, stored.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.last_fetched_at, Some(when));

        let err = storage.update_last_fetched(999, when).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_blob_store_round_trip() {
        let blobs = MemoryBlobStore::new();
        let meta = BlobMetadata {
            content_type: "image/png".to_string(),
            role: nw_core::models::BlobRole::Original,
            article_id: Some(1),
            source_url: None,
            width: 10,
            height: 10,
            thumb_id: None,
            origin_id: None,
            uploaded_at: Utc::now(),
        };

        let id = blobs.upload(vec![1, 2, 3], "f.png", meta).await.unwrap();
        assert_eq!(blobs.download(&id).await.unwrap(), Some(vec![1, 2, 3]));

        blobs.set_thumbnail(&id, "t1").await.unwrap();
        assert_eq!(
            blobs.metadata(&id).await.unwrap().unwrap().thumb_id,
            Some("t1".to_string())
        );

        blobs.delete(&id).await.unwrap();
        assert_eq!(blobs.download(&id).await.unwrap(), None);
        assert_eq!(blobs.download("missing").await.unwrap(), None);
    }
}

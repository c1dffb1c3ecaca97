use std::sync::Arc;

use tracing::warn;

use nw_cache::{get_or_set, get_or_set_opt, keys, TTL_LONG, TTL_MEDIUM};
use nw_core::cache::CacheStore;
use nw_core::storage::{ArticleRepository, CategoryRepository};
use nw_core::text::generate_slug;
use nw_core::{Category, Error, Result};

/// Fields accepted when creating or updating a category.
#[derive(Debug, Clone, Default)]
pub struct NewCategory {
    pub name: String,
    pub local_name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub sort_order: i64,
}

/// Category reads are cached long (the list) and medium (slug lookups);
/// every mutation points-invalidates the keys it touched.
pub struct CategoryService {
    categories: Arc<dyn CategoryRepository>,
    articles: Arc<dyn ArticleRepository>,
    cache: Arc<dyn CacheStore>,
}

impl CategoryService {
    pub fn new(
        categories: Arc<dyn CategoryRepository>,
        articles: Arc<dyn ArticleRepository>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            categories,
            articles,
            cache,
        }
    }

    pub async fn all(&self) -> Result<Vec<Category>> {
        get_or_set(self.cache.as_ref(), keys::CATEGORIES_ALL, TTL_LONG, || async {
            self.categories.list_active().await
        })
        .await
    }

    pub async fn by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let key = keys::category_slug(slug);
        get_or_set_opt(self.cache.as_ref(), &key, TTL_MEDIUM, || async {
            self.categories.by_slug(slug).await
        })
        .await
    }

    pub async fn create(&self, fields: NewCategory) -> Result<Category> {
        let category = Category {
            id: 0,
            slug: generate_slug(&fields.name),
            name: fields.name,
            local_name: fields.local_name,
            description: fields.description,
            icon: fields.icon,
            color: fields.color,
            sort_order: fields.sort_order,
            is_active: true,
        };

        let stored = self.categories.insert(&category).await?;
        self.invalidate(None).await;
        Ok(stored)
    }

    pub async fn update(&self, id: i64, fields: NewCategory) -> Result<Category> {
        let mut category = self
            .categories
            .by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("category {}", id)))?;

        category.name = fields.name;
        category.local_name = fields.local_name;
        category.description = fields.description;
        category.icon = fields.icon;
        category.color = fields.color;
        category.sort_order = fields.sort_order;

        self.categories.update(&category).await?;
        self.invalidate(Some(&category.slug)).await;
        Ok(category)
    }

    /// Delete a category. Its articles survive with the reference nulled.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let category = self
            .categories
            .by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("category {}", id)))?;

        self.articles.clear_category(id).await?;
        self.categories.delete(id).await?;
        self.invalidate(Some(&category.slug)).await;
        Ok(())
    }

    async fn invalidate(&self, slug: Option<&str>) {
        if let Err(e) = self.cache.remove(keys::CATEGORIES_ALL).await {
            warn!("cache invalidation failed for {}: {}", keys::CATEGORIES_ALL, e);
        }
        if let Some(slug) = slug {
            let key = keys::category_slug(slug);
            if let Err(e) = self.cache.remove(&key).await {
                warn!("cache invalidation failed for {}: {}", key, e);
            }
        }
    }
}

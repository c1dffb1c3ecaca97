use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqliteRow};
use sqlx::Row;
use uuid::Uuid;

use nw_core::blobs::BlobStore;
use nw_core::models::BlobMetadata;
use nw_core::storage::{ArticleRepository, CategoryRepository, SourceRepository};
use nw_core::{Article, Category, Error, Result, Source};

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS sources (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        base_url TEXT NOT NULL,
        logo_url TEXT,
        fetch_method TEXT NOT NULL,
        feed_url TEXT,
        api_endpoint TEXT,
        api_key TEXT,
        fetch_interval_minutes INTEGER NOT NULL DEFAULT 30,
        last_fetched_at TEXT,
        is_active INTEGER NOT NULL DEFAULT 1,
        scraping TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS categories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        local_name TEXT NOT NULL DEFAULT '',
        slug TEXT NOT NULL UNIQUE,
        description TEXT,
        icon TEXT,
        color TEXT,
        sort_order INTEGER NOT NULL DEFAULT 0,
        is_active INTEGER NOT NULL DEFAULT 1
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        summary TEXT,
        content TEXT,
        plain_text TEXT,
        source_url TEXT NOT NULL UNIQUE,
        image_url TEXT,
        image_id TEXT,
        thumb_id TEXT,
        author TEXT,
        published_at TEXT,
        fetched_at TEXT NOT NULL,
        view_count INTEGER NOT NULL DEFAULT 0,
        is_featured INTEGER NOT NULL DEFAULT 0,
        is_active INTEGER NOT NULL DEFAULT 1,
        source_id INTEGER NOT NULL,
        category_id INTEGER
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS blobs (
        id TEXT PRIMARY KEY,
        filename TEXT NOT NULL,
        data BLOB NOT NULL,
        meta TEXT NOT NULL
    )
    "#,
    // Add future migrations here
];

/// SQLite backend. Datetimes are stored as RFC 3339 text; the scraping
/// config rides along as a JSON column the way nested structures do in the
/// rest of the schema.
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| Error::Storage(format!("failed to open database: {}", e)))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Storage(format!("failed to run migration {}: {}", i, e)))?;
        }

        Ok(Self { pool })
    }
}

fn db_err(e: sqlx::Error) -> Error {
    let message = e.to_string();
    if message.contains("UNIQUE constraint failed") {
        Error::Conflict(message)
    } else {
        Error::Storage(message)
    }
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Storage(format!("failed to parse date: {}", e)))
}

fn parse_datetime_opt(value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    value.as_deref().map(parse_datetime).transpose()
}

fn article_from_row(row: &SqliteRow) -> Result<Article> {
    Ok(Article {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        summary: row.get("summary"),
        content: row.get("content"),
        plain_text: row.get("plain_text"),
        source_url: row.get("source_url"),
        image_url: row.get("image_url"),
        image_id: row.get("image_id"),
        thumb_id: row.get("thumb_id"),
        author: row.get("author"),
        published_at: parse_datetime_opt(row.get("published_at"))?,
        fetched_at: parse_datetime(&row.get::<String, _>("fetched_at"))?,
        view_count: row.get("view_count"),
        is_featured: row.get("is_featured"),
        is_active: row.get("is_active"),
        source_id: row.get("source_id"),
        category_id: row.get("category_id"),
    })
}

fn source_from_row(row: &SqliteRow) -> Result<Source> {
    let scraping = row
        .get::<Option<String>, _>("scraping")
        .map(|json| serde_json::from_str(&json))
        .transpose()?;

    Ok(Source {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        base_url: row.get("base_url"),
        logo_url: row.get("logo_url"),
        fetch_method: row
            .get::<String, _>("fetch_method")
            .parse()
            .map_err(Error::Storage)?,
        feed_url: row.get("feed_url"),
        api_endpoint: row.get("api_endpoint"),
        api_key: row.get("api_key"),
        fetch_interval_minutes: row.get("fetch_interval_minutes"),
        last_fetched_at: parse_datetime_opt(row.get("last_fetched_at"))?,
        is_active: row.get("is_active"),
        scraping,
    })
}

fn category_from_row(row: &SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        name: row.get("name"),
        local_name: row.get("local_name"),
        slug: row.get("slug"),
        description: row.get("description"),
        icon: row.get("icon"),
        color: row.get("color"),
        sort_order: row.get("sort_order"),
        is_active: row.get("is_active"),
    }
}

fn offset(page: u32, page_size: u32) -> i64 {
    (page.max(1) as i64 - 1) * page_size as i64
}

const ARTICLE_ORDER: &str = "ORDER BY COALESCE(published_at, fetched_at) DESC";

#[async_trait]
impl ArticleRepository for SqliteStorage {
    async fn insert(&self, article: &Article) -> Result<Article> {
        let result = sqlx::query(
            r#"
            INSERT INTO articles
            (title, slug, summary, content, plain_text, source_url, image_url,
             image_id, thumb_id, author, published_at, fetched_at, view_count,
             is_featured, is_active, source_id, category_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&article.title)
        .bind(&article.slug)
        .bind(&article.summary)
        .bind(&article.content)
        .bind(&article.plain_text)
        .bind(&article.source_url)
        .bind(&article.image_url)
        .bind(&article.image_id)
        .bind(&article.thumb_id)
        .bind(&article.author)
        .bind(article.published_at.map(|dt| dt.to_rfc3339()))
        .bind(article.fetched_at.to_rfc3339())
        .bind(article.view_count)
        .bind(article.is_featured)
        .bind(article.is_active)
        .bind(article.source_id)
        .bind(article.category_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let mut stored = article.clone();
        stored.id = result.last_insert_rowid();
        Ok(stored)
    }

    async fn by_slug(&self, slug: &str) -> Result<Option<Article>> {
        let row = sqlx::query("SELECT * FROM articles WHERE slug = ? AND is_active = 1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(article_from_row).transpose()
    }

    async fn exists_by_source_url(&self, source_url: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM articles WHERE source_url = ?")
            .bind(source_url)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.is_some())
    }

    async fn list_latest(&self, page: u32, page_size: u32) -> Result<Vec<Article>> {
        let rows = sqlx::query(&format!(
            "SELECT * FROM articles WHERE is_active = 1 {} LIMIT ? OFFSET ?",
            ARTICLE_ORDER
        ))
        .bind(page_size as i64)
        .bind(offset(page, page_size))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(article_from_row).collect()
    }

    async fn list_by_category(
        &self,
        category_id: i64,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Article>> {
        let rows = sqlx::query(&format!(
            "SELECT * FROM articles WHERE is_active = 1 AND category_id = ? {} LIMIT ? OFFSET ?",
            ARTICLE_ORDER
        ))
        .bind(category_id)
        .bind(page_size as i64)
        .bind(offset(page, page_size))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(article_from_row).collect()
    }

    async fn list_by_source(
        &self,
        source_id: i64,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Article>> {
        let rows = sqlx::query(&format!(
            "SELECT * FROM articles WHERE is_active = 1 AND source_id = ? {} LIMIT ? OFFSET ?",
            ARTICLE_ORDER
        ))
        .bind(source_id)
        .bind(page_size as i64)
        .bind(offset(page, page_size))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(article_from_row).collect()
    }

    async fn list_featured(&self, count: u32) -> Result<Vec<Article>> {
        let rows = sqlx::query(&format!(
            "SELECT * FROM articles WHERE is_active = 1 AND is_featured = 1 {} LIMIT ?",
            ARTICLE_ORDER
        ))
        .bind(count as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(article_from_row).collect()
    }

    async fn search(&self, query: &str, page: u32, page_size: u32) -> Result<Vec<Article>> {
        let needle = format!("%{}%", query.to_lowercase());
        let rows = sqlx::query(&format!(
            r#"
            SELECT * FROM articles
            WHERE is_active = 1 AND (
                LOWER(title) LIKE ?
                OR LOWER(COALESCE(summary, '')) LIKE ?
                OR LOWER(COALESCE(plain_text, '')) LIKE ?
            )
            {} LIMIT ? OFFSET ?
            "#,
            ARTICLE_ORDER
        ))
        .bind(&needle)
        .bind(&needle)
        .bind(&needle)
        .bind(page_size as i64)
        .bind(offset(page, page_size))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(article_from_row).collect()
    }

    async fn count_search(&self, query: &str) -> Result<u64> {
        let needle = format!("%{}%", query.to_lowercase());
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS n FROM articles
            WHERE is_active = 1 AND (
                LOWER(title) LIKE ?
                OR LOWER(COALESCE(summary, '')) LIKE ?
                OR LOWER(COALESCE(plain_text, '')) LIKE ?
            )
            "#,
        )
        .bind(&needle)
        .bind(&needle)
        .bind(&needle)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.get::<i64, _>("n") as u64)
    }

    async fn count_active(&self) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM articles WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.get::<i64, _>("n") as u64)
    }

    async fn count_by_category(&self, category_id: i64) -> Result<u64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM articles WHERE is_active = 1 AND category_id = ?",
        )
        .bind(category_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.get::<i64, _>("n") as u64)
    }

    async fn count_by_source(&self, source_id: i64) -> Result<u64> {
        let row =
            sqlx::query("SELECT COUNT(*) AS n FROM articles WHERE is_active = 1 AND source_id = ?")
                .bind(source_id)
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(row.get::<i64, _>("n") as u64)
    }

    async fn increment_view_count(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE articles SET view_count = view_count + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn clear_category(&self, category_id: i64) -> Result<()> {
        sqlx::query("UPDATE articles SET category_id = NULL WHERE category_id = ?")
            .bind(category_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl SourceRepository for SqliteStorage {
    async fn insert(&self, source: &Source) -> Result<Source> {
        let scraping = source
            .scraping
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let result = sqlx::query(
            r#"
            INSERT INTO sources
            (name, slug, base_url, logo_url, fetch_method, feed_url, api_endpoint,
             api_key, fetch_interval_minutes, last_fetched_at, is_active, scraping)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&source.name)
        .bind(&source.slug)
        .bind(&source.base_url)
        .bind(&source.logo_url)
        .bind(source.fetch_method.to_string())
        .bind(&source.feed_url)
        .bind(&source.api_endpoint)
        .bind(&source.api_key)
        .bind(source.fetch_interval_minutes)
        .bind(source.last_fetched_at.map(|dt| dt.to_rfc3339()))
        .bind(source.is_active)
        .bind(scraping)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let mut stored = source.clone();
        stored.id = result.last_insert_rowid();
        Ok(stored)
    }

    async fn update(&self, source: &Source) -> Result<()> {
        let scraping = source
            .scraping
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let result = sqlx::query(
            r#"
            UPDATE sources SET
                name = ?, slug = ?, base_url = ?, logo_url = ?, fetch_method = ?,
                feed_url = ?, api_endpoint = ?, api_key = ?,
                fetch_interval_minutes = ?, is_active = ?, scraping = ?
            WHERE id = ?
            "#,
        )
        .bind(&source.name)
        .bind(&source.slug)
        .bind(&source.base_url)
        .bind(&source.logo_url)
        .bind(source.fetch_method.to_string())
        .bind(&source.feed_url)
        .bind(&source.api_endpoint)
        .bind(&source.api_key)
        .bind(source.fetch_interval_minutes)
        .bind(source.is_active)
        .bind(scraping)
        .bind(source.id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("source {}", source.id)));
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM sources WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("source {}", id)));
        }
        Ok(())
    }

    async fn by_id(&self, id: i64) -> Result<Option<Source>> {
        let row = sqlx::query("SELECT * FROM sources WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(source_from_row).transpose()
    }

    async fn by_slug(&self, slug: &str) -> Result<Option<Source>> {
        let row = sqlx::query("SELECT * FROM sources WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(source_from_row).transpose()
    }

    async fn list_active(&self) -> Result<Vec<Source>> {
        let rows = sqlx::query("SELECT * FROM sources WHERE is_active = 1 ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(source_from_row).collect()
    }

    async fn update_last_fetched(&self, id: i64, when: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query("UPDATE sources SET last_fetched_at = ? WHERE id = ?")
            .bind(when.to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("source {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl CategoryRepository for SqliteStorage {
    async fn insert(&self, category: &Category) -> Result<Category> {
        let result = sqlx::query(
            r#"
            INSERT INTO categories
            (name, local_name, slug, description, icon, color, sort_order, is_active)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&category.name)
        .bind(&category.local_name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(&category.icon)
        .bind(&category.color)
        .bind(category.sort_order)
        .bind(category.is_active)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let mut stored = category.clone();
        stored.id = result.last_insert_rowid();
        Ok(stored)
    }

    async fn update(&self, category: &Category) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE categories SET
                name = ?, local_name = ?, slug = ?, description = ?, icon = ?,
                color = ?, sort_order = ?, is_active = ?
            WHERE id = ?
            "#,
        )
        .bind(&category.name)
        .bind(&category.local_name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(&category.icon)
        .bind(&category.color)
        .bind(category.sort_order)
        .bind(category.is_active)
        .bind(category.id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("category {}", category.id)));
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("category {}", id)));
        }
        Ok(())
    }

    async fn by_id(&self, id: i64) -> Result<Option<Category>> {
        let row = sqlx::query("SELECT * FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.as_ref().map(category_from_row))
    }

    async fn by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let row = sqlx::query("SELECT * FROM categories WHERE slug = ? AND is_active = 1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.as_ref().map(category_from_row))
    }

    async fn list_active(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query("SELECT * FROM categories WHERE is_active = 1 ORDER BY sort_order")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.iter().map(category_from_row).collect())
    }
}

#[async_trait]
impl BlobStore for SqliteStorage {
    async fn upload(&self, bytes: Vec<u8>, filename: &str, meta: BlobMetadata) -> Result<String> {
        let id = Uuid::new_v4().simple().to_string();
        sqlx::query("INSERT INTO blobs (id, filename, data, meta) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(filename)
            .bind(bytes)
            .bind(serde_json::to_string(&meta)?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(id)
    }

    async fn download(&self, id: &str) -> Result<Option<Vec<u8>>> {
        let row = sqlx::query("SELECT data FROM blobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(|r| r.get("data")))
    }

    async fn metadata(&self, id: &str) -> Result<Option<BlobMetadata>> {
        let row = sqlx::query("SELECT meta FROM blobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(|r| serde_json::from_str(&r.get::<String, _>("meta")).map_err(Error::from))
            .transpose()
    }

    async fn set_thumbnail(&self, id: &str, thumb_id: &str) -> Result<()> {
        let mut meta = BlobStore::metadata(self, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("blob {}", id)))?;
        meta.thumb_id = Some(thumb_id.to_string());

        sqlx::query("UPDATE blobs SET meta = ? WHERE id = ?")
            .bind(serde_json::to_string(&meta)?)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM blobs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nw_core::{FetchMethod, ScrapingConfig};
    use tempfile::tempdir;

    async fn open_temp() -> (tempfile::TempDir, SqliteStorage) {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::open(&dir.path().join("test.db")).await.unwrap();
        (dir, storage)
    }

    fn article(url: &str, slug: &str) -> Article {
        Article {
            id: 0,
            title: "Test Article".to_string(),
            slug: slug.to_string(),
            summary: Some("summary".to_string()),
            content: Some("<p>body</p>".to_string()),
            plain_text: Some("body".to_string()),
            source_url: url.to_string(),
            image_url: None,
            image_id: None,
            thumb_id: None,
            author: Some("Reporter".to_string()),
            published_at: Some(Utc::now()),
            fetched_at: Utc::now(),
            view_count: 0,
            is_featured: false,
            is_active: true,
            source_id: 1,
            category_id: None,
        }
    }

    #[tokio::test]
    async fn test_article_round_trip_and_conflicts() {
        let (_dir, storage) = open_temp().await;

        let stored = ArticleRepository::insert(&storage, &article("http://e/1", "one-1"))
            .await
            .unwrap();
        assert!(stored.id > 0);

        let loaded = ArticleRepository::by_slug(&storage, "one-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.source_url, "http://e/1");
        assert_eq!(loaded.author.as_deref(), Some("Reporter"));

        let dup_url = ArticleRepository::insert(&storage, &article("http://e/1", "one-2"))
            .await
            .unwrap_err();
        assert!(matches!(dup_url, Error::Conflict(_)));

        let dup_slug = ArticleRepository::insert(&storage, &article("http://e/2", "one-1"))
            .await
            .unwrap_err();
        assert!(matches!(dup_slug, Error::Conflict(_)));

        assert!(storage.exists_by_source_url("http://e/1").await.unwrap());
        assert_eq!(storage.count_active().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_search_and_paging() {
        let (_dir, storage) = open_temp().await;
        for i in 0..3 {
            let mut a = article(&format!("http://e/{}", i), &format!("s-{}", i));
            a.title = format!("Budget Story {}", i);
            a.published_at = Some(Utc::now() - chrono::Duration::minutes(i));
            ArticleRepository::insert(&storage, &a).await.unwrap();
        }

        let hits = storage.search("budget", 1, 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].slug, "s-0");

        let rest = storage.search("budget", 2, 2).await.unwrap();
        assert_eq!(rest.len(), 1);

        storage.increment_view_count(hits[0].id).await.unwrap();
        let reloaded = ArticleRepository::by_slug(&storage, "s-0")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.view_count, 1);
    }

    #[tokio::test]
    async fn test_source_round_trip_with_scraping_config() {
        let (_dir, storage) = open_temp().await;

        let source = Source {
            id: 0,
            name: "Example".to_string(),
            slug: "example".to_string(),
            base_url: "https://e".to_string(),
            logo_url: None,
            fetch_method: FetchMethod::Scrape,
            feed_url: None,
            api_endpoint: None,
            api_key: None,
            fetch_interval_minutes: 15,
            last_fetched_at: None,
            is_active: true,
            scraping: Some(ScrapingConfig {
                list_page_url: Some("https://e/list".to_string()),
                title_selector: Some("h1.headline".to_string()),
                ..Default::default()
            }),
        };

        let stored = SourceRepository::insert(&storage, &source).await.unwrap();
        let loaded = SourceRepository::by_id(&storage, stored.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.fetch_method, FetchMethod::Scrape);
        assert_eq!(
            loaded.scraping.as_ref().unwrap().title_selector.as_deref(),
            Some("h1.headline")
        );

        let when = Utc::now();
        storage.update_last_fetched(stored.id, when).await.unwrap();
        let loaded = SourceRepository::by_slug(&storage, "example")
            .await
            .unwrap()
            .unwrap();
        // RFC 3339 round trip keeps sub-second precision.
        assert_eq!(loaded.last_fetched_at, Some(when));

        assert_eq!(SourceRepository::list_active(&storage).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_category_crud_and_clear() {
        let (_dir, storage) = open_temp().await;

        let category = Category {
            id: 0,
            name: "Sports".to_string(),
            local_name: "Sports".to_string(),
            slug: "sports".to_string(),
            description: None,
            icon: None,
            color: None,
            sort_order: 1,
            is_active: true,
        };
        let stored = CategoryRepository::insert(&storage, &category).await.unwrap();

        let mut a = article("http://e/1", "one-1");
        a.category_id = Some(stored.id);
        ArticleRepository::insert(&storage, &a).await.unwrap();
        assert_eq!(storage.count_by_category(stored.id).await.unwrap(), 1);

        storage.clear_category(stored.id).await.unwrap();
        assert_eq!(storage.count_by_category(stored.id).await.unwrap(), 0);

        CategoryRepository::delete(&storage, stored.id).await.unwrap();
        let err = CategoryRepository::delete(&storage, stored.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_blob_round_trip() {
        let (_dir, storage) = open_temp().await;
        let meta = BlobMetadata {
            content_type: "image/jpeg".to_string(),
            role: nw_core::models::BlobRole::Original,
            article_id: Some(1),
            source_url: Some("http://e/img.jpg".to_string()),
            width: 100,
            height: 50,
            thumb_id: None,
            origin_id: None,
            uploaded_at: Utc::now(),
        };

        let id = storage.upload(vec![9, 9, 9], "img.jpg", meta).await.unwrap();
        assert_eq!(storage.download(&id).await.unwrap(), Some(vec![9, 9, 9]));

        storage.set_thumbnail(&id, "thumb-1").await.unwrap();
        let meta = BlobStore::metadata(&storage, &id).await.unwrap().unwrap();
        assert_eq!(meta.thumb_id.as_deref(), Some("thumb-1"));

        BlobStore::delete(&storage, &id).await.unwrap();
        assert_eq!(storage.download(&id).await.unwrap(), None);
    }
}

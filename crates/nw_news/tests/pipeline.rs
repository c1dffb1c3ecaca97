//! End-to-end ingestion scenarios against the in-memory backends, with
//! fixture pages served from a local listener.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::Path;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use chrono::Utc;

use nw_cache::MemoryCache;
use nw_core::storage::{ArticleRepository, SourceRepository};
use nw_core::{Candidate, Error, FetchMethod, ScrapingConfig, Source};
use nw_fetch::scheduler::CandidateImporter;
use nw_fetch::{FetchDispatcher, FetchScheduler};
use nw_images::ImageService;
use nw_news::NewsService;
use nw_storage::memory::{MemoryBlobStore, MemoryStorage};

struct Harness {
    storage: Arc<MemoryStorage>,
    cache: Arc<MemoryCache>,
    news: Arc<NewsService>,
}

fn harness() -> Harness {
    let storage = Arc::new(MemoryStorage::new());
    let cache = Arc::new(MemoryCache::new());
    let images = Arc::new(ImageService::new(Arc::new(MemoryBlobStore::new())));
    let news = Arc::new(NewsService::new(
        storage.clone(),
        storage.clone(),
        storage.clone(),
        cache.clone(),
        images,
    ));
    Harness {
        storage,
        cache,
        news,
    }
}

async fn list_page() -> Html<&'static str> {
    Html(
        r#"<html><body>
            <a href="/articles/1">One</a>
            <a href="/articles/2">Two</a>
            <a href="/articles/3">Three</a>
        </body></html>"#,
    )
}

async fn big_list() -> Html<String> {
    let links: String = (1..=25)
        .map(|n| format!(r#"<a href="/valid/{}">{}</a>"#, n, n))
        .collect();
    Html(format!("<html><body>{}</body></html>", links))
}

async fn article_page(Path(n): Path<u32>) -> Html<String> {
    if n == 2 {
        // No headline: the scraper must discard this one.
        return Html("<html><body><article><p>orphan body</p></article></body></html>".to_string());
    }
    Html(format!(
        r#"<html><body>
            <h1>Story {n}</h1>
            <article><p>Body of story {n}.</p></article>
            <span class="author">Staff Writer</span>
        </body></html>"#
    ))
}

async fn valid_article(Path(n): Path<u32>) -> Html<String> {
    Html(format!(
        "<html><body><h1>Valid {n}</h1><article><p>text</p></article></body></html>"
    ))
}

async fn serve_fixture() -> String {
    let app = Router::new()
        .route("/list", get(list_page))
        .route("/big-list", get(big_list))
        .route("/articles/:n", get(article_page))
        .route("/valid/:n", get(valid_article));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn scrape_source(id: i64, base: &str, list_path: &str) -> Source {
    Source {
        id,
        name: "Fixture Daily".to_string(),
        slug: "fixture-daily".to_string(),
        base_url: base.to_string(),
        logo_url: None,
        fetch_method: FetchMethod::Scrape,
        feed_url: None,
        api_endpoint: None,
        api_key: None,
        fetch_interval_minutes: 30,
        last_fetched_at: None,
        is_active: true,
        scraping: Some(ScrapingConfig {
            list_page_url: Some(format!("{}{}", base, list_path)),
            ..Default::default()
        }),
    }
}

fn candidate(title: &str, url: &str) -> Candidate {
    Candidate {
        title: title.to_string(),
        summary: Some("summary".to_string()),
        content: Some("<p>body</p>".to_string()),
        source_url: url.to_string(),
        image_url: None,
        author: None,
        published_at: Some(Utc::now()),
        source_id: 1,
        category_id: None,
    }
}

#[tokio::test]
async fn scrape_cycle_imports_titled_articles_and_stamps_source() {
    let base = serve_fixture().await;
    let h = harness();

    let stored = SourceRepository::insert(&*h.storage, &scrape_source(0, &base, "/list"))
        .await
        .unwrap();

    let scheduler = FetchScheduler::new(
        h.storage.clone(),
        FetchDispatcher::new(),
        h.news.clone() as Arc<dyn CandidateImporter>,
    );

    let before = Utc::now();
    let accepted = scheduler.run_one(stored.id).await.unwrap();
    // Three links, one page without a title.
    assert_eq!(accepted, 2);

    let source = SourceRepository::by_id(&*h.storage, stored.id)
        .await
        .unwrap()
        .unwrap();
    assert!(source.last_fetched_at.unwrap() >= before);

    // The same cycle again finds nothing new.
    let accepted = scheduler.run_one(stored.id).await.unwrap();
    assert_eq!(accepted, 0);
    assert_eq!(h.storage.count_active().await.unwrap(), 2);
}

#[tokio::test]
async fn scrape_cycle_caps_at_twenty_links() {
    let base = serve_fixture().await;
    let h = harness();

    let source = scrape_source(1, &base, "/big-list");
    let dispatcher = FetchDispatcher::new();
    let candidates = dispatcher.fetch(&source).await.unwrap();
    assert_eq!(candidates.len(), 20);

    let accepted = h.news.import(candidates).await.unwrap();
    assert_eq!(accepted, 20);
}

#[tokio::test]
async fn run_all_due_skips_recently_fetched_sources() {
    let base = serve_fixture().await;
    let h = harness();

    let mut fresh = scrape_source(0, &base, "/list");
    fresh.last_fetched_at = Some(Utc::now());
    SourceRepository::insert(&*h.storage, &fresh).await.unwrap();

    let scheduler = FetchScheduler::new(
        h.storage.clone(),
        FetchDispatcher::new(),
        h.news.clone() as Arc<dyn CandidateImporter>,
    );
    scheduler.run_all_due().await;

    // Fetched seconds ago with a 30 minute interval: nothing imported.
    assert_eq!(h.storage.count_active().await.unwrap(), 0);
}

#[tokio::test]
async fn import_deduplicates_by_source_url() {
    let h = harness();

    h.news
        .create(candidate("Old One", "http://w.example/1"))
        .await
        .unwrap();
    h.news
        .create(candidate("Old Two", "http://w.example/2"))
        .await
        .unwrap();

    let batch = vec![
        candidate("Old One", "http://w.example/1"),
        candidate("Old Two", "http://w.example/2"),
        candidate("New Three", "http://w.example/3"),
        candidate("New Four", "http://w.example/4"),
        candidate("New Five", "http://w.example/5"),
    ];

    let accepted = h.news.import(batch).await.unwrap();
    assert_eq!(accepted, 3);
    assert_eq!(h.storage.count_active().await.unwrap(), 5);

    // Importing the same batch again accepts nothing.
    let batch = vec![candidate("New Five", "http://w.example/5")];
    assert_eq!(h.news.import(batch).await.unwrap(), 0);
}

#[tokio::test]
async fn identical_titles_get_distinct_slugs() {
    let h = harness();

    let a = h
        .news
        .create(candidate("Same Headline", "http://w.example/a"))
        .await
        .unwrap();
    let b = h
        .news
        .create(candidate("Same Headline", "http://w.example/b"))
        .await
        .unwrap();

    assert_ne!(a.slug, b.slug);
    assert!(a.slug.starts_with("same-headline-"));
    assert!(b.slug.starts_with("same-headline-"));
}

#[tokio::test]
async fn direct_create_conflicts_on_duplicate_url() {
    let h = harness();

    h.news
        .create(candidate("First", "http://w.example/dup"))
        .await
        .unwrap();
    let err = h
        .news
        .create(candidate("Second", "http://w.example/dup"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
}

#[tokio::test]
async fn detail_read_fires_detached_view_count_increment() {
    let h = harness();

    let stored = h
        .news
        .create(candidate("Viewed", "http://w.example/v"))
        .await
        .unwrap();

    // Second read is a cache hit; the increment still fires.
    assert!(h.news.detail(&stored.slug).await.unwrap().is_some());
    assert!(h.news.detail(&stored.slug).await.unwrap().is_some());
    assert!(h.news.detail("missing-slug").await.unwrap().is_none());

    tokio::time::sleep(Duration::from_millis(100)).await;
    let article = ArticleRepository::by_slug(&*h.storage, &stored.slug)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(article.view_count, 2);
}

#[tokio::test]
async fn import_invalidates_latest_listing() {
    use nw_core::cache::CacheStore;

    let h = harness();

    h.news
        .create(candidate("Seed", "http://w.example/seed"))
        .await
        .unwrap();

    let first = h.news.latest(1, 10).await.unwrap();
    assert_eq!(first.total_count, 1);
    assert!(h.cache.get("news:latest:1:10").await.unwrap().is_some());

    h.news
        .import(vec![candidate("Follow Up", "http://w.example/follow")])
        .await
        .unwrap();

    // The import dropped the listing keys; expiry is not what surfaces it.
    assert!(h.cache.get("news:latest:1:10").await.unwrap().is_none());
    let second = h.news.latest(1, 10).await.unwrap();
    assert_eq!(second.total_count, 2);
    assert_eq!(second.items.len(), 2);
}

#[tokio::test]
async fn category_and_source_pages_for_unknown_slugs_are_empty() {
    let h = harness();
    let page = h.news.by_category("nope", 1, 10).await.unwrap();
    assert!(page.items.is_empty());
    let page = h.news.by_source("nope", 1, 10).await.unwrap();
    assert!(page.items.is_empty());
    let page = h.news.search("   ", 1, 10).await.unwrap();
    assert!(page.items.is_empty());
}

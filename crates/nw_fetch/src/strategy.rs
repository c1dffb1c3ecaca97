use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use nw_core::text::{strip_html, strip_html_opt};
use nw_core::{Candidate, Error, FetchMethod, Result, ScrapingConfig, Source};

use crate::extract::ContentExtractor;
use crate::feed::FeedParser;

/// Cap on article links processed per scrape cycle. Bounds the cost of one
/// cycle and keeps request volume polite toward the source.
pub const MAX_LINKS_PER_CYCLE: usize = 20;

/// One fetch behavior per [`FetchMethod`] variant, selected by tag by the
/// [`FetchDispatcher`]. Implementations absorb transient network failures
/// and return an empty list instead; `Err` is reserved for misdispatch.
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    fn method(&self) -> FetchMethod;

    async fn fetch(&self, source: &Source) -> Result<Vec<Candidate>>;
}

/// Pulls a source's syndication feed and maps entries to candidates.
pub struct FeedStrategy {
    parser: FeedParser,
}

impl FeedStrategy {
    pub fn new() -> Self {
        Self {
            parser: FeedParser::new(),
        }
    }
}

impl Default for FeedStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchStrategy for FeedStrategy {
    fn method(&self) -> FetchMethod {
        FetchMethod::Feed
    }

    async fn fetch(&self, source: &Source) -> Result<Vec<Candidate>> {
        let Some(feed_url) = source.feed_url.as_deref().filter(|u| !u.is_empty()) else {
            warn!("feed URL is empty for source: {}", source.name);
            return Ok(Vec::new());
        };

        let items = self.parser.parse(feed_url).await;

        Ok(items
            .into_iter()
            .map(|item| Candidate {
                title: item.title,
                // Feed summaries are rendered as plain text downstream.
                summary: strip_html_opt(item.summary.as_deref()),
                content: None,
                source_url: item.link,
                image_url: item.image_url,
                author: None,
                published_at: item.published_at,
                source_id: source.id,
                category_id: None,
            })
            .collect())
    }
}

/// Extension point for structured API sources. Logs and yields nothing.
pub struct ApiStrategy;

#[async_trait]
impl FetchStrategy for ApiStrategy {
    fn method(&self) -> FetchMethod {
        FetchMethod::Api
    }

    async fn fetch(&self, source: &Source) -> Result<Vec<Candidate>> {
        info!("API fetching not implemented for source: {}", source.name);
        Ok(Vec::new())
    }
}

/// Walks a source's list page and scrapes each linked article with the
/// source's configured selectors.
pub struct ScrapeStrategy {
    extractor: ContentExtractor,
}

impl ScrapeStrategy {
    pub fn new() -> Self {
        Self {
            extractor: ContentExtractor::new(),
        }
    }

    /// Scrape a single article page. Title is the only mandatory field:
    /// without one the article is discarded. Everything else degrades to
    /// absence independently.
    pub async fn fetch_article(&self, url: &str, config: &ScrapingConfig) -> Option<Candidate> {
        let title_selector = config.title_selector.as_deref().unwrap_or("h1");
        let title = self.extractor.extract_content(url, title_selector).await?;
        let title = strip_html(&title);
        if title.is_empty() {
            return None;
        }

        let content = self
            .extractor
            .extract_content(url, config.content_selector.as_deref().unwrap_or("article"))
            .await;
        let summary = self
            .extractor
            .extract_content(url, config.summary_selector.as_deref().unwrap_or("p"))
            .await;
        let image_url = self
            .extractor
            .extract_attribute(url, config.image_selector.as_deref().unwrap_or("img"), "src")
            .await;
        let author = self
            .extractor
            .extract_content(url, config.author_selector.as_deref().unwrap_or(".author"))
            .await;

        Some(Candidate {
            title,
            summary: strip_html_opt(summary.as_deref()),
            content,
            source_url: url.to_string(),
            image_url,
            author: strip_html_opt(author.as_deref()),
            // Arbitrary pages rarely carry a parseable date; extraction time
            // is the stable fallback.
            published_at: Some(Utc::now()),
            source_id: 0,
            category_id: None,
        })
    }
}

impl Default for ScrapeStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchStrategy for ScrapeStrategy {
    fn method(&self) -> FetchMethod {
        FetchMethod::Scrape
    }

    async fn fetch(&self, source: &Source) -> Result<Vec<Candidate>> {
        let Some(config) = source.scraping.as_ref() else {
            warn!("scraping config is missing for source: {}", source.name);
            return Ok(Vec::new());
        };
        let Some(list_url) = config.list_page_url.as_deref().filter(|u| !u.is_empty()) else {
            warn!("scraping list page is missing for source: {}", source.name);
            return Ok(Vec::new());
        };

        let link_selector = config.article_link_selector.as_deref().unwrap_or("a");
        let links = self.extractor.extract_links(list_url, link_selector).await;

        let mut candidates = Vec::new();
        for link in links.iter().take(MAX_LINKS_PER_CYCLE) {
            match self.fetch_article(link, config).await {
                Some(mut candidate) => {
                    candidate.source_id = source.id;
                    candidates.push(candidate);
                }
                None => {
                    warn!("skipping article without usable content: {}", link);
                }
            }
        }

        Ok(candidates)
    }
}

/// Resolves a source's configured fetch method to its strategy.
pub struct FetchDispatcher {
    strategies: Vec<Box<dyn FetchStrategy>>,
}

impl FetchDispatcher {
    pub fn new() -> Self {
        let mut dispatcher = Self {
            strategies: Vec::new(),
        };
        dispatcher.register(Box::new(FeedStrategy::new()));
        dispatcher.register(Box::new(ApiStrategy));
        dispatcher.register(Box::new(ScrapeStrategy::new()));
        dispatcher
    }

    pub fn register(&mut self, strategy: Box<dyn FetchStrategy>) {
        self.strategies.push(strategy);
    }

    pub async fn fetch(&self, source: &Source) -> Result<Vec<Candidate>> {
        let strategy = self
            .strategies
            .iter()
            .find(|s| s.method() == source.fetch_method)
            .ok_or_else(|| {
                Error::Scraping(format!(
                    "no strategy registered for fetch method: {}",
                    source.fetch_method
                ))
            })?;

        strategy.fetch(source).await
    }
}

impl Default for FetchDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

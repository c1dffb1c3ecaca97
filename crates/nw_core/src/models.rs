use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a configured source is pulled: syndication feed, structured API
/// endpoint, or selector-driven HTML scraping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMethod {
    Feed,
    Api,
    Scrape,
}

impl std::fmt::Display for FetchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchMethod::Feed => write!(f, "feed"),
            FetchMethod::Api => write!(f, "api"),
            FetchMethod::Scrape => write!(f, "scrape"),
        }
    }
}

impl std::str::FromStr for FetchMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "feed" | "rss" => Ok(FetchMethod::Feed),
            "api" => Ok(FetchMethod::Api),
            "scrape" => Ok(FetchMethod::Scrape),
            other => Err(format!("unknown fetch method: {}", other)),
        }
    }
}

/// Selectors used when a source is fetched by scraping. All fields are
/// optional; the scrape strategy falls back to generic defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapingConfig {
    pub list_page_url: Option<String>,
    pub article_link_selector: Option<String>,
    pub title_selector: Option<String>,
    pub content_selector: Option<String>,
    pub summary_selector: Option<String>,
    pub image_selector: Option<String>,
    pub author_selector: Option<String>,
    pub date_selector: Option<String>,
}

/// A configured external origin of news content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub base_url: String,
    pub logo_url: Option<String>,
    pub fetch_method: FetchMethod,
    pub feed_url: Option<String>,
    pub api_endpoint: Option<String>,
    pub api_key: Option<String>,
    pub fetch_interval_minutes: i64,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub scraping: Option<ScrapingConfig>,
}

/// Unpersisted result of one fetch attempt. Carries no identity until it
/// survives dedup and becomes an [`Article`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Candidate {
    pub title: String,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub source_url: String,
    pub image_url: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub source_id: i64,
    pub category_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub summary: Option<String>,
    pub content: Option<String>,
    /// Content with markup stripped, used for substring search.
    pub plain_text: Option<String>,
    /// Canonical URL at the source. Unique across storage; the dedup key.
    pub source_url: String,
    pub image_url: Option<String>,
    pub image_id: Option<String>,
    pub thumb_id: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
    pub view_count: i64,
    pub is_featured: bool,
    pub is_active: bool,
    pub source_id: i64,
    pub category_id: Option<i64>,
}

impl Article {
    /// Ordering timestamp for listings: publish time when the source
    /// provided one, ingestion time otherwise.
    pub fn sort_time(&self) -> DateTime<Utc> {
        self.published_at.unwrap_or(self.fetched_at)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub local_name: String,
    pub slug: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub sort_order: i64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobRole {
    Original,
    Thumbnail,
}

/// Metadata stored alongside an image blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobMetadata {
    pub content_type: String,
    pub role: BlobRole,
    pub article_id: Option<i64>,
    pub source_url: Option<String>,
    pub width: u32,
    pub height: u32,
    /// On originals, the id of the derived thumbnail once generated.
    pub thumb_id: Option<String>,
    /// On thumbnails, the id of the original they were derived from.
    pub origin_id: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> PagedResult<T> {
    pub fn empty(page: u32, page_size: u32) -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
            page,
            page_size,
        }
    }
}

use std::time::Duration;

use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use tracing::warn;

/// One normalized syndication entry, before dedup and import.
#[derive(Debug, Clone)]
pub struct FeedItem {
    pub title: String,
    pub summary: Option<String>,
    pub link: String,
    pub image_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Fetches and parses RSS/Atom/JSON feeds. A malformed or unreachable feed
/// yields an empty list, never an error.
pub struct FeedParser {
    client: reqwest::Client,
}

impl FeedParser {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }

    pub async fn parse(&self, feed_url: &str) -> Vec<FeedItem> {
        let bytes = match self.client.get(feed_url).send().await {
            Ok(response) => match response.bytes().await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("failed to read feed body from {}: {}", feed_url, e);
                    return Vec::new();
                }
            },
            Err(e) => {
                warn!("failed to fetch feed {}: {}", feed_url, e);
                return Vec::new();
            }
        };

        match items_from_bytes(&bytes) {
            Ok(items) => items,
            Err(e) => {
                warn!("failed to parse feed {}: {}", feed_url, e);
                Vec::new()
            }
        }
    }
}

impl Default for FeedParser {
    fn default() -> Self {
        Self::new()
    }
}

fn items_from_bytes(bytes: &[u8]) -> anyhow::Result<Vec<FeedItem>> {
    let feed = feed_rs::parser::parse(bytes)?;

    let items = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            // Entries without a link cannot be deduplicated or revisited.
            let link = entry.links.first().map(|l| l.href.clone())?;

            let content_body = entry.content.and_then(|c| c.body);
            let summary = entry.summary.map(|t| t.content);

            let image_url = content_body
                .as_deref()
                .and_then(first_image)
                .or_else(|| summary.as_deref().and_then(first_image));

            Some(FeedItem {
                title: entry.title.map(|t| t.content).unwrap_or_default(),
                summary,
                link,
                image_url,
                published_at: entry.published.or(entry.updated),
            })
        })
        .collect();

    Ok(items)
}

/// `src` of the first image embedded in an HTML fragment.
fn first_image(html: &str) -> Option<String> {
    let selector = Selector::parse("img").ok()?;
    let fragment = Html::parse_fragment(html);
    fragment
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("src"))
        .map(|src| src.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example Wire</title>
    <link>https://news.example</link>
    <item>
      <title>First Story</title>
      <link>https://news.example/first</link>
      <description>&lt;p&gt;Lead &lt;b&gt;text&lt;/b&gt;&lt;/p&gt;&lt;img src="https://cdn.example/first.jpg"&gt;</description>
      <pubDate>Mon, 03 Aug 2026 10:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Second Story</title>
      <link>https://news.example/second</link>
      <description>No image here.</description>
    </item>
    <item>
      <title>Linkless</title>
      <description>dropped</description>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_items_from_bytes() {
        let items = items_from_bytes(RSS.as_bytes()).unwrap();
        assert_eq!(items.len(), 2);

        assert_eq!(items[0].title, "First Story");
        assert_eq!(items[0].link, "https://news.example/first");
        assert_eq!(
            items[0].image_url,
            Some("https://cdn.example/first.jpg".to_string())
        );
        assert!(items[0].published_at.is_some());

        assert_eq!(items[1].title, "Second Story");
        assert_eq!(items[1].image_url, None);
        assert_eq!(items[1].published_at, None);
    }

    #[test]
    fn test_malformed_feed_is_an_error() {
        assert!(items_from_bytes(b"this is not xml").is_err());
    }

    #[test]
    fn test_first_image() {
        assert_eq!(
            first_image(r#"<p>x</p><img src="a.jpg"><img src="b.jpg">"#),
            Some("a.jpg".to_string())
        );
        assert_eq!(first_image("<p>none</p>"), None);
    }
}

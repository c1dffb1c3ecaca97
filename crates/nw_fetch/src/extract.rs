use std::collections::HashSet;
use std::time::Duration;

use scraper::{Html, Selector};
use tracing::warn;
use url::Url;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Selector-driven extraction over freshly fetched HTML. Every call hits the
/// network; callers accept the cost. All operations fail soft: network and
/// parse failures, invalid selectors and non-matching selectors all collapse
/// to an absent result so one bad page never takes down a fetch cycle.
pub struct ContentExtractor {
    client: reqwest::Client,
}

impl ContentExtractor {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }

    /// Inner HTML of the first node matching `selector`, or None.
    pub async fn extract_content(&self, url: &str, selector: &str) -> Option<String> {
        let html = self.fetch(url).await?;
        select_inner_html(&html, selector)
    }

    /// Attribute value of the first node matching `selector`, or None.
    pub async fn extract_attribute(
        &self,
        url: &str,
        selector: &str,
        attribute: &str,
    ) -> Option<String> {
        let html = self.fetch(url).await?;
        select_attr(&html, selector, attribute)
    }

    /// Hrefs of all nodes matching `selector`, resolved absolute against
    /// `url`, de-duplicated preserving document order. Empty on any failure.
    pub async fn extract_links(&self, url: &str, selector: &str) -> Vec<String> {
        match self.fetch(url).await {
            Some(html) => collect_links(&html, selector, url),
            None => Vec::new(),
        }
    }

    async fn fetch(&self, url: &str) -> Option<String> {
        match self.client.get(url).send().await {
            Ok(response) => match response.text().await {
                Ok(body) => Some(body),
                Err(e) => {
                    warn!("failed to read body from {}: {}", url, e);
                    None
                }
            },
            Err(e) => {
                warn!("failed to fetch {}: {}", url, e);
                None
            }
        }
    }
}

impl Default for ContentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn select_inner_html(html: &str, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    let document = Html::parse_document(html);
    document.select(&selector).next().map(|el| el.inner_html())
}

fn select_attr(html: &str, selector: &str, attribute: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    let document = Html::parse_document(html);
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr(attribute))
        .map(|v| v.to_string())
}

fn collect_links(html: &str, selector: &str, base_url: &str) -> Vec<String> {
    let selector = match Selector::parse(selector) {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    let base = match Url::parse(base_url) {
        Ok(u) => u,
        Err(e) => {
            warn!("invalid base url {}: {}", base_url, e);
            return Vec::new();
        }
    };

    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if href.is_empty() {
            continue;
        }
        let Ok(resolved) = base.join(href) else {
            continue;
        };
        let resolved = resolved.to_string();
        if seen.insert(resolved.clone()) {
            links.push(resolved);
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
            <h1>Main Headline</h1>
            <article><p>First paragraph.</p><p>Second.</p></article>
            <img src="/images/lead.jpg" alt="lead">
            <ul>
                <li><a href="/a/one">One</a></li>
                <li><a href="https://other.example/two">Two</a></li>
                <li><a href="/a/one">One again</a></li>
                <li><a href="">empty</a></li>
            </ul>
        </body></html>
    "#;

    #[test]
    fn test_select_inner_html() {
        assert_eq!(
            select_inner_html(PAGE, "h1"),
            Some("Main Headline".to_string())
        );
        assert_eq!(
            select_inner_html(PAGE, "article"),
            Some("<p>First paragraph.</p><p>Second.</p>".to_string())
        );
        assert_eq!(select_inner_html(PAGE, ".missing"), None);
        // An unparseable selector is a non-match, not an error.
        assert_eq!(select_inner_html(PAGE, "<<nope>>"), None);
    }

    #[test]
    fn test_select_attr() {
        assert_eq!(
            select_attr(PAGE, "img", "src"),
            Some("/images/lead.jpg".to_string())
        );
        assert_eq!(select_attr(PAGE, "img", "data-nope"), None);
        assert_eq!(select_attr(PAGE, "video", "src"), None);
    }

    #[test]
    fn test_collect_links_resolves_and_dedups() {
        let links = collect_links(PAGE, "a", "https://news.example/list");
        assert_eq!(
            links,
            vec![
                "https://news.example/a/one".to_string(),
                "https://other.example/two".to_string(),
            ]
        );
    }

    #[test]
    fn test_collect_links_bad_inputs() {
        assert!(collect_links(PAGE, "<<nope>>", "https://news.example/").is_empty());
        assert!(collect_links(PAGE, "a", "not a url").is_empty());
    }
}

//! Builders for the hierarchical cache key space. Keeping key construction
//! in one place keeps invalidation testable and out of string-format drift.

pub const CATEGORIES_ALL: &str = "categories:all";
pub const SOURCES_ACTIVE: &str = "sources:active";

pub const LATEST_PREFIX: &str = "news:latest:";
pub const FEATURED_PREFIX: &str = "news:featured:";
pub const NEWS_PREFIX: &str = "news:";
pub const SEARCH_PREFIX: &str = "search:";

pub fn latest(page: u32, page_size: u32) -> String {
    format!("news:latest:{}:{}", page, page_size)
}

pub fn by_category(category_id: i64, page: u32, page_size: u32) -> String {
    format!("news:category:{}:{}:{}", category_id, page, page_size)
}

pub fn by_source(source_id: i64, page: u32, page_size: u32) -> String {
    format!("news:source:{}:{}:{}", source_id, page, page_size)
}

pub fn article_slug(slug: &str) -> String {
    format!("news:article:slug:{}", slug)
}

pub fn featured(count: u32) -> String {
    format!("news:featured:{}", count)
}

pub fn category_slug(slug: &str) -> String {
    format!("category:slug:{}", slug)
}

/// Trailing-`*` pattern covering every paged variant of a key family.
pub fn prefix_pattern(prefix: &str) -> String {
    format!("{}*", prefix)
}

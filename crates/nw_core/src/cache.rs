use std::time::Duration;

use async_trait::async_trait;

use crate::Result;

/// Byte-level cache with per-key TTLs.
///
/// `remove_by_pattern` accepts trailing-`*` prefix patterns only. A backend
/// without key enumeration may implement it as a logged no-op and let TTLs
/// converge; it must not silently drop point removals.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
    async fn remove_by_pattern(&self, pattern: &str) -> Result<()>;
}

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use nw_core::cache::CacheStore;
use nw_core::Result;

struct Entry {
    bytes: Vec<u8>,
    expires_at: Instant,
}

/// In-process cache backend. Expired entries count as misses and are pruned
/// on the read that finds them. Because the full key set lives here,
/// trailing-`*` pattern removal converges immediately.
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Ok(Some(entry.bytes.clone()));
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: prune under the write lock.
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(key) {
            if entry.expires_at <= Instant::now() {
                entries.remove(key);
            }
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            Entry {
                bytes: value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }

    async fn remove_by_pattern(&self, pattern: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        match pattern.strip_suffix('*') {
            Some(prefix) => entries.retain(|key, _| !key.starts_with(prefix)),
            // Without a wildcard the pattern is an exact key.
            None => {
                entries.remove(pattern);
            }
        }
        Ok(())
    }
}

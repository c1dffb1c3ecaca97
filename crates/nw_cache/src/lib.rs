use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use nw_core::cache::CacheStore;
use nw_core::Result;

pub mod keys;
pub mod memory;

pub use memory::MemoryCache;

/// Listing pages and featured strips.
pub const TTL_SHORT: Duration = Duration::from_secs(5 * 60);
/// Detail-by-slug and category-by-slug lookups.
pub const TTL_MEDIUM: Duration = Duration::from_secs(15 * 60);
/// Full category list and active-source list.
pub const TTL_LONG: Duration = Duration::from_secs(60 * 60);

/// Read-through: return the cached value for `key`, computing and storing
/// it on a miss. Cache failures degrade to computing directly; a read never
/// fails because the cache did.
pub async fn get_or_set<T, F, Fut>(
    cache: &dyn CacheStore,
    key: &str,
    ttl: Duration,
    compute: F,
) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match cache.get(key).await {
        Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
            Ok(value) => return Ok(value),
            // A payload we can no longer decode counts as a miss.
            Err(e) => warn!("discarding undecodable cache entry {}: {}", key, e),
        },
        Ok(None) => {}
        Err(e) => warn!("cache read failed for {}: {}", key, e),
    }

    let value = compute().await?;

    match serde_json::to_vec(&value) {
        Ok(bytes) => {
            if let Err(e) = cache.set(key, bytes, ttl).await {
                warn!("cache write failed for {}: {}", key, e);
            }
        }
        Err(e) => warn!("cache encode failed for {}: {}", key, e),
    }

    Ok(value)
}

/// Read-through for optional lookups. Only found values are cached, so a
/// miss in storage stays re-checkable instead of pinning an absent result
/// for a full TTL.
pub async fn get_or_set_opt<T, F, Fut>(
    cache: &dyn CacheStore,
    key: &str,
    ttl: Duration,
    compute: F,
) -> Result<Option<T>>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    match cache.get(key).await {
        Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
            Ok(value) => return Ok(Some(value)),
            Err(e) => warn!("discarding undecodable cache entry {}: {}", key, e),
        },
        Ok(None) => {}
        Err(e) => warn!("cache read failed for {}: {}", key, e),
    }

    let value = compute().await?;

    if let Some(found) = &value {
        match serde_json::to_vec(found) {
            Ok(bytes) => {
                if let Err(e) = cache.set(key, bytes, ttl).await {
                    warn!("cache write failed for {}: {}", key, e);
                }
            }
            Err(e) => warn!("cache encode failed for {}: {}", key, e),
        }
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_get_or_set_computes_once() {
        let cache = MemoryCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value: u64 = get_or_set(&cache, "answer", TTL_SHORT, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(42)
            })
            .await
            .unwrap();
            assert_eq!(value, 42);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_set_recomputes_after_remove() {
        let cache = MemoryCache::new();
        let calls = AtomicUsize::new(0);

        let compute = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok("value".to_string())
        };

        let _: String = get_or_set(&cache, "k", TTL_SHORT, compute).await.unwrap();
        cache.remove("k").await.unwrap();
        let _: String = get_or_set(&cache, "k", TTL_SHORT, compute).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_get_or_set_opt_does_not_cache_absent() {
        let cache = MemoryCache::new();
        let calls = AtomicUsize::new(0);

        let compute = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(None::<String>)
        };

        assert_eq!(get_or_set_opt(&cache, "k", TTL_SHORT, compute).await.unwrap(), None);
        assert_eq!(get_or_set_opt(&cache, "k", TTL_SHORT, compute).await.unwrap(), None);
        // Absent results are recomputed every time.
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let found = || async { Ok(Some("hit".to_string())) };
        assert!(get_or_set_opt(&cache, "k2", TTL_SHORT, found).await.unwrap().is_some());
        // Second read must come from the cache even if compute would fail.
        let fail = || async { Err(nw_core::Error::Cache("not reached".to_string())) };
        assert_eq!(
            get_or_set_opt::<String, _, _>(&cache, "k2", TTL_SHORT, fail)
                .await
                .unwrap(),
            Some("hit".to_string())
        );
    }

    #[tokio::test]
    async fn test_get_or_set_expires() {
        let cache = MemoryCache::new();
        let calls = AtomicUsize::new(0);

        let compute = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(1u8)
        };

        let _: u8 = get_or_set(&cache, "k", Duration::from_millis(10), compute)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        let _: u8 = get_or_set(&cache, "k", Duration::from_millis(10), compute)
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}

use std::time::Duration;

use tracing::{debug, info, warn};

use super::upstream::{Recommender, UpstreamError};
use crate::cache::{CacheStore, Health};

pub const CACHE_TTL: Duration = Duration::from_secs(3600);

/// Cache key for a recommendation query. Case-folded so "Inception" and
/// "inception" share one entry.
pub fn cache_key(query: &str) -> String {
    format!("recommend:{}", query.to_lowercase())
}

/// Cache-aside fetch.
///
/// Reads the cache only while the backend reports itself available, falls
/// back to the upstream on any miss, and repopulates best-effort. Every
/// cache failure is absorbed here: an outage degrades the request to the
/// uncached path, it never fails it. Only the upstream can fail the call,
/// and it does so fast (one attempt, hard timeout).
pub async fn fetch_recommendations(
    cache: &dyn CacheStore,
    recommender: &dyn Recommender,
    query: &str,
) -> Result<serde_json::Value, UpstreamError> {
    let key = cache_key(query);
    let cache_available = cache.health() == Health::Available;

    if cache_available {
        match cache.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    debug!(%key, "serving recommendations from cache");
                    return Ok(value);
                }
                Err(e) => warn!(%key, error = %e, "corrupt cache entry, refetching"),
            },
            Ok(None) => debug!(%key, "cache miss"),
            Err(e) => {
                warn!(%key, error = %e, "cache read failed, treating as miss");
                cache.report_error();
            }
        }
    }

    info!(movie = %query, "fetching recommendations from upstream");
    let value = recommender.recommend(query).await?;

    if cache_available {
        match serde_json::to_string(&value) {
            Ok(raw) => {
                if let Err(e) = cache.put(&key, &raw, CACHE_TTL).await {
                    warn!(%key, error = %e, "cache write failed");
                    cache.report_error();
                }
            }
            Err(e) => warn!(%key, error = %e, "could not serialize recommendations"),
        }
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::NoopCache;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct MemoryCache {
        entries: Mutex<HashMap<String, String>>,
        health: Health,
        fail_io: bool,
        reported: AtomicUsize,
    }

    impl MemoryCache {
        fn available() -> Self {
            Self {
                entries: Mutex::new(HashMap::new()),
                health: Health::Available,
                fail_io: false,
                reported: AtomicUsize::new(0),
            }
        }

        fn broken() -> Self {
            Self {
                fail_io: true,
                ..Self::available()
            }
        }
    }

    #[async_trait]
    impl CacheStore for MemoryCache {
        fn health(&self) -> Health {
            self.health
        }

        async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
            if self.fail_io {
                anyhow::bail!("connection reset by peer");
            }
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn put(&self, key: &str, value: &str, _ttl: Duration) -> anyhow::Result<()> {
            if self.fail_io {
                anyhow::bail!("connection reset by peer");
            }
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn report_error(&self) {
            self.reported.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct ScriptedRecommender {
        calls: AtomicUsize,
        fail: bool,
    }

    impl ScriptedRecommender {
        fn ok() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Recommender for ScriptedRecommender {
        async fn recommend(&self, movie: &str) -> Result<serde_json::Value, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(UpstreamError::Status(reqwest::StatusCode::BAD_GATEWAY));
            }
            Ok(json!({
                "movie": movie,
                "recommendations": [
                    { "id": 42, "title": "Blade Runner", "vote_average": 7.9, "popularity": 90.1 }
                ]
            }))
        }
    }

    #[test]
    fn cache_key_is_case_folded_and_namespaced() {
        assert_eq!(cache_key("Inception"), "recommend:inception");
        assert_eq!(cache_key("The MATRIX"), "recommend:the matrix");
    }

    #[tokio::test]
    async fn unavailable_cache_still_serves_the_upstream_result() {
        let recommender = ScriptedRecommender::ok();
        let result = fetch_recommendations(&NoopCache, &recommender, "Inception")
            .await
            .expect("degraded fetch succeeds");
        assert_eq!(result["movie"], "Inception");
        assert_eq!(recommender.call_count(), 1);
    }

    #[tokio::test]
    async fn second_call_with_different_case_hits_the_cache() {
        let cache = MemoryCache::available();
        let recommender = ScriptedRecommender::ok();

        let first = fetch_recommendations(&cache, &recommender, "Inception")
            .await
            .expect("first fetch");
        assert!(cache
            .entries
            .lock()
            .unwrap()
            .contains_key("recommend:inception"));

        let second = fetch_recommendations(&cache, &recommender, "INCEPTION")
            .await
            .expect("cached fetch");
        assert_eq!(recommender.call_count(), 1, "upstream must not be called twice");
        assert_eq!(first["recommendations"], second["recommendations"]);
    }

    #[tokio::test]
    async fn read_failure_degrades_to_upstream_and_reports() {
        let cache = MemoryCache::broken();
        let recommender = ScriptedRecommender::ok();

        let result = fetch_recommendations(&cache, &recommender, "Heat")
            .await
            .expect("request survives the cache outage");
        assert_eq!(result["movie"], "Heat");
        assert_eq!(recommender.call_count(), 1);
        // Both the failed read and the failed write-back were reported to
        // the lifecycle supervisor.
        assert_eq!(cache.reported.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn corrupt_cache_entry_is_refetched() {
        let cache = MemoryCache::available();
        cache
            .entries
            .lock()
            .unwrap()
            .insert("recommend:alien".to_string(), "not json{{".to_string());
        let recommender = ScriptedRecommender::ok();

        let result = fetch_recommendations(&cache, &recommender, "Alien")
            .await
            .expect("refetch succeeds");
        assert_eq!(result["movie"], "Alien");
        assert_eq!(recommender.call_count(), 1);
    }

    #[tokio::test]
    async fn upstream_failure_fails_fast() {
        let cache = MemoryCache::available();
        let recommender = ScriptedRecommender::failing();

        let err = fetch_recommendations(&cache, &recommender, "Dune")
            .await
            .expect_err("upstream error surfaces");
        assert!(matches!(err, UpstreamError::Status(_)));
        assert_eq!(recommender.call_count(), 1, "no retry");
        assert!(cache.entries.lock().unwrap().is_empty());
    }
}

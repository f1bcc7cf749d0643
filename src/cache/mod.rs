use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

pub mod redis;

/// Backend availability as seen by request paths.
///
/// `Unknown` until the first successful connection, then flipped between
/// `Available` and `Unavailable` by the backend's own lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Health {
    Unknown = 0,
    Available = 1,
    Unavailable = 2,
}

/// Shared tri-state flag. Single writer (the connection supervisor), many
/// lock-free readers (every request that considers the cache).
#[derive(Clone)]
pub struct HealthFlag(Arc<AtomicU8>);

impl HealthFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU8::new(Health::Unknown as u8)))
    }

    pub fn get(&self) -> Health {
        match self.0.load(Ordering::Relaxed) {
            1 => Health::Available,
            2 => Health::Unavailable,
            _ => Health::Unknown,
        }
    }

    pub(crate) fn set(&self, health: Health) {
        self.0.store(health as u8, Ordering::Relaxed);
    }
}

impl Default for HealthFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Key-value store with TTL, used best-effort in front of the upstream.
///
/// `get`/`put` errors are transport-level; callers log them, call
/// `report_error`, and carry on as if the lookup missed.
#[async_trait]
pub trait CacheStore: Send + Sync {
    fn health(&self) -> Health;

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<()>;

    /// Notify the backend's lifecycle supervisor of a transport error.
    /// Request paths never write the health flag themselves.
    fn report_error(&self);
}

/// Cache double that is permanently offline: every lookup misses, every
/// write is discarded. Used in tests and wherever no backend is configured.
pub struct NoopCache;

#[async_trait]
impl CacheStore for NoopCache {
    fn health(&self) -> Health {
        Health::Unavailable
    }

    async fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    async fn put(&self, _key: &str, _value: &str, _ttl: Duration) -> anyhow::Result<()> {
        Ok(())
    }

    fn report_error(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_flag_starts_unknown_and_round_trips_states() {
        let flag = HealthFlag::new();
        assert_eq!(flag.get(), Health::Unknown);
        flag.set(Health::Available);
        assert_eq!(flag.get(), Health::Available);
        flag.set(Health::Unavailable);
        assert_eq!(flag.get(), Health::Unavailable);
    }

    #[test]
    fn health_flag_clones_share_state() {
        let flag = HealthFlag::new();
        let reader = flag.clone();
        flag.set(Health::Available);
        assert_eq!(reader.get(), Health::Available);
    }

    #[tokio::test]
    async fn noop_cache_always_misses() {
        let cache = NoopCache;
        assert_eq!(cache.health(), Health::Unavailable);
        assert!(cache.get("recommend:inception").await.expect("get ok").is_none());
        cache
            .put("recommend:inception", "{}", Duration::from_secs(1))
            .await
            .expect("put ok");
    }
}

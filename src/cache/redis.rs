use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use super::{CacheStore, Health, HealthFlag};

const RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

/// Redis-backed `CacheStore`.
///
/// Connection lifecycle is owned by a supervisor task, not by request paths:
/// callers only read the health flag and report transport errors. The
/// supervisor flips the flag to `Available` once a PING succeeds, to
/// `Unavailable` when an error is reported, and keeps probing until the
/// backend answers again.
pub struct RedisCache {
    conn: Arc<RwLock<Option<ConnectionManager>>>,
    health: HealthFlag,
    errors: mpsc::UnboundedSender<()>,
}

impl RedisCache {
    /// Spawns the supervisor and returns immediately; the cache reports
    /// `Unknown` until the first successful PING, so a dead Redis never
    /// delays startup.
    pub fn connect(url: &str) -> anyhow::Result<Arc<Self>> {
        let client = Client::open(url)?;
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();
        let cache = Arc::new(Self {
            conn: Arc::new(RwLock::new(None)),
            health: HealthFlag::new(),
            errors: errors_tx,
        });
        tokio::spawn(supervise(
            client,
            cache.conn.clone(),
            cache.health.clone(),
            errors_rx,
        ));
        Ok(cache)
    }
}

/// Sole writer of the health flag.
async fn supervise(
    client: Client,
    conn: Arc<RwLock<Option<ConnectionManager>>>,
    health: HealthFlag,
    mut errors: mpsc::UnboundedReceiver<()>,
) {
    loop {
        let manager = loop {
            match client.get_connection_manager().await {
                Ok(mut manager) => {
                    let pong: redis::RedisResult<String> =
                        redis::cmd("PING").query_async(&mut manager).await;
                    match pong {
                        Ok(_) => break manager,
                        Err(e) => warn!(error = %e, "cache ping failed"),
                    }
                }
                Err(e) => debug!(error = %e, "cache connect failed"),
            }
            tokio::time::sleep(RECONNECT_INTERVAL).await;
        };

        *conn.write().await = Some(manager);
        go_available(&health, &mut errors);
        info!("cache connected (caching enabled)");

        // Hold Available until a caller reports a transport error.
        if errors.recv().await.is_none() {
            return;
        }
        health.set(Health::Unavailable);
        *conn.write().await = None;
        warn!("cache connection lost (caching disabled)");
    }
}

/// Flip to Available, first discarding every error report still queued.
/// Reports raised against the torn-down connection say nothing about the
/// fresh one: a request can sit in its upstream call for seconds after the
/// outage and only then report, and consuming that report after recovery
/// would tear the new connection straight back down.
fn go_available(health: &HealthFlag, errors: &mut mpsc::UnboundedReceiver<()>) {
    while errors.try_recv().is_ok() {}
    health.set(Health::Available);
}

#[async_trait]
impl CacheStore for RedisCache {
    fn health(&self) -> Health {
        self.health.get()
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let Some(mut conn) = self.conn.read().await.clone() else {
            anyhow::bail!("cache not connected");
        };
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<()> {
        let Some(mut conn) = self.conn.read().await.clone() else {
            anyhow::bail!("cache not connected");
        };
        let _: () = conn.set_ex(key, value, ttl.as_secs()).await?;
        Ok(())
    }

    fn report_error(&self) {
        let _ = self.errors.send(());
    }
}

//! Redis-backed cache
//!
//! The connection is established on first use and retried on later calls if
//! it failed, so the service can start before Redis is reachable. Values are
//! stored JSON-encoded.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use redis::aio::ConnectionManager;
use tokio::sync::OnceCell;

use super::{effective_ttl, namespaced, CacheStore};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Minimum wait between connection attempts after a failure
const RECONNECT_COOLDOWN: Duration = Duration::from_secs(30);

pub struct RedisCache {
    client: redis::Client,
    connection: OnceCell<ConnectionManager>,
    last_failure: Mutex<Option<Instant>>,
}

impl RedisCache {
    /// Parse the connection URL without connecting
    pub fn open(url: &str) -> Result<Self, redis::RedisError> {
        Ok(Self {
            client: redis::Client::open(url)?,
            connection: OnceCell::new(),
            last_failure: Mutex::new(None),
        })
    }

    async fn connection(&self) -> Option<ConnectionManager> {
        if let Some(manager) = self.connection.get() {
            return Some(manager.clone());
        }

        if let Some(failed_at) = *self.last_failure.lock() {
            if failed_at.elapsed() < RECONNECT_COOLDOWN {
                return None;
            }
        }

        let result = self
            .connection
            .get_or_try_init(|| async {
                match tokio::time::timeout(CONNECT_TIMEOUT, ConnectionManager::new(self.client.clone())).await {
                    Ok(Ok(manager)) => {
                        tracing::info!("Redis connection established");
                        Ok(manager)
                    }
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(_) => Err("connection timed out".to_string()),
                }
            })
            .await;

        match result {
            Ok(manager) => Some(manager.clone()),
            Err(e) => {
                tracing::warn!("Redis unavailable: {}", e);
                *self.last_failure.lock() = Some(Instant::now());
                None
            }
        }
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.connection().await?;

        let raw: Option<String> = match redis::cmd("GET")
            .arg(namespaced(key))
            .query_async::<_, Option<String>>(&mut conn)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Redis GET failed: {}", e);
                return None;
            }
        };

        raw.and_then(|json| decode(&json))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };

        let Some(json) = encode(value) else {
            return false;
        };

        match set_cmd(key, &json, ttl).query_async::<_, ()>(&mut conn).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Redis SET failed: {}", e);
                false
            }
        }
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

/// `SET <namespaced key> <json> EX <seconds>`
fn set_cmd(key: &str, json: &str, ttl: Duration) -> redis::Cmd {
    let mut cmd = redis::cmd("SET");
    cmd.arg(namespaced(key))
        .arg(json)
        .arg("EX")
        .arg(effective_ttl(ttl).as_secs());
    cmd
}

fn encode(value: &str) -> Option<String> {
    serde_json::to_string(value).ok()
}

fn decode(json: &str) -> Option<String> {
    match serde_json::from_str::<String>(json) {
        Ok(value) if !value.is_empty() => Some(value),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("Discarding undecodable cache value: {}", e);
            None
        }
    }
}

/// Redis client wrapper
///
/// Wraps `redis::aio::ConnectionManager`, which reconnects on its own, and
/// puts a timeout around every command so a stalled Redis cannot hang a
/// request.

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};
use std::env;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RedisClientError {
    #[error("Redis connection error: {0}")]
    ConnectionError(String),

    #[error("Redis command error: {0}")]
    CommandError(String),

    #[error("Redis configuration error: {0}")]
    ConfigError(String),

    #[error("Redis command timed out")]
    Timeout,
}

impl From<RedisError> for RedisClientError {
    fn from(err: RedisError) -> Self {
        match err.kind() {
            redis::ErrorKind::IoError => RedisClientError::ConnectionError(err.to_string()),
            _ => RedisClientError::CommandError(err.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// `redis://[user:password@]host:port[/db]`
    pub url: String,

    /// Per-command timeout in seconds
    pub command_timeout_secs: u64,
}

impl RedisConfig {
    /// Reads `REDIS_URL` and `REDIS_COMMAND_TIMEOUT_SECS` (default 5)
    ///
    /// Returns None when `REDIS_URL` is unset or empty, meaning Redis is not
    /// used.
    pub fn from_env() -> Option<Self> {
        let url = env::var("REDIS_URL").ok().filter(|u| !u.trim().is_empty())?;

        let command_timeout_secs = env::var("REDIS_COMMAND_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Some(Self {
            url,
            command_timeout_secs,
        })
    }

    #[cfg(test)]
    pub fn default_for_test() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            command_timeout_secs: 5,
        }
    }
}

#[derive(Clone)]
pub struct RedisClient {
    manager: ConnectionManager,
    command_timeout: Duration,
}

impl RedisClient {
    /// Connects to Redis
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the first connection fails.
    pub async fn new(config: RedisConfig) -> Result<Self, RedisClientError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| RedisClientError::ConfigError(format!("Invalid Redis URL: {}", e)))?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            RedisClientError::ConnectionError(format!("Failed to connect to Redis: {}", e))
        })?;

        tracing::info!(url = %sanitize_url(&config.url), "Redis client connected");

        Ok(Self {
            manager,
            command_timeout: Duration::from_secs(config.command_timeout_secs),
        })
    }

    async fn with_timeout<T, F>(&self, fut: F) -> Result<T, RedisClientError>
    where
        F: std::future::Future<Output = Result<T, RedisError>>,
    {
        tokio::time::timeout(self.command_timeout, fut)
            .await
            .map_err(|_| RedisClientError::Timeout)?
            .map_err(RedisClientError::from)
    }

    /// Returns true when Redis answers PONG
    pub async fn ping(&self) -> Result<bool, RedisClientError> {
        let mut conn = self.manager.clone();
        let pong: String = self
            .with_timeout(redis::cmd("PING").query_async(&mut conn))
            .await?;

        Ok(pong == "PONG")
    }

    /// `SET key value EX ttl`
    pub async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), RedisClientError> {
        let mut conn = self.manager.clone();
        self.with_timeout(
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(ttl.as_secs().max(1))
                .query_async::<_, ()>(&mut conn),
        )
        .await
    }

    /// `SET key value NX EX ttl`; false when the key already existed
    pub async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, RedisClientError> {
        let mut conn = self.manager.clone();
        let reply: Option<String> = self
            .with_timeout(
                redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("NX")
                    .arg("EX")
                    .arg(ttl.as_secs().max(1))
                    .query_async(&mut conn),
            )
            .await?;

        Ok(reply.is_some())
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, RedisClientError> {
        let mut conn = self.manager.clone();
        self.with_timeout(conn.get(key)).await
    }

    /// `INCR key`, starting the key's `ttl` when the counter is new
    pub async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> Result<u64, RedisClientError> {
        let mut conn = self.manager.clone();
        let count: u64 = self.with_timeout(conn.incr(key, 1u64)).await?;

        if count == 1 {
            self.with_timeout(
                redis::cmd("EXPIRE")
                    .arg(key)
                    .arg(ttl.as_secs().max(1))
                    .query_async::<_, i64>(&mut conn),
            )
            .await?;
        }

        Ok(count)
    }

    /// Deletes `key`, returning whether it existed
    pub async fn delete(&self, key: &str) -> Result<bool, RedisClientError> {
        let mut conn = self.manager.clone();
        let removed: i64 = self.with_timeout(conn.del(key)).await?;

        Ok(removed > 0)
    }
}

/// Masks credentials for logging
pub fn sanitize_url(url: &str) -> String {
    if let (Some(at_pos), Some(scheme_end)) = (url.find('@'), url.find("://")) {
        return format!("{}***:***@{}", &url[..scheme_end + 3], &url[at_pos + 1..]);
    }
    url.to_string()
}

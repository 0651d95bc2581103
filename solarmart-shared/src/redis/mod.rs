/// Redis integration
///
/// Redis is optional for SolarMart. When `REDIS_URL` is set, short-lived
/// state (OTP codes and their resend cooldowns) lives there so every API
/// instance sees the same codes; otherwise an in-process store is used.
///
/// # Example
///
/// ```no_run
/// use solarmart_shared::redis::{RedisClient, RedisConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// if let Some(config) = RedisConfig::from_env() {
///     let client = RedisClient::new(config).await?;
///     println!("Redis healthy: {}", client.ping().await?);
/// }
/// # Ok(())
/// # }
/// ```

pub mod client;

pub use client::{RedisClient, RedisClientError, RedisConfig};

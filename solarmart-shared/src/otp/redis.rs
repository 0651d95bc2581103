/// Redis-backed OTP store
///
/// Uses `SET ... EX`, `SET ... NX EX`, `INCR`, `GET` and `DEL`, so expiry
/// and check-and-set are enforced by Redis itself.

use async_trait::async_trait;
use std::time::Duration;

use super::{OtpError, OtpStore};
use crate::redis::RedisClient;

#[derive(Clone)]
pub struct RedisOtpStore {
    client: RedisClient,
}

impl RedisOtpStore {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OtpStore for RedisOtpStore {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), OtpError> {
        Ok(self.client.set_with_ttl(key, value, ttl).await?)
    }

    async fn put_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, OtpError> {
        Ok(self.client.set_if_absent(key, value, ttl).await?)
    }

    async fn increment(&self, key: &str, ttl: Duration) -> Result<u64, OtpError> {
        Ok(self.client.incr_with_ttl(key, ttl).await?)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, OtpError> {
        Ok(self.client.get(key).await?)
    }

    async fn remove(&self, key: &str) -> Result<(), OtpError> {
        self.client.delete(key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redis::RedisConfig;

    #[tokio::test]
    #[ignore] // Requires running Redis instance
    async fn test_redis_store_roundtrip() {
        let client = RedisClient::new(RedisConfig {
            url: "redis://localhost:6379".to_string(),
            command_timeout_secs: 5,
        })
        .await
        .unwrap();
        let store = RedisOtpStore::new(client);

        store.put("otp:test-phone", "digest", Duration::from_secs(30)).await.unwrap();
        assert_eq!(store.get("otp:test-phone").await.unwrap().as_deref(), Some("digest"));

        store.remove("otp:test-phone").await.unwrap();
        assert_eq!(store.get("otp:test-phone").await.unwrap(), None);

        assert!(store.put_if_absent("otp:cooldown:test-phone", "1", Duration::from_secs(30)).await.unwrap());
        assert!(!store.put_if_absent("otp:cooldown:test-phone", "2", Duration::from_secs(30)).await.unwrap());
        store.remove("otp:cooldown:test-phone").await.unwrap();
    }
}

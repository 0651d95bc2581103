/// One-time passwords for phone verification
///
/// Codes are six random digits. Only their SHA-256 digest is stored, under
/// `otp:{phone}`, with a short TTL. A second key, `otp:cooldown:{phone}`,
/// blocks resends for a while and records when the block ends; it is taken
/// with a set-if-absent so concurrent sends cannot both pass. Wrong guesses
/// are counted under `otp:attempts:{phone}` and the code is dropped after
/// [`MAX_FAILED_ATTEMPTS`].
///
/// Storage is abstracted behind [`OtpStore`] so the API can run with Redis
/// ([`redis::RedisOtpStore`]) or without it ([`memory::InMemoryOtpStore`]).
///
/// # Example
///
/// ```
/// use solarmart_shared::otp::{memory::InMemoryOtpStore, OtpManager};
/// use std::{sync::Arc, time::Duration};
///
/// # async fn example() -> Result<(), solarmart_shared::otp::OtpError> {
/// let otp = OtpManager::new(
///     Arc::new(InMemoryOtpStore::new()),
///     Duration::from_secs(300),
///     Duration::from_secs(60),
/// );
///
/// let code = otp.issue("+923001234567").await?;
/// assert!(otp.verify("+923001234567", &code).await?);
/// // Codes are single-use
/// assert!(!otp.verify("+923001234567", &code).await?);
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Number of digits in a code
pub const OTP_LENGTH: usize = 6;

/// Wrong guesses allowed before a code is discarded
pub const MAX_FAILED_ATTEMPTS: u64 = 5;

#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    /// A code was sent recently; try again after `retry_after`
    #[error("OTP already sent, retry in {} seconds", retry_after.as_secs())]
    Cooldown { retry_after: Duration },

    #[error("OTP store error: {0}")]
    Store(String),
}

impl From<crate::redis::RedisClientError> for OtpError {
    fn from(err: crate::redis::RedisClientError) -> Self {
        OtpError::Store(err.to_string())
    }
}

/// Key-value storage with per-key expiry
#[async_trait]
pub trait OtpStore: Send + Sync {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), OtpError>;

    /// Stores the value only if the key is absent or expired; false otherwise
    async fn put_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, OtpError>;

    /// Increments a counter, starting it at 1 with `ttl` when absent
    async fn increment(&self, key: &str, ttl: Duration) -> Result<u64, OtpError>;

    /// Returns the value unless it is missing or expired
    async fn get(&self, key: &str) -> Result<Option<String>, OtpError>;

    async fn remove(&self, key: &str) -> Result<(), OtpError>;
}

pub fn otp_key(phone: &str) -> String {
    format!("otp:{}", phone)
}

pub fn cooldown_key(phone: &str) -> String {
    format!("otp:cooldown:{}", phone)
}

pub fn attempts_key(phone: &str) -> String {
    format!("otp:attempts:{}", phone)
}

/// Generates a zero-padded six-digit code
pub fn generate_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:0width$}", n, width = OTP_LENGTH)
}

/// Hex SHA-256 of a code
pub fn hash_code(code: &str) -> String {
    hex::encode(Sha256::digest(code.trim().as_bytes()))
}

/// Issues, verifies and discards codes on top of an [`OtpStore`]
#[derive(Clone)]
pub struct OtpManager {
    store: Arc<dyn OtpStore>,
    ttl: Duration,
    cooldown: Duration,
}

impl OtpManager {
    pub fn new(store: Arc<dyn OtpStore>, ttl: Duration, cooldown: Duration) -> Self {
        Self { store, ttl, cooldown }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Generates and stores a new code for `phone`, returning the plain code
    ///
    /// # Errors
    ///
    /// `OtpError::Cooldown` if a code was issued within the cooldown window.
    pub async fn issue(&self, phone: &str) -> Result<String, OtpError> {
        if !self.cooldown.is_zero() {
            let now = Utc::now().timestamp();
            let until = now + self.cooldown.as_secs() as i64;

            let acquired = self
                .store
                .put_if_absent(&cooldown_key(phone), &until.to_string(), self.cooldown)
                .await?;

            if !acquired {
                let until = self
                    .store
                    .get(&cooldown_key(phone))
                    .await?
                    .and_then(|v| v.parse::<i64>().ok())
                    .unwrap_or(now);

                return Err(OtpError::Cooldown {
                    retry_after: Duration::from_secs((until - now).max(1) as u64),
                });
            }
        }

        let code = generate_code();
        self.store.remove(&attempts_key(phone)).await?;
        self.store.put(&otp_key(phone), &hash_code(&code), self.ttl).await?;

        Ok(code)
    }

    /// Removes the code, its counters and the cooldown, used when delivery failed
    pub async fn discard(&self, phone: &str) -> Result<(), OtpError> {
        self.store.remove(&otp_key(phone)).await?;
        self.store.remove(&attempts_key(phone)).await?;
        self.store.remove(&cooldown_key(phone)).await
    }

    /// Checks `code` and consumes it on success
    ///
    /// Each wrong guess is counted; the code is discarded once
    /// [`MAX_FAILED_ATTEMPTS`] is reached.
    pub async fn verify(&self, phone: &str, code: &str) -> Result<bool, OtpError> {
        let key = otp_key(phone);

        let Some(stored) = self.store.get(&key).await? else {
            return Ok(false);
        };

        if stored == hash_code(code) {
            self.store.remove(&key).await?;
            self.store.remove(&attempts_key(phone)).await?;
            return Ok(true);
        }

        let failures = self.store.increment(&attempts_key(phone), self.ttl).await?;
        if failures >= MAX_FAILED_ATTEMPTS {
            warn!(failures, "Too many wrong OTP guesses, code discarded");
            self.store.remove(&key).await?;
            self.store.remove(&attempts_key(phone)).await?;
        }

        Ok(false)
    }
}

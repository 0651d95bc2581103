/// In-process OTP store
///
/// Used when Redis is not configured and in tests. Reads ignore expired
/// entries, and every write sweeps them out so keys for numbers that are
/// never seen again do not accumulate.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

use super::{OtpError, OtpStore};

type Entries = HashMap<String, (String, Instant)>;

#[derive(Debug, Default)]
pub struct InMemoryOtpStore {
    entries: Mutex<Entries>,
}

impl InMemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Entries>, OtpError> {
        self.entries
            .lock()
            .map_err(|_| OtpError::Store("in-memory store lock poisoned".to_string()))
    }

    /// Locks the map with every expired entry removed
    fn live(&self) -> Result<MutexGuard<'_, Entries>, OtpError> {
        let mut entries = self.lock()?;
        let now = Instant::now();
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        Ok(entries)
    }

    /// Number of unexpired entries
    pub fn len(&self) -> usize {
        self.live().map(|entries| entries.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl OtpStore for InMemoryOtpStore {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), OtpError> {
        let expires_at = Instant::now() + ttl;
        self.live()?
            .insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    async fn put_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, OtpError> {
        let mut entries = self.live()?;

        if entries.contains_key(key) {
            return Ok(false);
        }

        entries.insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(true)
    }

    async fn increment(&self, key: &str, ttl: Duration) -> Result<u64, OtpError> {
        let mut entries = self.live()?;

        let (value, _) = entries
            .entry(key.to_string())
            .or_insert_with(|| ("0".to_string(), Instant::now() + ttl));

        let count = value.parse::<u64>().unwrap_or(0) + 1;
        *value = count.to_string();
        Ok(count)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, OtpError> {
        let mut entries = self.lock()?;

        match entries.get(key) {
            Some((_, expires_at)) if *expires_at <= Instant::now() => {
                entries.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn remove(&self, key: &str) -> Result<(), OtpError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

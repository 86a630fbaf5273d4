//! Fixed-window rate limiting keyed by client IP.
//!
//! A window opens on the first request from a key and lasts `policy.window`.
//! A client may send up to `2 * max_requests` requests across a window
//! boundary; that burst is accepted.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use std::sync::Arc;

/// Limits applied per client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: u64,
    pub window: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60 * 60),
        }
    }
}

/// Counter state for one key after a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRecord {
    pub count: u64,
    pub window_start: DateTime<Utc>,
}

/// Result of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Under the limit, includes current count.
    Allowed(u64),
    /// Over the limit. `retry_after` is the time left in the current window.
    Throttled { count: u64, retry_after: Duration },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed(_))
    }
}

/// Storage for per-key counters.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Count one request against `key`, opening a new window if the current
    /// one has expired. The read-modify-write is atomic per key.
    async fn hit(&self, key: &str, window: Duration, now: DateTime<Utc>)
    -> Result<RateLimitRecord>;

    /// Health check - verify the store is reachable.
    async fn ping(&self) -> Result<()>;
}

/// In-process store for single instance deployments.
#[derive(Default)]
pub struct MemoryRateLimitStore {
    records: DashMap<String, RateLimitRecord>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop windows that have ended. Counters are recreated on the next hit.
    pub fn evict_expired(&self, window: Duration, now: DateTime<Utc>) -> Result<usize> {
        let window = TimeDelta::from_std(window)?;
        let before = self.records.len();
        self.records
            .retain(|_, record| now - record.window_start < window);
        Ok(before - self.records.len())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn hit(
        &self,
        key: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<RateLimitRecord> {
        let window = TimeDelta::from_std(window)?;

        // The entry guard holds the shard lock until it is dropped.
        let mut record = self
            .records
            .entry(key.to_owned())
            .or_insert(RateLimitRecord {
                count: 0,
                window_start: now,
            });

        if now - record.window_start >= window {
            *record = RateLimitRecord {
                count: 0,
                window_start: now,
            };
        }
        record.count += 1;

        Ok(*record)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Redis implementation of RateLimitStore, shared across instances.
#[derive(Clone)]
pub struct RedisRateLimitStore {
    client: redis::Client,
}

impl RedisRateLimitStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RateLimitStore for RedisRateLimitStore {
    async fn hit(
        &self,
        key: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<RateLimitRecord> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let window_ms = u64::try_from(window.as_millis())?;

        // SET NX opens the window with its expiry in the same transaction as
        // the INCR, so a key can never be left without a TTL.
        let (count, ttl_ms): (u64, i64) = redis::pipe()
            .atomic()
            .cmd("SET")
            .arg(key)
            .arg(0)
            .arg("PX")
            .arg(window_ms)
            .arg("NX")
            .ignore()
            .cmd("INCR")
            .arg(key)
            .cmd("PTTL")
            .arg(key)
            .query_async(&mut conn)
            .await?;

        let elapsed = TimeDelta::from_std(window)? - TimeDelta::milliseconds(ttl_ms.max(0));

        Ok(RateLimitRecord {
            count,
            window_start: now - elapsed,
        })
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

/// Applies a [`RateLimitPolicy`] on top of a [`RateLimitStore`].
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    policy: RateLimitPolicy,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, policy: RateLimitPolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &Arc<dyn RateLimitStore> {
        &self.store
    }

    /// Count a request from `client_ip` and decide whether it may proceed.
    pub async fn allow(&self, client_ip: &str, now: DateTime<Utc>) -> Result<RateLimitResult> {
        let key = format!("ratelimit:ip:{client_ip}");
        let record = self.store.hit(&key, self.policy.window, now).await?;

        if record.count > self.policy.max_requests {
            let elapsed = (now - record.window_start).to_std().unwrap_or_default();
            return Ok(RateLimitResult::Throttled {
                count: record.count,
                retry_after: self.policy.window.saturating_sub(elapsed),
            });
        }

        Ok(RateLimitResult::Allowed(record.count))
    }
}

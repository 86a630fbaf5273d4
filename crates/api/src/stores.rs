//! Ephemeral stores.
//!
//! ## Stores
//!
//! - **rate_limit** - Per-IP request counters (Redis, or in-process when no
//!   Redis URL is configured)
//!
//! ## Redis Key Patterns
//!
//! ```text
//! ratelimit:ip:{client_ip}   → request count in the current window (auto-expires)
//! ```

mod rate_limit;

pub use rate_limit::{
    MemoryRateLimitStore, RateLimitPolicy, RateLimitResult, RateLimitStore,
    RateLimiter, RedisRateLimitStore,
};

#[cfg(test)]
pub use rate_limit::MockRateLimitStore;

/// Collection of all ephemeral stores.
#[derive(Clone)]
pub struct Stores {
    pub rate_limiter: RateLimiter,
}

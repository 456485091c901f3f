//! Per-tool token-bucket rate limiting (spec §4.10, §5). Acquisition is
//! non-blocking: exceeding the limit fails fast with a retryable error.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Mutex;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter as GovernorLimiter};

use crate::config::RuntimeConfig;
use crate::error::RuntimeError;

/// Keyed by tool name. A tool with no registered bucket is unlimited,
/// matching spec §4.10 "Operations on unknown keys are unlimited."
pub struct RateLimiters {
    buckets: Mutex<HashMap<String, DefaultDirectRateLimiter>>,
    default_rate: u32,
    default_burst: u32,
}

impl RateLimiters {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            default_rate: config.rate_limit_rate_per_sec,
            default_burst: config.rate_limit_burst,
        }
    }

    fn make_limiter(rate: u32, burst: u32) -> DefaultDirectRateLimiter {
        let burst = NonZeroU32::new(burst.max(1)).unwrap();
        let quota = if rate == 0 {
            Quota::per_second(burst)
        } else {
            Quota::per_second(NonZeroU32::new(rate.max(1)).unwrap()).allow_burst(burst)
        };
        GovernorLimiter::direct(quota)
    }

    /// Explicitly register a tool with a specific rate/burst, overriding the default.
    pub fn register(&self, tool: &str, rate: u32, burst: u32) {
        self.buckets
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(tool.to_string(), Self::make_limiter(rate, burst));
    }

    /// Acquire one token for `tool`, lazily provisioning a default bucket on
    /// first use (first request on a key starts full, spec §4.10).
    pub fn acquire(&self, tool: &str) -> Result<(), RuntimeError> {
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        let limiter = buckets
            .entry(tool.to_string())
            .or_insert_with(|| Self::make_limiter(self.default_rate, self.default_burst));
        limiter.check().map_err(|_| RuntimeError::RateLimited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_burst_succeed_in_a_burst() {
        let limiters = RateLimiters::new(&RuntimeConfig {
            rate_limit_rate_per_sec: 1,
            rate_limit_burst: 5,
            ..RuntimeConfig::default()
        });
        let mut succeeded = 0;
        for _ in 0..10 {
            if limiters.acquire("active").is_ok() {
                succeeded += 1;
            }
        }
        assert_eq!(succeeded, 5);
    }

    #[test]
    fn unregistered_tool_uses_default() {
        let limiters = RateLimiters::new(&RuntimeConfig::default());
        assert!(limiters.acquire("whatever").is_ok());
    }
}

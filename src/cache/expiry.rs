//! Expiry Module
//!
//! Validity evaluation, ttl clamping, and the clock the store reads time from.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::cache::{DEFAULT_TTL_MS, MAX_TTL_MS, MIN_TTL_MS};

// == Is Valid ==
/// Classifies an entry as valid at `now`.
///
/// Valid iff `expires` is set and `expires - now >= 0`; an entry is still
/// valid at the exact millisecond it expires. `last_modified` does not affect
/// the outcome.
pub fn is_valid(_last_modified: Option<u64>, expires: Option<u64>, now: u64) -> bool {
    match expires {
        Some(expires) => expires >= now,
        None => false,
    }
}

// == Clamp TTL ==
/// Returns the effective ttl in milliseconds for a requested value.
///
/// Missing, non-positive, and out-of-range values fall back to one hour.
pub fn clamp_ttl(requested_ms: Option<i64>) -> u64 {
    match requested_ms {
        Some(ms) if ms > 0 && (MIN_TTL_MS..=MAX_TTL_MS).contains(&(ms as u64)) => ms as u64,
        _ => DEFAULT_TTL_MS,
    }
}

// == Clock ==
/// Source of the current time in Unix milliseconds.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now_ms(&self) -> u64;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        current_timestamp_ms()
    }
}

/// Manually driven clock for deterministic timestamps.
#[derive(Debug, Default)]
pub struct FixedClock {
    now: AtomicU64,
}

impl FixedClock {
    pub fn new(now_ms: u64) -> Self {
        Self {
            now: AtomicU64::new(now_ms),
        }
    }

    pub fn set(&self, now_ms: u64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: u64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_requires_expires() {
        assert!(!is_valid(Some(10), None, 0));
        assert!(!is_valid(None, None, 0));
    }

    #[test]
    fn test_is_valid_boundary_condition() {
        assert!(is_valid(Some(0), Some(100), 99));
        assert!(is_valid(Some(0), Some(100), 100));
        assert!(!is_valid(Some(0), Some(100), 101));
    }

    #[test]
    fn test_clamp_ttl_in_range() {
        assert_eq!(clamp_ttl(Some(2_000)), 2_000);
        assert_eq!(clamp_ttl(Some(MIN_TTL_MS as i64)), MIN_TTL_MS);
        assert_eq!(clamp_ttl(Some(MAX_TTL_MS as i64)), MAX_TTL_MS);
    }

    #[test]
    fn test_clamp_ttl_falls_back_to_default() {
        assert_eq!(clamp_ttl(None), DEFAULT_TTL_MS);
        assert_eq!(clamp_ttl(Some(0)), DEFAULT_TTL_MS);
        assert_eq!(clamp_ttl(Some(-5)), DEFAULT_TTL_MS);
        assert_eq!(clamp_ttl(Some(999)), DEFAULT_TTL_MS);
        assert_eq!(clamp_ttl(Some(MAX_TTL_MS as i64 + 1)), DEFAULT_TTL_MS);
    }

    #[test]
    fn test_fixed_clock() {
        let clock = FixedClock::new(1_000);
        assert_eq!(clock.now_ms(), 1_000);
        clock.advance(250);
        assert_eq!(clock.now_ms(), 1_250);
        clock.set(5);
        assert_eq!(clock.now_ms(), 5);
    }

    #[test]
    fn test_system_clock_moves_forward() {
        let first = SystemClock.now_ms();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(SystemClock.now_ms() > first);
    }
}

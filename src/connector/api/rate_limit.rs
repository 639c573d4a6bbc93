//! Per-source sliding-window admission control.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Trailing window width.
pub const WINDOW: Duration = Duration::from_secs(60);
/// Admissions allowed per source within the window.
pub const MAX_PER_WINDOW: usize = 60;

/// Sliding-window limiter keyed by source address. Consulted once per
/// connection, after accept and before any request byte is read, so an
/// abusive peer costs one syscall and a map lookup.
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Vec<Instant>>>,
    window: Duration,
    cap: usize,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_limits(WINDOW, MAX_PER_WINDOW)
    }

    pub fn with_limits(window: Duration, cap: usize) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            window,
            cap,
        }
    }

    /// Prune expired admissions across all sources (dropping sources whose
    /// window emptied, so the map stays bounded by active peers), then either
    /// reject `source` (at cap, nothing recorded) or record `now` and accept.
    pub fn admit(&self, source: &str, now: Instant) -> bool {
        let mut windows = self.windows.lock().expect("rate limiter lock poisoned");
        windows.retain(|_, timestamps| {
            timestamps.retain(|ts| now.duration_since(*ts) <= self.window);
            !timestamps.is_empty()
        });

        let timestamps = windows.entry(source.to_string()).or_default();
        if timestamps.len() >= self.cap {
            return false;
        }

        timestamps.push(now);
        true
    }

    /// Number of sources currently holding admissions in the window.
    pub fn tracked_sources(&self) -> usize {
        self.windows
            .lock()
            .expect("rate limiter lock poisoned")
            .len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cap_plus_one_is_rejected() {
        let limiter = RateLimiter::with_limits(Duration::from_secs(60), 3);
        let now = Instant::now();

        assert!(limiter.admit("1.2.3.4", now));
        assert!(limiter.admit("1.2.3.4", now));
        assert!(limiter.admit("1.2.3.4", now));
        assert!(!limiter.admit("1.2.3.4", now));
    }

    #[test]
    fn test_sources_are_independent() {
        let limiter = RateLimiter::with_limits(Duration::from_secs(60), 1);
        let now = Instant::now();

        assert!(limiter.admit("1.2.3.4", now));
        assert!(!limiter.admit("1.2.3.4", now));
        assert!(limiter.admit("5.6.7.8", now));
    }

    #[test]
    fn test_idle_window_restores_capacity() {
        let limiter = RateLimiter::with_limits(Duration::from_secs(60), 2);
        let start = Instant::now();

        assert!(limiter.admit("1.2.3.4", start));
        assert!(limiter.admit("1.2.3.4", start));
        assert!(!limiter.admit("1.2.3.4", start));

        let later = start + Duration::from_secs(61);
        assert!(limiter.admit("1.2.3.4", later));
        assert!(limiter.admit("1.2.3.4", later));
    }

    #[test]
    fn test_expired_sources_are_dropped_from_the_map() {
        let limiter = RateLimiter::with_limits(Duration::from_secs(60), 10);
        let start = Instant::now();

        for i in 0..100 {
            assert!(limiter.admit(&format!("10.0.0.{i}"), start));
        }
        assert_eq!(limiter.tracked_sources(), 100);

        // Once every recorded admission expires, only the newly admitted
        // source remains tracked.
        let later = start + Duration::from_secs(61);
        assert!(limiter.admit("fresh", later));
        assert_eq!(limiter.tracked_sources(), 1);
    }

    #[test]
    fn test_rejection_does_not_consume_capacity() {
        let limiter = RateLimiter::with_limits(Duration::from_secs(60), 1);
        let start = Instant::now();

        assert!(limiter.admit("1.2.3.4", start));
        for _ in 0..10 {
            assert!(!limiter.admit("1.2.3.4", start));
        }

        // Only the single accepted admission occupies the window, so one
        // slot frees up as soon as it expires.
        let later = start + Duration::from_secs(61);
        assert!(limiter.admit("1.2.3.4", later));
    }
}

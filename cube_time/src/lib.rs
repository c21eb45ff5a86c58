//! A small time abstraction so that revisions, `lastReloadTimestamp`, and the
//! LAST-by-time aggregator can be driven by a real clock in production and by
//! a controllable clock in tests.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(missing_debug_implementations, clippy::use_self)]

use chrono::Utc;
use parking_lot::Mutex;
use std::{
    fmt::Debug,
    sync::Arc,
    time::Duration,
};

/// A point in time, represented as milliseconds since the Unix epoch.
///
/// Kept as a plain milliseconds count (rather than wrapping
/// [`std::time::SystemTime`]) so it is cheap to compare, order, and store
/// inside a [`crate::Time`]-keyed aggregator accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time(i64);

impl Time {
    /// Construct a [`Time`] from milliseconds since the Unix epoch.
    pub fn from_timestamp_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Milliseconds since the Unix epoch.
    pub fn timestamp_millis(&self) -> i64 {
        self.0
    }

    /// Duration since an earlier `Time`. Returns `Duration::ZERO` if `other`
    /// is not actually earlier.
    pub fn duration_since(&self, other: Self) -> Duration {
        let millis = self.0.saturating_sub(other.0).max(0);
        Duration::from_millis(millis as u64)
    }
}

/// Anything that can hand out the current time.
///
/// Implemented by [`SystemProvider`] for production use and by
/// [`MockProvider`] for deterministic tests.
pub trait TimeProvider: Debug + Send + Sync + 'static {
    /// The current time.
    fn now(&self) -> Time;
}

/// A [`TimeProvider`] backed by the system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProvider;

impl SystemProvider {
    /// Create a new [`SystemProvider`].
    pub fn new() -> Self {
        Self
    }
}

impl TimeProvider for SystemProvider {
    fn now(&self) -> Time {
        Time::from_timestamp_millis(Utc::now().timestamp_millis())
    }
}

/// A [`TimeProvider`] whose clock is set explicitly by the test driving it.
#[derive(Debug)]
pub struct MockProvider {
    now: Mutex<Time>,
}

impl MockProvider {
    /// Create a new [`MockProvider`] initialised to `start`.
    pub fn new(start: Time) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Overwrite the current time.
    pub fn set(&self, time: Time) {
        *self.now.lock() = time;
    }

    /// Advance the current time by `duration`.
    pub fn inc(&self, duration: Duration) {
        let mut now = self.now.lock();
        *now = Time::from_timestamp_millis(now.timestamp_millis() + duration.as_millis() as i64);
    }
}

impl TimeProvider for MockProvider {
    fn now(&self) -> Time {
        *self.now.lock()
    }
}

/// Convenience alias for a shared, dynamically dispatched time provider.
pub type TimeProviderRef = Arc<dyn TimeProvider>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_provider_advances_explicitly() {
        let provider = MockProvider::new(Time::from_timestamp_millis(1_000));
        assert_eq!(provider.now().timestamp_millis(), 1_000);

        provider.inc(Duration::from_millis(500));
        assert_eq!(provider.now().timestamp_millis(), 1_500);

        provider.set(Time::from_timestamp_millis(42));
        assert_eq!(provider.now().timestamp_millis(), 42);
    }

    #[test]
    fn duration_since_never_negative() {
        let earlier = Time::from_timestamp_millis(100);
        let later = Time::from_timestamp_millis(50);
        assert_eq!(later.duration_since(earlier), Duration::ZERO);
    }

    #[test]
    fn system_provider_moves_forward() {
        let provider = SystemProvider::new();
        let first = provider.now();
        let second = provider.now();
        assert!(second >= first);
    }
}

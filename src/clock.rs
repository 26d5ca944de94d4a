//! Time source for the Play validity window and receipt chain checks.
//!
//! Licensing responses and certificates are judged against "now", so every
//! time read goes through [`Clock`]. Production code uses [`SystemClock`].

use chrono::{DateTime, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Get the current UTC time.
    fn now_utc(&self) -> DateTime<Utc>;

    /// Current time as milliseconds since the Unix epoch, the unit Play
    /// licensing timestamps use.
    fn now_millis(&self) -> i64 {
        self.now_utc().timestamp_millis()
    }
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock.
///
/// Time is stored as epoch milliseconds and can be moved through a shared
/// reference, so a test can hand an `Arc<MockClock>` to a validator and
/// keep advancing it afterwards.
#[cfg(any(test, feature = "test-seams"))]
#[derive(Debug)]
pub struct MockClock {
    millis: std::sync::atomic::AtomicI64,
}

#[cfg(any(test, feature = "test-seams"))]
impl MockClock {
    /// Clock frozen at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self::from_millis(now.timestamp_millis())
    }

    /// Clock frozen at `millis` since the Unix epoch.
    pub fn from_millis(millis: i64) -> Self {
        Self {
            millis: std::sync::atomic::AtomicI64::new(millis),
        }
    }

    /// Clock frozen at an RFC 3339 instant.
    ///
    /// # Panics
    /// If `s` is not RFC 3339.
    pub fn from_rfc3339(s: &str) -> Self {
        let now = DateTime::parse_from_rfc3339(s).expect("valid RFC 3339");
        Self::new(now.with_timezone(&Utc))
    }

    /// Move the clock forward (or back, for a negative duration).
    pub fn advance(&self, duration: chrono::Duration) {
        self.millis.fetch_add(
            duration.num_milliseconds(),
            std::sync::atomic::Ordering::SeqCst,
        );
    }

    /// Jump to `millis` since the Unix epoch.
    pub fn set_millis(&self, millis: i64) {
        self.millis.store(millis, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(any(test, feature = "test-seams"))]
impl Clock for MockClock {
    fn now_utc(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.now_millis()).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    fn now_millis(&self) -> i64 {
        self.millis.load(std::sync::atomic::Ordering::SeqCst)
    }
}

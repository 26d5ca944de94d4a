//! Signed response freshness (replay prevention).

use crate::clock::Clock;

/// How long a signed Play licensing response stays acceptable (6 hours).
pub const LICENSE_RESPONSE_VALIDITY_MILLIS: i64 = 6 * 60 * 60 * 1000;

/// Check that a response timestamp is still inside the validity window.
///
/// A response is stale once `timestamp + 6h < now`. A response stamped
/// exactly 6 hours ago is still accepted. Future timestamps are not
/// rejected here; the signature is what binds the timestamp.
pub fn is_fresh<C: Clock + ?Sized>(timestamp_millis: i64, clock: &C) -> bool {
    match timestamp_millis.checked_add(LICENSE_RESPONSE_VALIDITY_MILLIS) {
        Some(expires_at) => expires_at >= clock.now_millis(),
        None => false,
    }
}

/// Age of a response in milliseconds, for diagnostics.
pub fn age_millis<C: Clock + ?Sized>(timestamp_millis: i64, clock: &C) -> i64 {
    clock.now_millis().saturating_sub(timestamp_millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;

    const NOW: i64 = 1_736_942_400_000;

    #[test]
    fn test_fresh_response() {
        let clock = MockClock::from_millis(NOW);
        assert!(is_fresh(NOW - 60_000, &clock));
    }

    #[test]
    fn test_exactly_six_hours_is_fresh() {
        let clock = MockClock::from_millis(NOW);
        assert!(is_fresh(NOW - LICENSE_RESPONSE_VALIDITY_MILLIS, &clock));
    }

    #[test]
    fn test_just_over_six_hours_is_stale() {
        let clock = MockClock::from_millis(NOW);
        assert!(!is_fresh(NOW - LICENSE_RESPONSE_VALIDITY_MILLIS - 1, &clock));
    }

    #[test]
    fn test_zero_timestamp_is_stale() {
        let clock = MockClock::from_millis(NOW);
        assert!(!is_fresh(0, &clock));
    }

    #[test]
    fn test_overflowing_timestamp_is_rejected() {
        let clock = MockClock::from_millis(NOW);
        assert!(!is_fresh(i64::MAX, &clock));
    }

    #[test]
    fn test_age_millis() {
        let clock = MockClock::from_millis(NOW);
        assert_eq!(age_millis(NOW - 1_500, &clock), 1_500);
    }
}

//! Wall-clock time utilities.
//!
//! Snapshot capture times are stamped in microseconds since the Unix epoch;
//! storage backends that only keep millisecond precision narrow them with
//! [`us_to_ms`].

use std::time::{SystemTime, UNIX_EPOCH};

#[inline]
fn since_epoch() -> std::time::Duration {
    // A clock before 1970 is a host misconfiguration; report the epoch.
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default()
}

/// Current time as **microseconds** since Unix epoch.
#[inline]
pub fn now_us() -> u64 {
    since_epoch().as_micros() as u64
}

/// Narrow a microsecond timestamp to signed milliseconds, saturating at
/// `i64::MAX`.
#[inline]
pub fn us_to_ms(us: u64) -> i64 {
    i64::try_from(us / 1_000).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_us_is_monotonic_enough() {
        let a = now_us();
        let b = now_us();
        assert!(b >= a);
        // After 2020-01-01.
        assert!(a > 1_577_836_800_000_000);
    }

    #[test]
    fn us_to_ms_truncates() {
        assert_eq!(us_to_ms(1_672_515_782_136_999), 1_672_515_782_136);
        assert_eq!(us_to_ms(999), 0);
        assert_eq!(us_to_ms(u64::MAX), i64::try_from(u64::MAX / 1_000).unwrap());
    }
}

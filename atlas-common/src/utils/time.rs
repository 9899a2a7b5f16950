use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Seconds since the UNIX epoch, used to stamp proposal headers.
///
/// A clock set before the epoch yields zero instead of failing.
pub fn current_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

/// Milliseconds of a duration, saturating at `u64::MAX`.
pub fn as_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

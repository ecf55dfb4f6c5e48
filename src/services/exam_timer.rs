use time::{Duration, PrimitiveDateTime};

use crate::core::time::seconds_until;

/// Seconds granted by a test. Tests without a duration fall back to
/// `default_seconds`.
pub(crate) fn duration_seconds(duration_minutes: i32, default_seconds: u64) -> i64 {
    if duration_minutes > 0 {
        i64::from(duration_minutes) * 60
    } else {
        i64::try_from(default_seconds).unwrap_or(i64::MAX)
    }
}

pub(crate) fn deadline(
    start: PrimitiveDateTime,
    duration_minutes: i32,
    default_seconds: u64,
) -> PrimitiveDateTime {
    start + Duration::seconds(duration_seconds(duration_minutes, default_seconds))
}

pub(crate) fn remaining_seconds(now: PrimitiveDateTime, expires_at: PrimitiveDateTime) -> i64 {
    seconds_until(now, expires_at)
}

pub(crate) fn is_expired(now: PrimitiveDateTime, expires_at: PrimitiveDateTime) -> bool {
    now >= expires_at
}

/// `HH:MM:SS`; hours are not wrapped at 24.
pub(crate) fn format_clock(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

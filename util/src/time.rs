//! General time utility functions

use chrono::{Duration, Utc};

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: Duration) -> Option<f64> {
    duration.num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Current UTC time as nanoseconds since the unix epoch.
///
/// Saturates to zero for times not representable in an `i64` of nanoseconds.
pub fn unix_timestamp_nanos() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or(0)
}

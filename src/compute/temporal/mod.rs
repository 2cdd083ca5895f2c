//! Temporal computation: truncation helpers and [`Window`].
//!
//! Timestamps are handled as signed nanoseconds relative to the Unix epoch so
//! that truncation is exact integer arithmetic in UTC.

pub mod window;

use crate::error::{DialError, Result};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub use window::Window;

/// Resolution of stored value snapshots.
pub const SNAPSHOT_RESOLUTION: Duration = Duration::from_secs(60);

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// Signed nanoseconds since the Unix epoch.
pub fn to_unix_nanos(ts: SystemTime) -> i128 {
    match ts.duration_since(UNIX_EPOCH) {
        Ok(after) => after.as_nanos() as i128,
        Err(before) => -(before.duration().as_nanos() as i128),
    }
}

pub fn from_unix_nanos(nanos: i128) -> Result<SystemTime> {
    let magnitude = u64::try_from(nanos.unsigned_abs()).map_err(|_| DialError::InvalidTimestamp)?;
    let offset = Duration::from_nanos(magnitude);
    let ts = if nanos >= 0 {
        UNIX_EPOCH.checked_add(offset)
    } else {
        UNIX_EPOCH.checked_sub(offset)
    };
    ts.ok_or(DialError::InvalidTimestamp)
}

/// Whole seconds since the Unix epoch, rounded towards negative infinity.
pub fn to_unix_secs(ts: SystemTime) -> i64 {
    to_unix_nanos(ts).div_euclid(NANOS_PER_SEC) as i64
}

/// Smallest whole second not before `ts`.
pub fn to_unix_secs_ceil(ts: SystemTime) -> i64 {
    let nanos = to_unix_nanos(ts);
    (nanos.div_euclid(NANOS_PER_SEC) + i128::from(nanos.rem_euclid(NANOS_PER_SEC) != 0)) as i64
}

pub fn from_unix_secs(secs: i64) -> Result<SystemTime> {
    from_unix_nanos(secs as i128 * NANOS_PER_SEC)
}

/// Round `ts` down to a multiple of `interval` since the Unix epoch.
pub fn truncate(ts: SystemTime, interval: Duration) -> Result<SystemTime> {
    let step = interval.as_nanos() as i128;
    if step == 0 {
        return Err(DialError::invalid_window("interval must be positive"));
    }
    let nanos = to_unix_nanos(ts);
    from_unix_nanos(nanos.div_euclid(step) * step)
}

/// Round `ts` down to snapshot resolution.
pub fn truncate_to_minute(ts: SystemTime) -> Result<SystemTime> {
    truncate(ts, SNAPSHOT_RESOLUTION)
}

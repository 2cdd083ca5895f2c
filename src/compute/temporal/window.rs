use super::{from_unix_nanos, to_unix_nanos, truncate};
use crate::error::{DialError, Result};
use std::time::{Duration, SystemTime};

/// A half-open window `[start, end)` split into fixed-size slots.
///
/// Both ends are truncated down to multiples of `interval` since the Unix
/// epoch, so slot index arithmetic is exact integer division.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    start: SystemTime,
    end: SystemTime,
    interval: Duration,
    slots: usize,
}

impl Window {
    /// Build an aligned window.
    ///
    /// Fails with `InvalidWindow` for a zero interval or when the aligned end
    /// precedes the aligned start. `start == end` is accepted and yields zero
    /// slots.
    pub fn new(start: SystemTime, end: SystemTime, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(DialError::invalid_window("interval must be positive"));
        }
        let start = truncate(start, interval)?;
        let end = truncate(end, interval)?;
        let span = to_unix_nanos(end) - to_unix_nanos(start);
        if span < 0 {
            return Err(DialError::invalid_window("end is before start"));
        }
        let slots = usize::try_from(span / interval.as_nanos() as i128)
            .map_err(|_| DialError::invalid_window("window has too many slots"))?;

        Ok(Self {
            start,
            end,
            interval,
            slots,
        })
    }

    pub fn start(&self) -> SystemTime {
        self.start
    }

    pub fn end(&self) -> SystemTime {
        self.end
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn slot_count(&self) -> usize {
        self.slots
    }

    pub fn is_empty(&self) -> bool {
        self.slots == 0
    }

    /// Start of slot `index`. Indexes past the last slot are clamped to `end`.
    pub fn slot_start(&self, index: usize) -> SystemTime {
        if index >= self.slots {
            return self.end;
        }
        let offset = to_unix_nanos(self.start) + self.interval.as_nanos() as i128 * index as i128;
        // Every slot start lies between two representable instants.
        from_unix_nanos(offset).unwrap_or(self.end)
    }

    /// Slot containing `ts`, or `None` when `ts` falls outside `[start, end)`.
    pub fn slot_index(&self, ts: SystemTime) -> Option<usize> {
        if ts < self.start || ts >= self.end {
            return None;
        }
        let offset = to_unix_nanos(ts) - to_unix_nanos(self.start);
        usize::try_from(offset / self.interval.as_nanos() as i128).ok()
    }

    /// Slot start times in order.
    pub fn slot_starts(&self) -> impl Iterator<Item = SystemTime> + '_ {
        (0..self.slots).map(move |i| self.slot_start(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    const MINUTE: Duration = Duration::from_secs(60);

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn test_window_aligns_both_ends() {
        let window = Window::new(at(3_630), at(7_290), Duration::from_secs(3_600)).unwrap();
        assert_eq!(window.start(), at(3_600));
        assert_eq!(window.end(), at(7_200));
        assert_eq!(window.slot_count(), 1);
    }

    #[test]
    fn test_slot_arithmetic() {
        let window = Window::new(at(600), at(900), MINUTE).unwrap();
        assert_eq!(window.slot_count(), 5);
        assert_eq!(window.slot_start(0), at(600));
        assert_eq!(window.slot_start(4), at(840));
        assert_eq!(window.slot_start(5), at(900));

        assert_eq!(window.slot_index(at(600)), Some(0));
        assert_eq!(window.slot_index(at(659)), Some(0));
        assert_eq!(window.slot_index(at(660)), Some(1));
        assert_eq!(window.slot_index(at(899)), Some(4));
        assert_eq!(window.slot_index(at(900)), None);
        assert_eq!(window.slot_index(at(599)), None);

        let starts: Vec<_> = window.slot_starts().collect();
        assert_eq!(starts.len(), 5);
        assert_eq!(starts[1], at(660));
    }

    #[test]
    fn test_empty_window() {
        let window = Window::new(at(600), at(630), MINUTE).unwrap();
        assert!(window.is_empty());
        assert_eq!(window.slot_starts().count(), 0);
    }

    #[test]
    fn test_invalid_windows() {
        assert!(matches!(
            Window::new(at(900), at(600), MINUTE),
            Err(DialError::InvalidWindow(_))
        ));
        assert!(matches!(
            Window::new(at(600), at(900), Duration::ZERO),
            Err(DialError::InvalidWindow(_))
        ));
    }

    #[test]
    fn test_sub_minute_interval_is_allowed() {
        let window = Window::new(at(600), at(660), Duration::from_secs(15)).unwrap();
        assert_eq!(window.slot_count(), 4);
    }
}

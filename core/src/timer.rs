use std::any::Any;
use std::fmt;
use std::time::Duration;

use web_time::Instant;

/// Resolution of the game clock.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Host-side source of periodic ticks.
///
/// The host forwards each tick to [`Grid::tick`](crate::Grid::tick). Dropping the
/// returned [`TimerLease`] must stop tick delivery.
pub trait TimerDriver {
    fn start(&mut self, period: Duration) -> TimerLease;
}

/// Scoped ownership of a running game clock.
///
/// Holds the host's interval handle (if any) so that dropping the lease cancels it.
pub struct TimerLease {
    started_at: Instant,
    interval: Option<Box<dyn Any>>,
}

impl TimerLease {
    /// Wraps a host interval handle whose `Drop` cancels the interval.
    pub fn new(interval: impl Any) -> Self {
        Self {
            started_at: Instant::now(),
            interval: Some(Box::new(interval)),
        }
    }

    /// Lease without a host interval, ticks are delivered by hand.
    pub fn detached() -> Self {
        Self {
            started_at: Instant::now(),
            interval: None,
        }
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Whole seconds between the start of the lease and `now`.
    pub fn elapsed_secs_at(&self, now: Instant) -> u32 {
        now.saturating_duration_since(self.started_at)
            .as_secs()
            .try_into()
            .unwrap_or(u32::MAX)
    }
}

impl Drop for TimerLease {
    fn drop(&mut self) {
        log::debug!(
            "timer released after {}s",
            self.elapsed_secs_at(Instant::now())
        );
    }
}

impl fmt::Debug for TimerLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerLease")
            .field("started_at", &self.started_at)
            .field("has_interval", &self.interval.is_some())
            .finish()
    }
}

/// Driver for hosts that call [`Grid::tick`](crate::Grid::tick) or
/// [`Grid::poll_timer`](crate::Grid::poll_timer) themselves.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ManualTimer;

impl TimerDriver for ManualTimer {
    fn start(&mut self, _period: Duration) -> TimerLease {
        TimerLease::detached()
    }
}

/// Formats seconds as `HH:MM:SS`, hours are not wrapped.
pub fn format_clock(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let seconds = seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Interval(Rc<Cell<bool>>);

    impl Drop for Interval {
        fn drop(&mut self) {
            self.0.set(true);
        }
    }

    #[test]
    fn dropping_lease_cancels_interval() {
        let cancelled = Rc::new(Cell::new(false));
        let lease = TimerLease::new(Interval(Rc::clone(&cancelled)));

        assert!(!cancelled.get());
        drop(lease);
        assert!(cancelled.get());
    }

    #[test]
    fn elapsed_secs_truncates_and_saturates() {
        let lease = TimerLease::detached();
        let start = lease.started_at();

        assert_eq!(lease.elapsed_secs_at(start + Duration::from_millis(2999)), 2);
        assert_eq!(lease.elapsed_secs_at(start), 0);
    }

    #[test]
    fn clock_format_is_zero_padded() {
        assert_eq!(format_clock(0), "00:00:00");
        assert_eq!(format_clock(61), "00:01:01");
        assert_eq!(format_clock(3600 + 23 * 60 + 9), "01:23:09");
        assert_eq!(format_clock(100 * 3600), "100:00:00");
    }
}

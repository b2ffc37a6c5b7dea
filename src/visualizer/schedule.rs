use std::time::{Duration, Instant};

/// A cancellable fixed-rate task driven by an external monotonic clock.
///
/// Missed periods are skipped rather than replayed, so a stalled event loop
/// produces one catch-up frame, not a burst.
#[derive(Debug, Clone)]
pub struct PeriodicTask {
    interval: Duration,
    next_due: Option<Instant>,
}

impl PeriodicTask {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            next_due: None,
        }
    }

    /// Start the task; the first run is due immediately. No-op if running.
    pub fn start(&mut self, now: Instant) {
        if self.next_due.is_none() {
            self.next_due = Some(now);
        }
    }

    pub fn stop(&mut self) {
        self.next_due = None;
    }

    /// True if a run is due at `now`; schedules the next one.
    pub fn poll(&mut self, now: Instant) -> bool {
        let Some(due) = self.next_due else {
            return false;
        };
        if now < due {
            return false;
        }
        let mut next = due + self.interval;
        if next <= now {
            next = now + self.interval;
        }
        self.next_due = Some(next);
        true
    }

    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        self.next_due.map(|due| due.saturating_duration_since(now))
    }
}

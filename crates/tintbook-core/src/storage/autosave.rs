//! Debounced autosave timing.
//!
//! The timer restarts on every change and comes due once no further change
//! has arrived for the configured delay. It is polled by the host loop, so a
//! restart implicitly cancels the previous deadline.

use std::time::{Duration, Instant};

/// Default delay between the last change and an autosave, in milliseconds.
pub const DEFAULT_AUTOSAVE_DELAY_MS: u64 = 1000;

/// Debounce timer for autosave.
#[derive(Debug, Clone)]
pub struct AutosaveTimer {
    /// Quiet period after the last change.
    delay: Duration,
    /// When the pending autosave fires, if one is scheduled.
    deadline: Option<Instant>,
}

impl Default for AutosaveTimer {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_AUTOSAVE_DELAY_MS))
    }
}

impl AutosaveTimer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, deadline: None }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Restart the timer after a change at `now`.
    pub fn touch(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Drop any scheduled autosave.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_scheduled(&self) -> bool {
        self.deadline.is_some()
    }

    /// Whether the scheduled autosave is due at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Consume the deadline if it is due. Returns true exactly once per schedule.
    pub fn fire(&mut self, now: Instant) -> bool {
        if self.is_due(now) {
            self.deadline = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_idle_timer_never_fires() {
        let mut timer = AutosaveTimer::default();
        assert!(!timer.is_scheduled());
        assert!(!timer.fire(Instant::now() + ms(10_000)));
    }

    #[test]
    fn test_fires_after_quiet_period() {
        let start = Instant::now();
        let mut timer = AutosaveTimer::new(ms(1000));
        timer.touch(start);

        assert!(!timer.fire(start + ms(999)));
        assert!(timer.fire(start + ms(1000)));
        assert!(!timer.fire(start + ms(1500)));
    }

    #[test]
    fn test_touch_restarts_timer() {
        let start = Instant::now();
        let mut timer = AutosaveTimer::new(ms(1000));
        timer.touch(start);
        timer.touch(start + ms(800));

        assert!(!timer.is_due(start + ms(1200)));
        assert!(timer.is_due(start + ms(1800)));
    }

    #[test]
    fn test_cancel() {
        let start = Instant::now();
        let mut timer = AutosaveTimer::default();
        timer.touch(start);
        timer.cancel();
        assert!(!timer.is_due(start + ms(5000)));
    }
}

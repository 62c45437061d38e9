//! Quiet-window debouncer with an injected clock.

use std::time::{Duration, Instant};

/// Fires once `window` has passed without a new [`Debouncer::touch`].
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    /// Debouncer with the given quiet window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// Quiet window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Records activity at `now`, restarting the window.
    pub fn touch(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    /// When the pending call fires, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// True while a call is pending.
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// True (and disarmed) when the window has elapsed at `now`.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Disarms; returns whether a call was pending.
    pub fn take(&mut self) -> bool {
        self.deadline.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touches_inside_window_coalesce() {
        let start = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(200));
        d.touch(start);
        d.touch(start + Duration::from_millis(150));
        assert!(!d.poll(start + Duration::from_millis(250)));
        assert!(d.poll(start + Duration::from_millis(350)));
        assert!(!d.is_pending());
        assert!(!d.poll(start + Duration::from_millis(900)));
    }

    #[test]
    fn take_forces_and_disarms() {
        let mut d = Debouncer::new(Duration::from_millis(200));
        assert!(!d.take());
        d.touch(Instant::now());
        assert!(d.take());
        assert_eq!(d.deadline(), None);
    }
}

use std::time::{Duration, Instant};

/// A single cancelable deadline. Re-arming replaces the previous one, which
/// is what gives the store its debounce (not throttle) behaviour.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    due: Option<Instant>,
}

impl Deadline {
    pub fn arm(&mut self, now: Instant, delay: Duration) {
        self.due = Some(now + delay);
    }

    /// Returns whether a pending deadline was dropped.
    pub fn cancel(&mut self) -> bool {
        self.due.take().is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.due.is_some()
    }

    pub fn due(&self) -> Option<Instant> {
        self.due
    }

    /// Fires at most once per arm: true when `now` has reached the deadline,
    /// after which the deadline is disarmed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.due {
            Some(due) if now >= due => {
                self.due = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_after_delay() {
        let start = Instant::now();
        let mut deadline = Deadline::default();
        deadline.arm(start, Duration::from_millis(300));

        assert!(!deadline.fire(start + Duration::from_millis(299)));
        assert!(deadline.fire(start + Duration::from_millis(300)));
        assert!(!deadline.fire(start + Duration::from_millis(900)));
        assert!(!deadline.is_armed());
    }

    #[test]
    fn rearming_pushes_the_deadline_back() {
        let start = Instant::now();
        let mut deadline = Deadline::default();
        deadline.arm(start, Duration::from_millis(300));
        deadline.arm(start + Duration::from_millis(200), Duration::from_millis(300));

        assert!(!deadline.fire(start + Duration::from_millis(300)));
        assert_eq!(deadline.due(), Some(start + Duration::from_millis(500)));
        assert!(deadline.fire(start + Duration::from_millis(500)));
    }

    #[test]
    fn cancel_disarms() {
        let start = Instant::now();
        let mut deadline = Deadline::default();
        assert!(!deadline.cancel());
        deadline.arm(start, Duration::from_millis(10));
        assert!(deadline.cancel());
        assert!(!deadline.fire(start + Duration::from_secs(1)));
    }
}

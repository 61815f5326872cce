use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Bounds a scenario by a shared task-invocation budget and/or a deadline.
#[derive(Debug)]
pub struct IterationGate {
    counter: AtomicU64,
    iterations: Option<u64>,
    duration: Option<Duration>,
    deadline: OnceLock<Instant>,
}

impl IterationGate {
    pub fn new(iterations: Option<u64>, duration: Option<Duration>) -> Self {
        Self {
            counter: AtomicU64::new(0),
            iterations,
            duration,
            deadline: OnceLock::new(),
        }
    }

    pub fn start_at(&self, started: Instant) {
        if let Some(duration) = self.duration {
            let _ = self.deadline.set(started + duration);
        }
    }

    /// Claims the next invocation. `false` once the budget or the deadline is exhausted.
    pub fn next(&self) -> bool {
        if self.duration.is_some() {
            let now = Instant::now();
            let deadline = *self.deadline.get_or_init(|| now + self.duration.unwrap_or_default());
            if now >= deadline {
                return false;
            }
        }

        match self.iterations {
            Some(total) => self.counter.fetch_add(1, Ordering::Relaxed) < total,
            // Neither iterations nor duration => run once.
            None if self.duration.is_none() => self.counter.fetch_add(1, Ordering::Relaxed) == 0,
            None => true,
        }
    }

    /// Time left before the deadline, or `None` without one.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .get()
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn claimed(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iterations_budget_is_shared() {
        let gate = IterationGate::new(Some(3), None);
        assert!(gate.next());
        assert!(gate.next());
        assert!(gate.next());
        assert!(!gate.next());
        assert!(!gate.next());
        assert_eq!(gate.remaining(), None);
    }

    #[test]
    fn no_bounds_runs_once() {
        let gate = IterationGate::new(None, None);
        assert!(gate.next());
        assert!(!gate.next());
    }

    #[test]
    fn deadline_stops_gate() {
        let gate = IterationGate::new(None, Some(Duration::from_millis(20)));
        gate.start_at(Instant::now());
        assert!(gate.next());
        assert!(gate.remaining().is_some_and(|r| r <= Duration::from_millis(20)));

        std::thread::sleep(Duration::from_millis(30));
        assert!(!gate.next());
        assert_eq!(gate.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn past_start_expires_immediately() {
        let gate = IterationGate::new(Some(100), Some(Duration::from_millis(5)));
        gate.start_at(Instant::now() - Duration::from_millis(10));
        assert!(!gate.next());
    }
}

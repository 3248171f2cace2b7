use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Purpose of a pending timer. At most one deadline exists per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimerKind {
    /// Next clock sample
    Poll,
    /// End of the post-seek guard window
    SeekSettle,
    /// Decide whether a pause during a loop was the user's
    PauseConfirm,
    /// End of the user-scroll quiet period
    ScrollCooldown,
}

/// Deadlines owned by the session thread.
///
/// Arming a kind that is already armed replaces its deadline.
#[derive(Debug, Default)]
pub struct TimerSet {
    deadlines: BTreeMap<TimerKind, Instant>,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, kind: TimerKind, now: Instant, after: Duration) {
        self.deadlines.insert(kind, now + after);
    }

    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        self.deadlines.remove(&kind).is_some()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    /// Remove and return every timer due at `now`, earliest first
    pub fn take_due(&mut self, now: Instant) -> Vec<TimerKind> {
        let mut due: Vec<(Instant, TimerKind)> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(kind, deadline)| (*deadline, *kind))
            .collect();
        due.sort();
        for (_, kind) in &due {
            self.deadlines.remove(kind);
        }
        due.into_iter().map(|(_, kind)| kind).collect()
    }
}

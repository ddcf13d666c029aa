//! Virtual-clock timer queue
//!
//! Every deferred action in the engine (passive income, building production,
//! upgrade completion) is a [`Timer`] in one queue. Timers fire in ascending
//! `fire_at_ms`; ties fire in the order they were armed.

use crate::core::types::Millis;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// What happens when a timer fires
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    /// Recurring: one tick of a player's passive income
    BasicIncome { player: String },
    /// Recurring: one tick of a building's production
    Production { player: String, building: String },
    /// One-shot: an upgrade cycle finishes
    UpgradeComplete { player: String, building: String },
}

impl TimerEvent {
    pub fn player(&self) -> &str {
        match self {
            TimerEvent::BasicIncome { player }
            | TimerEvent::Production { player, .. }
            | TimerEvent::UpgradeComplete { player, .. } => player,
        }
    }

    pub fn is_recurring(&self) -> bool {
        !matches!(self, TimerEvent::UpgradeComplete { .. })
    }
}

/// An armed timer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timer {
    pub fire_at_ms: Millis,
    /// Arming order, breaks ties between equal fire times
    pub seq: u64,
    pub event: TimerEvent,
}

impl Ord for Timer {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fire_at_ms
            .cmp(&other.fire_at_ms)
            .then(self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for Timer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Default)]
pub struct Scheduler {
    now_ms: Millis,
    next_seq: u64,
    queue: BinaryHeap<Reverse<Timer>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current clock time
    pub fn now_ms(&self) -> Millis {
        self.now_ms
    }

    /// Number of armed timers
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Arm a timer at an absolute clock time
    pub fn schedule_at(&mut self, fire_at_ms: Millis, event: TimerEvent) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse(Timer {
            fire_at_ms,
            seq,
            event,
        }));
    }

    /// Arm a timer `delay_ms` after the current clock time
    pub fn schedule_after(&mut self, delay_ms: Millis, event: TimerEvent) {
        self.schedule_at(self.now_ms + delay_ms, event);
    }

    /// Fire time of the earliest armed timer
    pub fn next_fire_at(&self) -> Option<Millis> {
        self.queue.peek().map(|Reverse(t)| t.fire_at_ms)
    }

    /// Pop the earliest timer due at or before `until_ms`, moving the clock
    /// to its fire time.
    pub fn pop_due(&mut self, until_ms: Millis) -> Option<Timer> {
        match self.queue.peek() {
            Some(Reverse(t)) if t.fire_at_ms <= until_ms => {}
            _ => return None,
        }
        let Reverse(timer) = self.queue.pop()?;
        self.now_ms = self.now_ms.max(timer.fire_at_ms);
        Some(timer)
    }

    /// Move the clock to `until_ms` once every due timer has been popped.
    /// The clock never runs backwards.
    pub fn finish_at(&mut self, until_ms: Millis) {
        self.now_ms = self.now_ms.max(until_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn income(player: &str) -> TimerEvent {
        TimerEvent::BasicIncome {
            player: player.into(),
        }
    }

    #[test]
    fn test_pops_in_fire_time_order() {
        let mut s = Scheduler::new();
        s.schedule_at(300, income("c"));
        s.schedule_at(100, income("a"));
        s.schedule_at(200, income("b"));

        let order: Vec<_> = std::iter::from_fn(|| s.pop_due(1000))
            .map(|t| t.event.player().to_string())
            .collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_ties_fire_in_arming_order() {
        let mut s = Scheduler::new();
        s.schedule_at(100, income("first"));
        s.schedule_at(100, income("second"));
        s.schedule_at(100, income("third"));

        assert_eq!(s.pop_due(100).unwrap().event.player(), "first");
        assert_eq!(s.pop_due(100).unwrap().event.player(), "second");
        assert_eq!(s.pop_due(100).unwrap().event.player(), "third");
    }

    #[test]
    fn test_pop_due_respects_limit_and_advances_clock() {
        let mut s = Scheduler::new();
        s.schedule_after(500, income("a"));
        assert!(s.pop_due(499).is_none());
        assert_eq!(s.now_ms(), 0);

        let t = s.pop_due(1000).unwrap();
        assert_eq!(t.fire_at_ms, 500);
        assert_eq!(s.now_ms(), 500);

        s.finish_at(1000);
        assert_eq!(s.now_ms(), 1000);
        s.finish_at(10);
        assert_eq!(s.now_ms(), 1000);
    }

    #[test]
    fn test_schedule_after_is_relative_to_clock() {
        let mut s = Scheduler::new();
        s.finish_at(2000);
        s.schedule_after(250, income("a"));
        assert_eq!(s.next_fire_at(), Some(2250));
        assert_eq!(s.pending(), 1);
    }

    #[test]
    fn test_recurring_events() {
        assert!(income("a").is_recurring());
        assert!(!TimerEvent::UpgradeComplete {
            player: "a".into(),
            building: "b".into(),
        }
        .is_recurring());
    }
}

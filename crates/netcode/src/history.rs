use std::collections::VecDeque;

use bhop_common::Tick;
use bhop_kernel::MovementState;
use glam::Vec3;

use crate::message::ReplicateData;

/// What the owner predicted for one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub input: ReplicateData,
    /// External impulse drained on this tick, needed to replay it.
    pub impulse: Vec3,
    /// State at the end of the tick.
    pub state: MovementState,
}

impl HistoryEntry {
    pub fn tick(&self) -> Tick {
        self.input.tick
    }
}

/// Bounded, tick-ordered buffer of predicted ticks.
#[derive(Debug, Clone)]
pub struct PredictionHistory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl PredictionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Append the newest tick, evicting the oldest once full.
    pub fn push(&mut self, entry: HistoryEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn get(&self, tick: Tick) -> Option<&HistoryEntry> {
        self.position(tick).map(|i| &self.entries[i])
    }

    pub fn position(&self, tick: Tick) -> Option<usize> {
        self.entries.iter().position(|e| e.tick() == tick)
    }

    /// Entries from index `from` on, for re-simulation.
    pub fn tail_mut(&mut self, from: usize) -> impl Iterator<Item = &mut HistoryEntry> {
        self.entries.iter_mut().skip(from)
    }

    /// Forget every tick older than `tick`.
    pub fn discard_before(&mut self, tick: Tick) {
        while self
            .entries
            .front()
            .is_some_and(|e| tick.is_newer_than(e.tick()))
        {
            self.entries.pop_front();
        }
    }

    /// The newest `count` inputs, oldest first.
    pub fn recent_inputs(&self, count: usize) -> Vec<ReplicateData> {
        let skip = self.entries.len().saturating_sub(count);
        self.entries.iter().skip(skip).map(|e| e.input).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bhop_input::Command;
    use bhop_tuning::BodyTuning;

    fn entry(tick: u32) -> HistoryEntry {
        let state = MovementState::spawn(Vec3::ZERO, &BodyTuning::default());
        HistoryEntry {
            input: ReplicateData::capture(Tick(tick), &state, &Command::default()),
            impulse: Vec3::ZERO,
            state,
        }
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut h = PredictionHistory::new(3);
        for t in 1..=5 {
            h.push(entry(t));
        }
        assert_eq!(h.len(), 3);
        assert!(h.get(Tick(2)).is_none());
        assert!(h.get(Tick(3)).is_some());
    }

    #[test]
    fn discard_before_keeps_the_tick_itself() {
        let mut h = PredictionHistory::new(8);
        for t in 1..=5 {
            h.push(entry(t));
        }
        h.discard_before(Tick(3));
        assert_eq!(h.len(), 3);
        assert_eq!(h.position(Tick(3)), Some(0));
    }

    #[test]
    fn recent_inputs_are_oldest_first() {
        let mut h = PredictionHistory::new(8);
        for t in 1..=5 {
            h.push(entry(t));
        }
        let ticks: Vec<u32> = h.recent_inputs(3).iter().map(|d| d.tick.0).collect();
        assert_eq!(ticks, vec![3, 4, 5]);
        assert_eq!(h.recent_inputs(10).len(), 5);
    }
}

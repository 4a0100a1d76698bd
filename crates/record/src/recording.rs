use bhop_arena::Arena;
use bhop_input::CommandSource;
use bhop_kernel::MovementState;
use bhop_netcode::{DriverConfig, NetMessage, PredictedMover, ReplicateData, Role};
use bhop_tuning::TuningSet;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A captured session: everything needed to re-run it bit for bit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub tuning: TuningSet,
    pub arena: Arena,
    pub tick_rate: u32,
    pub initial_state: MovementState,
    pub inputs: Vec<ReplicateData>,
    /// `state_hash` of the final state when the recording was made.
    pub final_hash: u64,
}

impl Recording {
    /// Drive an owner for `ticks` ticks from `source` and keep every input.
    pub fn capture(
        tuning: TuningSet,
        arena: Arena,
        spawn: Vec3,
        tick_rate: u32,
        source: &mut dyn CommandSource,
        ticks: usize,
    ) -> Self {
        let config = DriverConfig {
            tick_rate,
            ..DriverConfig::default()
        };
        let mut owner = PredictedMover::new(Role::Owner, spawn, tuning, config);
        let initial_state = owner.state().clone();

        let mut inputs = Vec::with_capacity(ticks);
        for _ in 0..ticks {
            if let Some(NetMessage::Replicate(batch)) = owner.predict(source, &arena) {
                inputs.extend(batch.last().copied());
            }
        }
        let final_hash = owner.state().state_hash();
        debug!(ticks = inputs.len(), final_hash, "recording captured");

        Self {
            tuning,
            arena,
            tick_rate,
            initial_state,
            inputs,
            final_hash,
        }
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Replay every input the way an observer would and return the end state.
    pub fn replay(&self) -> MovementState {
        let config = DriverConfig {
            tick_rate: self.tick_rate,
            ..DriverConfig::default()
        };
        let mut observer =
            PredictedMover::new(Role::Observer, self.initial_state.origin, self.tuning, config);
        *observer.state_mut() = self.initial_state.clone();
        for input in &self.inputs {
            observer.receive(NetMessage::Replicate(vec![*input]), &self.arena);
        }
        observer.state().clone()
    }

    /// Replay and compare against the recorded hash.
    pub fn check(&self) -> ReplayReport {
        let actual = self.replay().state_hash();
        ReplayReport {
            ticks: self.inputs.len(),
            expected: self.final_hash,
            actual,
        }
    }
}

/// Outcome of replaying a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayReport {
    pub ticks: usize,
    pub expected: u64,
    pub actual: u64,
}

impl ReplayReport {
    pub fn is_match(&self) -> bool {
        self.expected == self.actual
    }
}

impl std::fmt::Display for ReplayReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verdict = if self.is_match() { "match" } else { "MISMATCH" };
        write!(
            f,
            "{verdict}: ticks={} expected={:016x} actual={:016x}",
            self.ticks, self.expected, self.actual
        )
    }
}

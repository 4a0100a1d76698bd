use std::mem;

use bhop_common::{EntityId, Tick};
use bhop_input::CommandSource;
use bhop_kernel::{CollisionWorld, MovementState, simulate_tick, update_rotation};
use bhop_tuning::TuningSet;
use glam::Vec3;
use tracing::{debug, info_span, warn};

use crate::history::{HistoryEntry, PredictionHistory};
use crate::message::{NetMessage, ReconcileData, ReplicateData};
use crate::stats::DriverStats;

/// Who drives a networked mover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The owning client: samples input, predicts, sends replicate data.
    Owner,
    /// The server: simulates received input and answers with reconcile data.
    Authority,
    /// A non-owning peer: simulates received input, sends nothing.
    Observer,
}

/// How the owner applies a correction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReconcileMode {
    /// Overwrite the authoritative fields and carry on from there.
    #[default]
    Snap,
    /// Rewind to the corrected tick and re-simulate every buffered input since.
    ReplayForward,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriverConfig {
    pub tick_rate: u32,
    /// Predicted ticks kept for comparison and replay.
    pub history: usize,
    /// Divergence (origin, velocity or height) up to which a reconcile
    /// confirms the prediction and changes nothing.
    pub snap_tolerance: f32,
    pub reconcile: ReconcileMode,
    /// Earlier inputs resent with every replicate, to ride out packet loss.
    pub redundancy: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            history: 128,
            snap_tolerance: 0.01,
            reconcile: ReconcileMode::Snap,
            redundancy: 2,
        }
    }
}

impl DriverConfig {
    pub fn dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }
}

/// External velocity accumulated between ticks (knockback, explosions).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PendingImpulse(Vec3);

impl PendingImpulse {
    pub fn add(&mut self, impulse: Vec3) {
        self.0 += impulse;
    }

    pub fn peek(&self) -> Vec3 {
        self.0
    }

    /// Read and clear.
    pub fn drain(&mut self) -> Vec3 {
        mem::take(&mut self.0)
    }
}

/// Drives one entity's movement state across the network.
///
/// Every role runs the same `simulate_tick`. Owners run it ahead of the
/// authority and keep what they predicted so a later correction can be
/// measured and, in [`ReconcileMode::ReplayForward`], replayed.
#[derive(Debug, Clone)]
pub struct PredictedMover {
    id: EntityId,
    role: Role,
    config: DriverConfig,
    tuning: TuningSet,
    state: MovementState,
    last_simulated: Tick,
    last_reconciled: Tick,
    history: PredictionHistory,
    impulse: PendingImpulse,
    stats: DriverStats,
}

impl PredictedMover {
    pub fn new(role: Role, spawn: Vec3, tuning: TuningSet, config: DriverConfig) -> Self {
        Self {
            id: EntityId::new(),
            role,
            config,
            tuning,
            state: MovementState::spawn(spawn, &tuning.body),
            last_simulated: Tick::ZERO,
            last_reconciled: Tick::ZERO,
            history: PredictionHistory::new(config.history),
            impulse: PendingImpulse::default(),
            stats: DriverStats::default(),
        }
    }

    /// Give the mover a known identity so both ends log the same entity.
    pub fn with_id(mut self, id: EntityId) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn tuning(&self) -> &TuningSet {
        &self.tuning
    }

    pub fn state(&self) -> &MovementState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut MovementState {
        &mut self.state
    }

    pub fn stats(&self) -> &DriverStats {
        &self.stats
    }

    pub fn last_simulated(&self) -> Tick {
        self.last_simulated
    }

    pub fn last_reconciled(&self) -> Tick {
        self.last_reconciled
    }

    pub fn history(&self) -> &PredictionHistory {
        &self.history
    }

    pub fn impulse_mut(&mut self) -> &mut PendingImpulse {
        &mut self.impulse
    }

    /// Owner only: sample one command, simulate it locally and return the
    /// replicate message for the authority.
    pub fn predict(
        &mut self,
        source: &mut dyn CommandSource,
        world: &dyn CollisionWorld,
    ) -> Option<NetMessage> {
        if self.role != Role::Owner {
            warn!(role = ?self.role, "predict called on a non-owner mover");
            return None;
        }
        let tick = self.last_simulated.next();
        let _span = info_span!("predict", entity = ?self.id, %tick).entered();

        let command = source.sample_command();
        self.state.cmd = command;
        update_rotation(&mut self.state);
        let input = ReplicateData::capture(tick, &self.state, &command);

        let impulse = self.impulse.drain();
        self.simulate(&input, impulse, world);
        self.history.push(HistoryEntry {
            input,
            impulse,
            state: self.state.clone(),
        });
        self.stats.predicted += 1;

        Some(NetMessage::Replicate(
            self.history.recent_inputs(self.config.redundancy + 1),
        ))
    }

    /// Handle a message from the peer. Returns the reply to send back, if any.
    pub fn receive(&mut self, message: NetMessage, world: &dyn CollisionWorld) -> Option<NetMessage> {
        match (self.role, message) {
            (Role::Authority | Role::Observer, NetMessage::Replicate(inputs)) => {
                self.on_replicate(&inputs, world)
            }
            (Role::Owner, NetMessage::Reconcile(data)) => {
                self.on_reconcile(&data, world);
                None
            }
            (role, message) => {
                debug!(?role, kind = message.kind(), "message not meant for this role");
                None
            }
        }
    }

    fn on_replicate(
        &mut self,
        inputs: &[ReplicateData],
        world: &dyn CollisionWorld,
    ) -> Option<NetMessage> {
        let _span = info_span!("replicate", entity = ?self.id, last = %self.last_simulated).entered();
        let mut simulated = 0;
        for input in inputs {
            // Redundant copies of ticks already simulated are expected.
            if !input.tick.is_newer_than(self.last_simulated) {
                continue;
            }
            let impulse = self.impulse.drain();
            self.simulate(input, impulse, world);
            self.stats.replicated += 1;
            simulated += 1;
        }

        if simulated == 0 {
            self.stats.stale_dropped += 1;
            debug!(
                tick = ?inputs.last().map(|d| d.tick),
                "stale replicate ignored"
            );
            return None;
        }

        match self.role {
            Role::Authority => Some(NetMessage::Reconcile(ReconcileData::capture(
                self.last_simulated,
                &self.state,
            ))),
            _ => None,
        }
    }

    fn on_reconcile(&mut self, data: &ReconcileData, world: &dyn CollisionWorld) {
        if !data.tick.is_newer_than(self.last_reconciled) {
            self.stats.stale_dropped += 1;
            debug!(tick = %data.tick, last = %self.last_reconciled, "stale reconcile ignored");
            return;
        }
        let _span = info_span!("reconcile", entity = ?self.id, tick = %data.tick).entered();
        self.last_reconciled = data.tick;

        // A reconcile that agrees with what was predicted for its tick leaves
        // the current state alone; only a divergence is corrected.
        let diverged = match self.history.get(data.tick) {
            Some(entry) => {
                let divergence = data.divergence(&entry.state);
                let diverged = divergence > self.config.snap_tolerance;
                if diverged {
                    self.stats.snaps += 1;
                    warn!(
                        tick = %data.tick,
                        error = data.origin_error(&entry.state),
                        divergence,
                        "correction snap"
                    );
                }
                diverged
            }
            None => {
                debug!(tick = %data.tick, "no prediction buffered for tick, applying as-is");
                true
            }
        };

        if diverged {
            let replayed = self.config.reconcile == ReconcileMode::ReplayForward
                && self.replay_from(data, world);
            if !replayed {
                data.apply_to(&mut self.state);
            }
        }
        self.history.discard_before(data.tick);
        self.stats.reconciled += 1;
    }

    /// Restore the prediction for `data.tick`, correct it, then re-run every
    /// later buffered input. `false` when that tick is no longer buffered.
    fn replay_from(&mut self, data: &ReconcileData, world: &dyn CollisionWorld) -> bool {
        let Some(start) = self.history.position(data.tick) else {
            debug!(tick = %data.tick, "corrected tick no longer buffered");
            return false;
        };
        let dt = self.config.dt();
        let tuning = self.tuning;

        let mut entries = self.history.tail_mut(start);
        let Some(corrected) = entries.next() else {
            return false;
        };
        data.apply_to(&mut corrected.state);
        let mut state = corrected.state.clone();

        let mut replayed = 0;
        for entry in entries {
            entry.input.adopt_orientation(&mut state);
            simulate_tick(&mut state, &entry.input.command(), entry.impulse, dt, &tuning, world);
            entry.state = state.clone();
            replayed += 1;
        }
        debug!(tick = %data.tick, replayed, "replayed forward");

        self.state = state;
        self.stats.replayed += replayed;
        true
    }

    fn simulate(&mut self, input: &ReplicateData, impulse: Vec3, world: &dyn CollisionWorld) {
        input.adopt_orientation(&mut self.state);
        simulate_tick(
            &mut self.state,
            &input.command(),
            impulse,
            self.config.dt(),
            &self.tuning,
            world,
        );
        self.last_simulated = input.tick;
    }
}

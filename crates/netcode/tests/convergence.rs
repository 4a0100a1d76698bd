use bhop_arena::Arena;
use bhop_common::EntityId;
use bhop_input::{Command, ScriptedInput};
use bhop_netcode::{
    DriverConfig, LinkConfig, LossyLink, NetMessage, PredictedMover, ReconcileMode, Role,
};
use bhop_tuning::TuningSet;
use glam::Vec3;

/// Owner and authority joined by one link each way.
struct Session {
    arena: Arena,
    client: PredictedMover,
    server: PredictedMover,
    up: LossyLink,
    down: LossyLink,
}

impl Session {
    fn new(config: DriverConfig, up: LinkConfig, down: LinkConfig) -> Self {
        let spawn = Vec3::new(0.0, 0.9, 0.0);
        let tuning = TuningSet::default();
        let id = EntityId::new();
        Self {
            arena: Arena::proving_ground(),
            client: PredictedMover::new(Role::Owner, spawn, tuning, config).with_id(id),
            server: PredictedMover::new(Role::Authority, spawn, tuning, config).with_id(id),
            up: LossyLink::new(up),
            down: LossyLink::new(down),
        }
    }

    fn step(&mut self, input: &mut ScriptedInput) {
        if let Some(message) = self.client.predict(input, &self.arena) {
            self.up.send(message.encode().unwrap());
        }
        self.pump();
    }

    fn pump(&mut self) {
        for bytes in self.up.advance() {
            let message = NetMessage::decode(&bytes).unwrap();
            if let Some(reply) = self.server.receive(message, &self.arena) {
                self.down.send(reply.encode().unwrap());
            }
        }
        for bytes in self.down.advance() {
            let message = NetMessage::decode(&bytes).unwrap();
            self.client.receive(message, &self.arena);
        }
    }

    /// Deliver everything still in flight.
    fn settle(&mut self) {
        for _ in 0..64 {
            self.pump();
        }
    }

    fn run(&mut self, mut input: ScriptedInput) {
        while input.remaining() > 0 {
            self.step(&mut input);
        }
        self.settle();
    }
}

fn course() -> ScriptedInput {
    ScriptedInput::new(Vec::new())
        .hold(Command::forward(), 60)
        .hold(Command::forward().with_jump(), 1)
        .hold(Command::forward().with_strafe(1.0).with_look(1.5, 0.0), 60)
        .hold(Command::forward().with_jump().with_look(-2.0, 0.5), 20)
        .hold(Command::default().with_crouch(), 30)
        .hold(Command::forward(), 40)
        .hold(Command::default(), 30)
}

fn with_latency(ticks: u32) -> LinkConfig {
    LinkConfig {
        latency_ticks: ticks,
        ..LinkConfig::default()
    }
}

#[test]
fn lockstep_session_never_corrects() {
    let mut session = Session::new(DriverConfig::default(), LinkConfig::default(), LinkConfig::default());
    session.run(course());

    assert_eq!(session.client.id(), session.server.id());
    let client = session.client.stats();
    assert_eq!(client.snaps, 0);
    assert_eq!(client.reconciled, client.predicted);
    assert_eq!(session.server.stats().replicated, client.predicted);
    assert_eq!(
        session.client.state().state_hash(),
        session.server.state().state_hash()
    );
}

#[test]
fn matching_reconcile_is_a_noop() {
    let mut session = Session::new(DriverConfig::default(), LinkConfig::default(), LinkConfig::default());
    let mut input = ScriptedInput::new(Vec::new()).hold(Command::forward().with_look(3.0, 1.0), 10);
    for _ in 0..10 {
        let message = session.client.predict(&mut input, &session.arena).unwrap();
        let reply = session.server.receive(message, &session.arena).unwrap();
        let before = session.client.state().clone();
        session.client.receive(reply, &session.arena);
        assert_eq!(session.client.state(), &before);
    }
}

#[test]
fn matching_reconciles_under_latency_leave_the_prediction_alone() {
    let mut session = Session::new(DriverConfig::default(), with_latency(3), with_latency(3));
    let mut input = course();
    while input.remaining() > 0 {
        if let Some(message) = session.client.predict(&mut input, &session.arena) {
            session.up.send(message.encode().unwrap());
        }
        let predicted = session.client.state().clone();
        session.pump();
        assert_eq!(session.client.state(), &predicted);
    }
    session.settle();

    let stats = session.client.stats();
    assert!(stats.reconciled > 0);
    assert_eq!(stats.snaps, 0);
    assert_eq!(stats.replayed, 0);
    assert_eq!(
        session.client.state().state_hash(),
        session.server.state().state_hash()
    );
}

fn knocked_session(reconcile: ReconcileMode) -> Session {
    let config = DriverConfig {
        reconcile,
        ..DriverConfig::default()
    };
    let mut session = Session::new(config, with_latency(3), with_latency(3));
    // Only the authority sees the knock, so the owner's prediction is wrong.
    session.server.impulse_mut().add(Vec3::new(3.0, 0.0, 0.0));
    session.run(
        ScriptedInput::new(Vec::new())
            .hold(Command::forward(), 90)
            .hold(Command::default(), 40),
    );
    session
}

#[test]
fn divergence_keeps_snapping_but_replay_settles_it() {
    let snapping = knocked_session(ReconcileMode::Snap);
    let replaying = knocked_session(ReconcileMode::ReplayForward);

    let replay_stats = replaying.client.stats();
    assert!(replay_stats.snaps >= 1);
    assert!(replay_stats.replayed > 0);
    assert!(snapping.client.stats().snaps > replay_stats.snaps);

    assert!(replaying.client.state().origin.x > 0.0);
    assert_eq!(
        replaying.client.state().state_hash(),
        replaying.server.state().state_hash()
    );
}

#[test]
fn lossy_reordering_link_converges_with_replay() {
    let config = DriverConfig {
        reconcile: ReconcileMode::ReplayForward,
        redundancy: 3,
        ..DriverConfig::default()
    };
    let up = LinkConfig {
        latency_ticks: 2,
        jitter_ticks: 2,
        drop_chance: 0.2,
        seed: 11,
    };
    let down = LinkConfig {
        latency_ticks: 2,
        jitter_ticks: 3,
        drop_chance: 0.0,
        seed: 12,
    };
    let mut session = Session::new(config, up, down);
    session.run(course());

    assert!(session.up.dropped() > 0);
    assert!(session.client.stats().stale_dropped > 0);
    assert!(session.server.last_simulated().0 > 200);

    let settled = session.server.last_simulated();
    assert_eq!(session.client.last_reconciled(), settled);
    let entry = session.client.history().get(settled).unwrap();
    assert_eq!(entry.state.origin, session.server.state().origin);
    assert_eq!(entry.state.velocity, session.server.state().velocity);
}

#[test]
fn shared_impulse_keeps_sides_in_sync() {
    let mut session = Session::new(DriverConfig::default(), LinkConfig::default(), LinkConfig::default());
    let mut input = ScriptedInput::new(Vec::new()).hold(Command::forward(), 30);
    for tick in 0..30 {
        if tick == 10 {
            let knock = Vec3::new(4.0, 8.0, 0.0);
            session.client.impulse_mut().add(knock);
            session.server.impulse_mut().add(knock);
        }
        session.step(&mut input);
    }
    assert_eq!(session.client.stats().snaps, 0);
    assert_eq!(session.client.impulse_mut().peek(), Vec3::ZERO);
    assert!(session.client.state().origin.x > 0.0);
}

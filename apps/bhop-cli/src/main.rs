use std::path::{Path, PathBuf};

use anyhow::Context;
use bhop_arena::Arena;
use bhop_common::Tick;
use bhop_input::{CommandSource, InputSampler, RawInput, ScriptedInput};
use bhop_kernel::{MovementState, simulate_tick};
use bhop_netcode::{
    DriverConfig, LinkConfig, LossyLink, NetMessage, PredictedMover, ReconcileMode, Role,
};
use bhop_record::{Recording, RecordingStore};
use bhop_tools::{MovementInspector, RunSummary};
use bhop_tuning::{BodyTuning, TuningSet};
use clap::{Parser, Subcommand, ValueEnum};
use glam::{Vec2, Vec3};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bhop", about = "Headless movement simulator and netcode harness")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Tuning file (.yaml, .yml or .json); defaults are used when absent
    #[arg(long, global = true)]
    tuning: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and the active tuning
    Info,
    /// Run the scripted course through the movement tick
    Simulate {
        /// Number of ticks to simulate
        #[arg(short, long, default_value = "600")]
        ticks: usize,
        #[arg(long, default_value = "60")]
        tick_rate: u32,
        #[arg(long, value_enum, default_value = "proving-ground")]
        arena: ArenaKind,
        /// Print a readout every N ticks (0 disables)
        #[arg(long, default_value = "30")]
        every: u64,
    },
    /// Run an owner and an authority over simulated lossy links
    Netsim {
        #[arg(short, long, default_value = "600")]
        ticks: usize,
        /// One-way latency in ticks
        #[arg(long, default_value = "3")]
        latency: u32,
        /// Extra random delay in ticks (reorders packets)
        #[arg(long, default_value = "0")]
        jitter: u32,
        /// Packet loss probability on the client to server link
        #[arg(long, default_value = "0.0")]
        drop: f32,
        #[arg(long, default_value = "42")]
        seed: u64,
        /// Re-simulate buffered inputs on correction instead of snapping
        #[arg(long)]
        replay: bool,
        /// Earlier inputs resent with every replicate
        #[arg(long, default_value = "2")]
        redundancy: usize,
    },
    /// Capture the scripted course and write it to a store directory
    Record {
        /// Output directory
        out: PathBuf,
        #[arg(short, long, default_value = "600")]
        ticks: usize,
        #[arg(long, default_value = "60")]
        tick_rate: u32,
        #[arg(long, value_enum, default_value = "proving-ground")]
        arena: ArenaKind,
    },
    /// Replay a stored recording and compare its final state hash
    Verify {
        /// Store directory written by `record`
        dir: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ArenaKind {
    Flat,
    ProvingGround,
}

impl ArenaKind {
    fn build(self) -> Arena {
        match self {
            ArenaKind::Flat => Arena::flat(),
            ArenaKind::ProvingGround => Arena::proving_ground(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let tuning = load_tuning(cli.tuning.as_deref())?;

    match cli.command {
        Commands::Info => {
            println!("bhop v{}", env!("CARGO_PKG_VERSION"));
            let m = &tuning.movement;
            println!(
                "movement: gravity={} stop_speed={} max_speed={} move_speed={} jump_velocity={}",
                m.gravity, m.stop_speed, m.max_speed, m.move_speed, m.jump_velocity
            );
            println!(
                "accel: ground={} air={} slide={} friction={} max_velocity={}",
                m.ground_accel, m.air_accel, m.slide_accel, m.friction, m.max_velocity
            );
            let b = &tuning.body;
            println!(
                "body: height={} radius={} slope_limit={} ladder_slope_limit={} wall_angle={} absorption={:?}",
                b.stand_height, b.radius, b.slope_limit, b.ladder_slope_limit, b.wall_angle, b.wall_absorption
            );
        }
        Commands::Simulate {
            ticks,
            tick_rate,
            arena,
            every,
        } => {
            let arena = arena.build();
            let dt = 1.0 / tick_rate.max(1) as f32;
            let mut pm = MovementState::spawn(spawn_point(&tuning), &tuning.body);
            let mut input = course(ticks, &tuning.body);
            let mut summary = RunSummary::default();

            for t in 1..=ticks as u32 {
                let command = input.sample_command();
                simulate_tick(&mut pm, &command, Vec3::ZERO, dt, &tuning, &arena);
                let readout = MovementInspector::inspect(&pm, Tick(t), tick_rate);
                summary.observe(&readout);
                if every > 0 && u64::from(t) % every == 0 {
                    println!("{readout}");
                }
            }

            let o = pm.origin;
            println!("Summary: {summary}");
            println!(
                "Final: origin=({:.3}, {:.3}, {:.3}) hash={:016x}",
                o.x,
                o.y,
                o.z,
                pm.state_hash()
            );
        }
        Commands::Netsim {
            ticks,
            latency,
            jitter,
            drop,
            seed,
            replay,
            redundancy,
        } => {
            let config = DriverConfig {
                reconcile: if replay {
                    ReconcileMode::ReplayForward
                } else {
                    ReconcileMode::Snap
                },
                redundancy,
                ..DriverConfig::default()
            };
            let up = LinkConfig {
                latency_ticks: latency,
                jitter_ticks: jitter,
                drop_chance: drop,
                seed,
            };
            let down = LinkConfig {
                drop_chance: 0.0,
                seed: seed.wrapping_add(1),
                ..up
            };
            netsim(tuning, config, up, down, ticks)?;
        }
        Commands::Record {
            out,
            ticks,
            tick_rate,
            arena,
        } => {
            let mut input = course(ticks, &tuning.body);
            let recording = Recording::capture(
                tuning,
                arena.build(),
                spawn_point(&tuning),
                tick_rate,
                &mut input,
                ticks,
            );
            let store = RecordingStore::open(&out)
                .with_context(|| format!("opening store {}", out.display()))?;
            let meta = store.save(&recording)?;
            println!(
                "Recorded: ticks={} rate={}Hz hash={:016x} sha256={}",
                meta.tick_count, meta.tick_rate, meta.final_hash, meta.sha256
            );
        }
        Commands::Verify { dir } => {
            let store = RecordingStore::open(&dir)
                .with_context(|| format!("opening store {}", dir.display()))?;
            let report = store.verify()?;
            println!("Verify: {report}");
            if !report.is_match() {
                anyhow::bail!("replay diverged from the recorded run");
            }
        }
    }

    Ok(())
}

fn load_tuning(path: Option<&Path>) -> anyhow::Result<TuningSet> {
    match path {
        Some(path) => TuningSet::load(path)
            .with_context(|| format!("loading tuning from {}", path.display())),
        None => Ok(TuningSet::default()),
    }
}

/// Capsule center standing on the floor at the origin.
fn spawn_point(tuning: &TuningSet) -> Vec3 {
    Vec3::new(0.0, tuning.body.stand_height * 0.5, 0.0)
}

/// Raw mouse counts per tick while strafing.
const STRAFE_LOOK: f32 = 15.0;
const RUN_UP_TICKS: usize = 45;
const HOP_CYCLE_TICKS: usize = 36;

/// A run-up followed by strafe-jump cycles that alternate direction, fed as
/// raw device frames through a sampler so look speed follows the tuning.
fn course(ticks: usize, body: &BodyTuning) -> ScriptedInput {
    let mut sampler = InputSampler::from_tuning(body);
    let mut commands = Vec::with_capacity(ticks);
    for i in 0..ticks {
        let raw = if i < RUN_UP_TICKS {
            RawInput {
                movement: Vec2::Y,
                ..RawInput::default()
            }
        } else {
            let cycle = (i - RUN_UP_TICKS) / HOP_CYCLE_TICKS;
            let side = if cycle % 2 == 0 { 1.0 } else { -1.0 };
            if (i - RUN_UP_TICKS) % HOP_CYCLE_TICKS == 0 {
                RawInput {
                    movement: Vec2::Y,
                    jump: true,
                    ..RawInput::default()
                }
            } else {
                RawInput {
                    look: Vec2::new(STRAFE_LOOK * side, 0.0),
                    movement: Vec2::new(side, 0.0),
                    ..RawInput::default()
                }
            }
        };
        sampler.feed(raw);
        commands.push(sampler.sample_command());
    }
    ScriptedInput::new(commands)
}

fn netsim(
    tuning: TuningSet,
    config: DriverConfig,
    up: LinkConfig,
    down: LinkConfig,
    ticks: usize,
) -> anyhow::Result<()> {
    let arena = Arena::proving_ground();
    let spawn = spawn_point(&tuning);
    let mut client = PredictedMover::new(Role::Owner, spawn, tuning, config);
    let mut server = PredictedMover::new(Role::Authority, spawn, tuning, config);
    let mut up_link = LossyLink::new(up);
    let mut down_link = LossyLink::new(down);
    let mut input = course(ticks, &tuning.body);

    let pump = |client: &mut PredictedMover,
                    server: &mut PredictedMover,
                    up_link: &mut LossyLink,
                    down_link: &mut LossyLink|
     -> anyhow::Result<()> {
        for bytes in up_link.advance() {
            if let Some(reply) = server.receive(NetMessage::decode(&bytes)?, &arena) {
                down_link.send(reply.encode()?);
            }
        }
        for bytes in down_link.advance() {
            client.receive(NetMessage::decode(&bytes)?, &arena);
        }
        Ok(())
    };

    for _ in 0..ticks {
        if let Some(message) = client.predict(&mut input, &arena) {
            up_link.send(message.encode()?);
        }
        pump(&mut client, &mut server, &mut up_link, &mut down_link)?;
    }
    while up_link.in_flight() > 0 || down_link.in_flight() > 0 {
        pump(&mut client, &mut server, &mut up_link, &mut down_link)?;
    }

    info!(
        sent = up_link.sent(),
        dropped = up_link.dropped(),
        "netsim finished"
    );
    println!("Client: {}", client.stats());
    println!("Server: {}", server.stats());
    println!(
        "Links: up sent={} dropped={} down sent={}",
        up_link.sent(),
        up_link.dropped(),
        down_link.sent()
    );

    let settled = server.last_simulated();
    let agreed = client
        .history()
        .get(settled)
        .is_some_and(|entry| entry.state.origin == server.state().origin);
    println!(
        "Settled at {settled}: client {} the authority",
        if agreed { "agrees with" } else { "differs from" }
    );
    Ok(())
}

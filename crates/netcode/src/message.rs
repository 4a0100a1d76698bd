use bhop_common::Tick;
use bhop_input::Command;
use bhop_kernel::MovementState;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::codec::{CodecError, from_cbor, to_cbor};

/// One tick of owner input, as replayed by the authority.
///
/// Look deltas are already folded into the carried orientation, so the
/// receiver adopts `yaw`/`pitch` and the basis as-is instead of re-applying
/// mouse motion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReplicateData {
    pub tick: Tick,
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub forward_move: f32,
    pub side_move: f32,
    pub up_move: f32,
    pub crouching: bool,
}

impl ReplicateData {
    /// Package `command` for `tick` using the orientation already in `state`.
    pub fn capture(tick: Tick, state: &MovementState, command: &Command) -> Self {
        Self {
            tick,
            forward: state.forward,
            right: state.right,
            up: state.up,
            yaw: state.current_yaw,
            pitch: state.current_pitch,
            forward_move: command.forward_move,
            side_move: command.side_move,
            up_move: command.up_move,
            crouching: command.crouching,
        }
    }

    /// The command to simulate, with no look delta left to apply.
    pub fn command(&self) -> Command {
        Command {
            forward_move: self.forward_move,
            side_move: self.side_move,
            up_move: self.up_move,
            crouching: self.crouching,
            delta_yaw: 0.0,
            delta_pitch: 0.0,
        }
    }

    pub fn adopt_orientation(&self, state: &mut MovementState) {
        state.forward = self.forward;
        state.right = self.right;
        state.up = self.up;
        state.current_yaw = self.yaw;
        state.current_pitch = self.pitch;
    }
}

/// The authoritative fields of a movement state after `tick`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReconcileData {
    pub tick: Tick,
    pub origin: Vec3,
    pub velocity: Vec3,
    pub height: f32,
    pub yaw: f32,
    pub pitch: f32,
}

impl ReconcileData {
    pub fn capture(tick: Tick, state: &MovementState) -> Self {
        Self {
            tick,
            origin: state.origin,
            velocity: state.velocity,
            height: state.height,
            yaw: state.current_yaw,
            pitch: state.current_pitch,
        }
    }

    /// Overwrite the authoritative fields of `state`.
    pub fn apply_to(&self, state: &mut MovementState) {
        state.origin = self.origin;
        state.velocity = self.velocity;
        state.height = self.height;
        state.current_yaw = self.yaw;
        state.current_pitch = self.pitch;
        state.refresh_basis();
    }

    /// Distance between the carried origin and `state.origin`.
    pub fn origin_error(&self, state: &MovementState) -> f32 {
        self.origin.distance(state.origin)
    }

    /// Largest gap between the carried fields and `state`: origin distance,
    /// velocity distance or height difference.
    pub fn divergence(&self, state: &MovementState) -> f32 {
        self.origin_error(state)
            .max(self.velocity.distance(state.velocity))
            .max((self.height - state.height).abs())
    }
}

/// Everything that crosses the wire between owner and authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NetMessage {
    /// Owner to authority: the newest input, preceded by up to
    /// `DriverConfig::redundancy` earlier ones, oldest first.
    Replicate(Vec<ReplicateData>),
    /// Authority to owner.
    Reconcile(ReconcileData),
}

impl NetMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            NetMessage::Replicate(_) => "replicate",
            NetMessage::Reconcile(_) => "reconcile",
        }
    }

    /// Newest tick carried by this message.
    pub fn tick(&self) -> Option<Tick> {
        match self {
            NetMessage::Replicate(inputs) => inputs.last().map(|d| d.tick),
            NetMessage::Reconcile(data) => Some(data.tick),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        to_cbor(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        from_cbor(bytes)
    }
}

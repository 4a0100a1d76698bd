use bhop_common::ColliderId;
use bhop_input::Command;
use bhop_tuning::BodyTuning;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Crouch sub-state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrouchState {
    #[default]
    Standing,
    Crouching,
    /// Crouch released but the stand-up space was blocked; retried every tick.
    WishStanding,
}

/// Which sides of the capsule touched something during the last move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollisionFlags(pub u8);

impl CollisionFlags {
    pub const NONE: CollisionFlags = CollisionFlags(0);
    pub const SIDES: CollisionFlags = CollisionFlags(1);
    pub const ABOVE: CollisionFlags = CollisionFlags(1 << 1);
    pub const BELOW: CollisionFlags = CollisionFlags(1 << 2);

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: CollisionFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: CollisionFlags) {
        self.0 |= other.0;
    }
}

impl std::ops::BitOr for CollisionFlags {
    type Output = CollisionFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        CollisionFlags(self.0 | rhs.0)
    }
}

/// A single contact reported by the collision provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionEvent {
    /// Unit surface normal.
    pub normal: Vec3,
    /// Angle between the normal and world up, in degrees. 0 is floor, 90 is wall.
    pub angle: f32,
    pub collider: ColliderId,
    pub is_ladder: bool,
}

impl CollisionEvent {
    /// Build a contact from a surface normal, deriving its angle from up.
    pub fn from_normal(normal: Vec3, collider: ColliderId) -> Self {
        let normal = normal.normalize_or_zero();
        Self {
            normal,
            angle: angle_from_up(normal),
            collider,
            is_ladder: false,
        }
    }

    pub fn ladder(mut self) -> Self {
        self.is_ladder = true;
        self
    }
}

/// Angle in degrees between `normal` and +Y.
pub fn angle_from_up(normal: Vec3) -> f32 {
    normal
        .normalize_or_zero()
        .dot(Vec3::Y)
        .clamp(-1.0, 1.0)
        .acos()
        .to_degrees()
}

/// Everything the collision provider knows after a move, consumed by the next tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollisionFrame {
    pub grounded: bool,
    pub flags: CollisionFlags,
    /// Slope limit the controller used for this move, degrees.
    pub slope_limit: f32,
    pub contacts: Vec<CollisionEvent>,
    /// Colliders overlapping a slightly inflated capsule, used to keep a slide
    /// alive when the sweep itself reported nothing.
    pub nearby: Vec<ColliderId>,
}

impl CollisionFrame {
    pub fn on_ladder(&self) -> bool {
        self.contacts.iter().any(|c| c.is_ladder)
    }
}

/// Per-entity movement state.
///
/// Owned by the entity's movement component. Only the resolver mutates it,
/// except for the authoritative fields a reconciliation overwrites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementState {
    /// Capsule center in world space.
    pub origin: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,

    pub velocity: Vec3,
    /// One-shot impulse, added to velocity and zeroed within the same tick.
    pub external_velocity: Vec3,

    pub is_grounded: bool,
    pub old_is_grounded: bool,
    pub collision_flags: CollisionFlags,
    pub slope_limit: f32,
    /// This tick's contacts.
    pub contacts: Vec<CollisionEvent>,
    pub nearby: Vec<ColliderId>,
    /// Contacts produced by the last move, waiting for the next tick.
    pub frame: CollisionFrame,

    pub is_sliding: bool,
    pub slide_surface_normal: Option<Vec3>,
    pub slide_surface_collider: Option<ColliderId>,
    pub is_on_ladder: bool,

    pub crouch_state: CrouchState,
    pub height: f32,
    /// Height still to be grown back by the application layer after standing up.
    pub height_to_recover: f32,
    pub radius: f32,

    /// Degrees, clamped to [-90, 90]. Negative looks up.
    pub current_pitch: f32,
    /// Degrees in [0, 360).
    pub current_yaw: f32,

    pub delta_time: f32,
    pub cmd: Command,
}

impl MovementState {
    /// A standing, motionless body at `origin` facing +Z.
    pub fn spawn(origin: Vec3, body: &BodyTuning) -> Self {
        let mut state = Self {
            origin,
            forward: Vec3::Z,
            right: Vec3::X,
            up: Vec3::Y,
            velocity: Vec3::ZERO,
            external_velocity: Vec3::ZERO,
            is_grounded: false,
            old_is_grounded: false,
            collision_flags: CollisionFlags::NONE,
            slope_limit: body.slope_limit,
            contacts: Vec::new(),
            nearby: Vec::new(),
            frame: CollisionFrame {
                slope_limit: body.slope_limit,
                ..CollisionFrame::default()
            },
            is_sliding: false,
            slide_surface_normal: None,
            slide_surface_collider: None,
            is_on_ladder: false,
            crouch_state: CrouchState::Standing,
            height: body.stand_height,
            height_to_recover: 0.0,
            radius: body.radius,
            current_pitch: 0.0,
            current_yaw: 0.0,
            delta_time: 0.0,
            cmd: Command::default(),
        };
        state.refresh_basis();
        state
    }

    /// Start-of-tick capture: take over the command, the contacts gathered by
    /// the previous move, and the tick length.
    pub fn capture(&mut self, command: &Command, frame: CollisionFrame, dt: f32) {
        self.old_is_grounded = self.is_grounded;
        self.is_grounded = frame.grounded;
        self.collision_flags = frame.flags;
        self.slope_limit = frame.slope_limit;
        self.is_on_ladder = frame.on_ladder();
        self.contacts = frame.contacts;
        self.nearby = frame.nearby;
        self.delta_time = dt;
        self.cmd = *command;
    }

    /// Recompute forward/right/up from the current yaw. Y is up, yaw 0 faces +Z.
    pub fn refresh_basis(&mut self) {
        let (sin, cos) = self.current_yaw.to_radians().sin_cos();
        self.forward = Vec3::new(sin, 0.0, cos);
        self.right = Vec3::new(cos, 0.0, -sin);
        self.up = Vec3::Y;
    }

    /// Magnitude of the XZ velocity.
    pub fn horizontal_speed(&self) -> f32 {
        Vec3::new(self.velocity.x, 0.0, self.velocity.z).length()
    }

    /// Height of the capsule as the controller currently sees it.
    pub fn controller_height(&self) -> f32 {
        self.height - self.height_to_recover
    }

    /// Deterministic FNV-1a hash over the simulated fields.
    ///
    /// Two runs fed identical inputs must produce identical hashes; any
    /// float drift shows up here bit for bit.
    pub fn state_hash(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325;
        let mix = |h: &mut u64, bytes: &[u8]| {
            for &b in bytes {
                *h ^= b as u64;
                *h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };
        for v in [self.origin, self.velocity, self.external_velocity] {
            for c in v.to_array() {
                mix(&mut h, &c.to_le_bytes());
            }
        }
        for f in [
            self.height,
            self.height_to_recover,
            self.current_pitch,
            self.current_yaw,
        ] {
            mix(&mut h, &f.to_le_bytes());
        }
        mix(
            &mut h,
            &[
                self.is_grounded as u8,
                self.is_sliding as u8,
                self.crouch_state as u8,
                self.collision_flags.0,
            ],
        );
        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_uses_body_dimensions() {
        let body = BodyTuning::default();
        let s = MovementState::spawn(Vec3::new(0.0, 0.9, 0.0), &body);
        assert_eq!(s.height, 1.8);
        assert_eq!(s.radius, 0.45);
        assert_eq!(s.crouch_state, CrouchState::Standing);
        assert_eq!(s.forward, Vec3::Z);
        assert!(s.slide_surface_normal.is_none());
    }

    #[test]
    fn basis_follows_yaw() {
        let mut s = MovementState::spawn(Vec3::ZERO, &BodyTuning::default());
        s.current_yaw = 90.0;
        s.refresh_basis();
        assert!((s.forward - Vec3::X).length() < 1e-6);
        assert!((s.right - Vec3::NEG_Z).length() < 1e-6);
    }

    #[test]
    fn contact_angle_from_normal() {
        let floor = CollisionEvent::from_normal(Vec3::Y, ColliderId(1));
        assert!(floor.angle.abs() < 1e-4);
        let wall = CollisionEvent::from_normal(Vec3::new(0.0, 0.0, -3.0), ColliderId(2));
        assert!((wall.angle - 90.0).abs() < 1e-4);
        assert!((wall.normal.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn capture_rolls_grounded_history() {
        let mut s = MovementState::spawn(Vec3::ZERO, &BodyTuning::default());
        s.is_grounded = true;
        let frame = CollisionFrame {
            grounded: false,
            flags: CollisionFlags::SIDES,
            slope_limit: 45.0,
            contacts: vec![CollisionEvent::from_normal(Vec3::X, ColliderId(3)).ladder()],
            nearby: vec![ColliderId(3)],
        };
        s.capture(&Command::forward(), frame, 0.02);
        assert!(s.old_is_grounded);
        assert!(!s.is_grounded);
        assert!(s.is_on_ladder);
        assert_eq!(s.contacts.len(), 1);
        assert_eq!(s.cmd.forward_move, 1.0);
        assert_eq!(s.delta_time, 0.02);
    }

    #[test]
    fn flags_combine() {
        let f = CollisionFlags::BELOW | CollisionFlags::SIDES;
        assert!(f.contains(CollisionFlags::BELOW));
        assert!(!f.contains(CollisionFlags::ABOVE));
        assert!(CollisionFlags::NONE.is_empty());
    }

    #[test]
    fn state_hash_tracks_velocity_bits() {
        let a = MovementState::spawn(Vec3::ZERO, &BodyTuning::default());
        let mut b = a.clone();
        assert_eq!(a.state_hash(), b.state_hash());
        b.velocity.x = f32::EPSILON;
        assert_ne!(a.state_hash(), b.state_hash());
    }
}

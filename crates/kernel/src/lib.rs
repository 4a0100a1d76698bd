//! Movement kernel: per-entity movement state and the deterministic resolver
//! that advances it one tick at a time.
//!
//! # Invariants
//! - The resolver is pure with respect to (state, command, contacts, dt, tuning).
//! - Velocity never holds NaN after a tick and no component exceeds `max_velocity`.
//! - Geometry lives behind the collaborator traits in [`collision`]; the
//!   resolver only sees contact events gathered before it runs.

pub mod collision;
pub mod crouch;
pub mod resolver;
pub mod rotation;
pub mod state;
pub mod tick;

pub use collision::{
    Capsule, CollisionWorld, DisplacementApplier, MoveRequest, MoveResult, OverlapQuery,
};
pub use crouch::update_crouch;
pub use resolver::{resolve, resolve_velocity};
pub use rotation::update_rotation;
pub use state::{CollisionEvent, CollisionFlags, CollisionFrame, CrouchState, MovementState};
pub use tick::{recover_height, simulate_tick};

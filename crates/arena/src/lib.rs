//! Reference collision provider for headless runs and tests.
//!
//! Static half-space surfaces (floors, walls, ramps, ladders) behind the
//! kernel's collaborator traits. The movement kernel never touches this
//! crate directly; it only sees the [`bhop_kernel::CollisionFrame`]s it returns.
//!
//! # Invariants
//! - A move is split into substeps no longer than the capsule radius.
//! - Each collider appears at most once in a frame's contact list.
//! - Results depend only on the request and the surface list.

pub mod arena;
pub mod surface;

pub use arena::Arena;
pub use surface::{Bounds, Surface};

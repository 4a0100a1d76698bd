//! Shared types used by every bhop crate.
//!
//! # Invariants
//! - Types here are plain values: `Copy`, serializable, no behavior beyond ordering.

pub mod types;

pub use types::{ColliderId, EntityId, LayerMask, Tick};

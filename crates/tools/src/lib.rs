//! Developer tooling: movement inspector and run summaries.
//!
//! # Invariants
//! - Tools only read movement state; they never mutate it.

pub mod inspector;

pub use inspector::{DebugInfo, MovementInspector, RunSummary};

//! Prediction and reconciliation: the owning client runs the movement kernel
//! ahead of the server, the server replays the same inputs and sends back
//! corrections.
//!
//! # Invariants
//! - Owner, authority and observers all advance through `bhop_kernel::simulate_tick`.
//! - Replicate and reconcile traffic is tick-tagged; anything not newer than
//!   what a receiver already processed is ignored and counted.
//! - A reconcile equal to the owner's own prediction for that tick leaves the
//!   owner's state unchanged.
//! - The pending external impulse is drained exactly once per simulated tick.

pub mod codec;
pub mod driver;
pub mod history;
pub mod link;
pub mod message;
pub mod stats;

pub use driver::{DriverConfig, PendingImpulse, PredictedMover, ReconcileMode, Role};
pub use history::{HistoryEntry, PredictionHistory};
pub use link::{LinkConfig, LossyLink};
pub use codec::{CodecError, from_cbor, to_cbor};
pub use message::{NetMessage, ReconcileData, ReplicateData};
pub use stats::DriverStats;

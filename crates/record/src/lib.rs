//! Input recordings: capture a session, store it, replay it bit for bit.
//!
//! # Invariants
//! - A recording holds every input needed to rebuild the final state.
//! - Stored recordings are content-addressed and verified before use.
//! - Loading fails closed on schema, digest or tick-count mismatch.

pub mod recording;
pub mod store;

pub use recording::{Recording, ReplayReport};
pub use store::{RecordError, RecordingMeta, RecordingStore};

//! Input sampling: raw device signals in, one movement command per tick out.
//!
//! # Invariants
//! - Look deltas accumulate between samples and are reset by every sample.
//! - Held axes (move, jump, crouch) reflect the latest raw input.
//! - The movement core consumes commands, never raw device input.

pub mod command;
pub mod sampler;

pub use command::Command;
pub use sampler::{CommandSource, InputSampler, RawInput, ScriptedInput};

use bhop_tuning::BodyTuning;
use glam::Vec2;

use crate::Command;

/// Anything that can hand the movement tick a command.
pub trait CommandSource {
    /// Return the input accumulated since the previous call and reset the
    /// accumulated look delta. A second call in the same tick yields zero look delta.
    fn sample_command(&mut self) -> Command;
}

/// Raw per-frame device state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawInput {
    /// Mouse/stick look delta this frame (x = yaw, y = pitch), unscaled.
    pub look: Vec2,
    /// Movement axes (x = strafe, y = forward).
    pub movement: Vec2,
    pub jump: bool,
    pub crouch: bool,
}

/// Accumulates raw input between ticks.
///
/// Frames may arrive faster than network ticks; look deltas are summed so no
/// mouse motion is lost, while held buttons simply track the latest frame.
#[derive(Debug, Clone, Default)]
pub struct InputSampler {
    sensitivity: f32,
    pending: Command,
    frames_since_sample: u32,
}

impl InputSampler {
    pub fn new(sensitivity: f32) -> Self {
        Self {
            sensitivity,
            ..Self::default()
        }
    }

    /// Sampler using the body's configured look sensitivity.
    pub fn from_tuning(body: &BodyTuning) -> Self {
        Self::new(body.look_sensitivity)
    }

    /// Fold one frame of raw input into the pending command.
    pub fn feed(&mut self, raw: RawInput) {
        self.pending.delta_yaw += raw.look.x * self.sensitivity;
        self.pending.delta_pitch += raw.look.y * self.sensitivity;
        self.pending.forward_move = raw.movement.y;
        self.pending.side_move = raw.movement.x;
        self.pending.up_move = if raw.jump { 1.0 } else { 0.0 };
        self.pending.crouching = raw.crouch;
        self.frames_since_sample += 1;
    }

    /// Look the pending command over without consuming it.
    pub fn peek(&self) -> &Command {
        &self.pending
    }
}

impl CommandSource for InputSampler {
    fn sample_command(&mut self) -> Command {
        let snapshot = self.pending;
        self.pending.delta_yaw = 0.0;
        self.pending.delta_pitch = 0.0;
        tracing::trace!(frames = self.frames_since_sample, "sampled command");
        self.frames_since_sample = 0;
        snapshot
    }
}

/// Replays a fixed list of commands, one per sample, then idles.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    commands: Vec<Command>,
    cursor: usize,
}

impl ScriptedInput {
    pub fn new(commands: Vec<Command>) -> Self {
        Self {
            commands,
            cursor: 0,
        }
    }

    /// Append `command` repeated for `ticks` samples.
    pub fn hold(mut self, command: Command, ticks: usize) -> Self {
        self.commands
            .extend(std::iter::repeat_n(command, ticks));
        self
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Samples left before the script idles.
    pub fn remaining(&self) -> usize {
        self.commands.len().saturating_sub(self.cursor)
    }
}

impl CommandSource for ScriptedInput {
    fn sample_command(&mut self) -> Command {
        let command = self.commands.get(self.cursor).copied().unwrap_or_default();
        self.cursor += 1;
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(look: Vec2, movement: Vec2) -> RawInput {
        RawInput {
            look,
            movement,
            ..RawInput::default()
        }
    }

    #[test]
    fn look_accumulates_and_resets() {
        let mut s = InputSampler::new(0.5);
        s.feed(frame(Vec2::new(2.0, 4.0), Vec2::ZERO));
        s.feed(frame(Vec2::new(2.0, -2.0), Vec2::ZERO));
        let c = s.sample_command();
        assert_eq!(c.delta_yaw, 2.0);
        assert_eq!(c.delta_pitch, 1.0);

        // Second sample in the same tick: empty look delta.
        let again = s.sample_command();
        assert_eq!(again.delta_yaw, 0.0);
        assert_eq!(again.delta_pitch, 0.0);
    }

    #[test]
    fn tuning_sets_look_sensitivity() {
        let body = BodyTuning {
            look_sensitivity: 0.25,
            ..BodyTuning::default()
        };
        let mut s = InputSampler::from_tuning(&body);
        s.feed(frame(Vec2::new(8.0, -4.0), Vec2::ZERO));
        let c = s.sample_command();
        assert_eq!(c.delta_yaw, 2.0);
        assert_eq!(c.delta_pitch, -1.0);

        let mut default = InputSampler::from_tuning(&BodyTuning::default());
        default.feed(frame(Vec2::new(10.0, 0.0), Vec2::ZERO));
        assert!((default.sample_command().delta_yaw - 1.0).abs() < 1e-6);
    }

    #[test]
    fn held_axes_survive_sampling() {
        let mut s = InputSampler::new(1.0);
        s.feed(RawInput {
            movement: Vec2::new(-1.0, 1.0),
            jump: true,
            crouch: true,
            ..RawInput::default()
        });
        let first = s.sample_command();
        let second = s.sample_command();
        for c in [first, second] {
            assert_eq!(c.forward_move, 1.0);
            assert_eq!(c.side_move, -1.0);
            assert_eq!(c.up_move, 1.0);
            assert!(c.crouching);
        }
    }

    #[test]
    fn latest_frame_wins_for_buttons() {
        let mut s = InputSampler::new(1.0);
        s.feed(RawInput {
            jump: true,
            ..RawInput::default()
        });
        s.feed(RawInput::default());
        assert_eq!(s.sample_command().up_move, 0.0);
    }

    #[test]
    fn scripted_input_idles_after_end() {
        let mut script = ScriptedInput::default()
            .hold(Command::forward(), 2)
            .hold(Command::default().with_jump(), 1);
        assert_eq!(script.len(), 3);
        assert_eq!(script.sample_command().forward_move, 1.0);
        assert_eq!(script.sample_command().forward_move, 1.0);
        assert!(script.sample_command().wants_jump());
        assert_eq!(script.remaining(), 0);
        assert_eq!(script.sample_command(), Command::default());
    }
}

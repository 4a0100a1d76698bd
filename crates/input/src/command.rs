use serde::{Deserialize, Serialize};

/// One tick's worth of movement intent.
///
/// Produced by a [`CommandSource`](crate::CommandSource) and consumed exactly
/// once by the movement tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Forward/back axis in [-1, 1].
    pub forward_move: f32,
    /// Strafe axis in [-1, 1], positive is right.
    pub side_move: f32,
    /// Jump intent, 0 or 1.
    pub up_move: f32,
    pub crouching: bool,
    /// Look delta accumulated since the previous sample, sensitivity applied.
    pub delta_yaw: f32,
    pub delta_pitch: f32,
}

impl Command {
    pub fn forward() -> Self {
        Self {
            forward_move: 1.0,
            ..Self::default()
        }
    }

    pub fn with_jump(mut self) -> Self {
        self.up_move = 1.0;
        self
    }

    pub fn with_crouch(mut self) -> Self {
        self.crouching = true;
        self
    }

    pub fn with_strafe(mut self, side: f32) -> Self {
        self.side_move = side;
        self
    }

    pub fn with_look(mut self, delta_yaw: f32, delta_pitch: f32) -> Self {
        self.delta_yaw = delta_yaw;
        self.delta_pitch = delta_pitch;
        self
    }

    pub fn wants_jump(&self) -> bool {
        self.up_move > 0.0
    }
}

use bhop_common::Tick;
use bhop_kernel::{CrouchState, MovementState};
use tracing::trace;

/// Read-only queries against a mover for debugging and development UI.
pub struct MovementInspector;

impl MovementInspector {
    /// Snapshot the values a debug overlay shows. Contact state comes from the
    /// frame the last move produced.
    pub fn inspect(state: &MovementState, tick: Tick, tick_rate: u32) -> DebugInfo {
        let info = DebugInfo {
            tick,
            speed: state.horizontal_speed(),
            vertical_speed: state.velocity.y,
            grounded: state.frame.grounded,
            sliding: state.is_sliding,
            on_ladder: state.frame.on_ladder(),
            crouch: state.crouch_state,
            height: state.height,
            tick_rate,
        };
        trace!(%info, "inspect");
        info
    }
}

/// Per-tick movement readout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugInfo {
    pub tick: Tick,
    /// Horizontal speed in units per second.
    pub speed: f32,
    pub vertical_speed: f32,
    pub grounded: bool,
    pub sliding: bool,
    pub on_ladder: bool,
    pub crouch: CrouchState,
    pub height: f32,
    pub tick_rate: u32,
}

impl std::fmt::Display for DebugInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = if self.on_ladder {
            "ladder"
        } else if self.sliding {
            "slide"
        } else if self.grounded {
            "ground"
        } else {
            "air"
        };
        write!(
            f,
            "{} speed={:.2} vy={:.2} mode={} crouch={:?} height={:.2} rate={}Hz",
            self.tick,
            self.speed,
            self.vertical_speed,
            mode,
            self.crouch,
            self.height,
            self.tick_rate
        )
    }
}

/// Aggregates readouts over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub peak_speed: f32,
    pub airborne_ticks: u64,
    pub sliding_ticks: u64,
    pub ladder_ticks: u64,
}

impl RunSummary {
    pub fn observe(&mut self, info: &DebugInfo) {
        self.ticks += 1;
        self.peak_speed = self.peak_speed.max(info.speed);
        if !info.grounded {
            self.airborne_ticks += 1;
        }
        if info.sliding {
            self.sliding_ticks += 1;
        }
        if info.on_ladder {
            self.ladder_ticks += 1;
        }
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ticks={} peak_speed={:.2} airborne={} sliding={} ladder={}",
            self.ticks, self.peak_speed, self.airborne_ticks, self.sliding_ticks, self.ladder_ticks
        )
    }
}

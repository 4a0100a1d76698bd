use crate::state::MovementState;

/// Apply this tick's look deltas and refresh the movement basis.
///
/// Pitch is clamped to straight up/down, yaw wraps into `[0, 360)`.
pub fn update_rotation(pm: &mut MovementState) {
    pm.current_pitch = (pm.current_pitch - pm.cmd.delta_pitch).clamp(-90.0, 90.0);
    pm.current_yaw = (pm.current_yaw + pm.cmd.delta_yaw).rem_euclid(360.0);
    pm.refresh_basis();
}

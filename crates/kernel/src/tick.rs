use std::mem;

use bhop_input::Command;
use bhop_tuning::TuningSet;
use glam::Vec3;
use tracing::debug;

use crate::collision::{Capsule, CollisionWorld, MoveRequest};
use crate::crouch::update_crouch;
use crate::resolver::resolve_velocity;
use crate::rotation::update_rotation;
use crate::state::MovementState;

/// Seconds over which half of the outstanding stand-up height is recovered.
const RECOVER_HALF_LIFE: f32 = 0.05;
/// Below this, the remaining stand-up height is recovered in one step.
const RECOVER_SNAP: f32 = 0.01;

/// Run one full movement tick: capture, resolve, crouch, then move the body
/// through `world` and keep the resulting contacts for the next tick.
///
/// `impulse` is the external velocity accumulated since the previous tick;
/// it is applied exactly once.
pub fn simulate_tick(
    pm: &mut MovementState,
    command: &Command,
    impulse: Vec3,
    dt: f32,
    tuning: &TuningSet,
    world: &dyn CollisionWorld,
) {
    let frame = mem::take(&mut pm.frame);
    pm.capture(command, frame, dt);
    pm.external_velocity += impulse;

    update_rotation(pm);
    resolve_velocity(pm, tuning);
    update_crouch(pm, world);

    let slope_limit = if pm.is_on_ladder {
        tuning.body.ladder_slope_limit
    } else {
        tuning.body.slope_limit
    };
    let lift = recover_height(pm);

    pm.is_on_ladder = false;
    pm.contacts.clear();
    pm.nearby.clear();

    let request = MoveRequest {
        capsule: Capsule {
            center: pm.origin,
            height: pm.controller_height(),
            radius: pm.radius,
        },
        displacement: pm.velocity * dt + Vec3::Y * (lift * 0.5),
        slope_limit,
        skin: tuning.body.slide_skin,
    };
    let result = world.apply_displacement(&request);

    debug!(
        contacts = result.frame.contacts.len(),
        grounded = result.frame.grounded,
        "moved"
    );
    pm.origin = result.origin;
    pm.frame = result.frame;
}

/// Take this tick's share of the outstanding stand-up height.
///
/// Returns the amount recovered; `height_to_recover` shrinks monotonically
/// and reaches exactly 0.
pub fn recover_height(pm: &mut MovementState) -> f32 {
    if pm.height_to_recover <= 0.0 {
        pm.height_to_recover = 0.0;
        return 0.0;
    }
    let step = if pm.height_to_recover <= RECOVER_SNAP {
        pm.height_to_recover
    } else {
        (pm.height_to_recover * 0.5 * pm.delta_time / RECOVER_HALF_LIFE).min(pm.height_to_recover)
    };
    pm.height_to_recover -= step;
    if pm.height_to_recover < 0.0 {
        pm.height_to_recover = 0.0;
    }
    step
}

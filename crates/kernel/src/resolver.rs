//! The velocity resolver: Quake-style gravity, jump, friction, acceleration
//! and collision response, applied in a fixed order every tick.
//!
//! Every step reads and writes only the [`MovementState`] it is given plus
//! the tuning passed alongside it, so client prediction and server authority
//! produce the same bits for the same inputs.

use bhop_input::Command;
use bhop_tuning::{BodyTuning, MoveTuning, TuningSet, WallAbsorption};
use glam::Vec3;

use crate::state::{CollisionEvent, CollisionFrame, CrouchState, MovementState};

/// Pure form of one resolver pass: capture the command and contacts into a
/// copy of `prev`, resolve its velocity and return the copy.
pub fn resolve(
    prev: &MovementState,
    command: &Command,
    frame: &CollisionFrame,
    dt: f32,
    tuning: &TuningSet,
) -> MovementState {
    let mut next = prev.clone();
    next.capture(command, frame.clone(), dt);
    resolve_velocity(&mut next, tuning);
    next
}

/// Resolve velocity for a state whose command, contacts and `delta_time`
/// were already captured.
pub fn resolve_velocity(pm: &mut MovementState, tuning: &TuningSet) {
    let movement = &tuning.movement;

    classify_contacts(pm, &tuning.body);
    // Slide surfaces use air rules.
    if pm.is_sliding {
        pm.is_grounded = false;
    }

    apply_external_velocity(pm);
    apply_gravity(pm, movement);
    apply_jump(pm, movement);
    apply_friction(pm, movement);
    accelerate(pm, movement);
    clamp_horizontal_speed(pm, movement);
    project_onto_slide_surface(pm);
    sanitize(pm, movement);
}

/// Inspect this tick's contacts: absorb wall hits, start, keep or end a
/// slide, and deflect fast glancing impacts.
pub fn classify_contacts(pm: &mut MovementState, body: &BodyTuning) {
    // Ladders override sliding and skip every other contact response.
    if pm.is_on_ladder {
        clear_slide(pm);
        return;
    }

    if pm.is_sliding {
        pm.is_sliding = if pm.collision_flags.is_empty() {
            // The sweep reported nothing; fall back to the overlap list.
            pm.slide_surface_collider
                .is_some_and(|id| pm.nearby.contains(&id))
        } else {
            pm.slide_surface_normal.is_some_and(|slide| {
                pm.contacts
                    .iter()
                    .any(|c| c.normal.distance(slide) < body.slide_normal_tolerance)
            })
        };
    }
    if !pm.is_sliding {
        clear_slide(pm);
    }

    for i in 0..pm.contacts.len() {
        let contact = pm.contacts[i];

        if contact.angle >= body.wall_angle {
            absorb_wall(pm, contact.normal, body.wall_absorption);
        }

        if contact.angle > pm.slope_limit && contact.angle < body.wall_angle && !pm.is_sliding {
            // Grounded last tick: most likely a step edge, not a slope.
            if pm.old_is_grounded {
                continue;
            }
            pm.is_sliding = true;
            pm.slide_surface_normal = Some(contact.normal);
            pm.slide_surface_collider = Some(contact.collider);
            return;
        }

        if !pm.is_sliding
            && pm.velocity.length() > body.bounce_speed
            && contact.angle >= body.bounce_min_angle
        {
            bounce(pm, &contact, body.bounce_loss);
        }
    }
}

fn clear_slide(pm: &mut MovementState) {
    pm.is_sliding = false;
    pm.slide_surface_normal = None;
    pm.slide_surface_collider = None;
}

fn absorb_wall(pm: &mut MovementState, normal: Vec3, mode: WallAbsorption) {
    match mode {
        WallAbsorption::ProjectOnPlane => {
            pm.velocity = project_on_plane(pm.velocity, normal);
        }
        WallAbsorption::PreserveVertical => {
            let vertical = pm.velocity.y;
            pm.velocity = project_on_plane(pm.velocity, normal);
            pm.velocity.y = vertical;
        }
    }
}

/// Deflect off a surface at a shallower angle, losing part of the speed that
/// went into it.
fn bounce(pm: &mut MovementState, contact: &CollisionEvent, loss: f32) {
    let normal = contact.normal;
    let speed = pm.velocity.length();
    let reflected = reflect(pm.velocity / speed, normal);
    let tangent = project_on_plane(reflected, normal).normalize_or_zero();

    let turn = (90.0 - contact.angle).to_radians();
    let direction = if tangent == Vec3::ZERO {
        normal
    } else {
        normal * turn.cos() + tangent * turn.sin()
    };

    let absorbed = project(pm.velocity, normal).length() * loss;
    pm.velocity = direction * (speed - absorbed);
}

/// Fold the one-shot external impulse into velocity and clear it.
pub fn apply_external_velocity(pm: &mut MovementState) {
    pm.velocity += pm.external_velocity;
    pm.external_velocity = Vec3::ZERO;
}

pub fn apply_gravity(pm: &mut MovementState, tuning: &MoveTuning) {
    pm.velocity.y -= tuning.gravity * pm.delta_time;
}

/// Overwrite vertical velocity with the jump impulse. Ground only.
pub fn apply_jump(pm: &mut MovementState, tuning: &MoveTuning) {
    if !pm.is_grounded || pm.cmd.up_move <= 0.0 {
        return;
    }
    pm.velocity.y = tuning.jump_velocity * pm.cmd.up_move;
}

/// Ground friction. The drop is scaled by `max(stop_speed, speed)`, so slow
/// bodies stop within a tick or two.
///
/// A grounded body is expected to carry no meaningful vertical speed, so the
/// whole velocity vector is measured and rescaled; this also bleeds off the
/// gravity accumulated while standing.
pub fn apply_friction(pm: &mut MovementState, tuning: &MoveTuning) {
    if !pm.is_grounded {
        return;
    }
    let speed = pm.velocity.length();
    if speed <= 0.0 {
        return;
    }
    let drop = speed.max(tuning.stop_speed) * tuning.friction * pm.delta_time;
    pm.velocity = pm.velocity / speed * (speed - drop).max(0.0);
}

/// Wish-direction acceleration. Only the velocity already along the wish
/// direction counts against `wish_speed`, which is what lets air strafing
/// gain speed.
pub fn accelerate(pm: &mut MovementState, tuning: &MoveTuning) {
    let mut move_speed = tuning.move_speed;
    if pm.crouch_state != CrouchState::Standing {
        move_speed /= 2.0;
    }

    let wish_velocity =
        pm.forward * (pm.cmd.forward_move * move_speed) + pm.right * (pm.cmd.side_move * move_speed);
    let wish_direction = wish_velocity.normalize_or_zero();
    let wish_speed = wish_velocity.length().clamp(0.0, tuning.max_speed);

    let acceleration = if pm.is_sliding {
        tuning.slide_accel
    } else if pm.is_grounded {
        tuning.ground_accel
    } else {
        tuning.air_accel
    };

    let current_speed = pm.velocity.dot(wish_direction);
    let add_speed = wish_speed - current_speed;
    if add_speed <= 0.0 {
        return;
    }

    let accel_speed =
        (acceleration * pm.delta_time * wish_speed * tuning.friction).min(add_speed);
    pm.velocity += wish_direction * accel_speed;
}

/// Cap XZ speed at `max_speed`, leaving vertical speed alone. Slides are exempt.
pub fn clamp_horizontal_speed(pm: &mut MovementState, tuning: &MoveTuning) {
    if pm.is_sliding {
        return;
    }
    let horizontal = Vec3::new(pm.velocity.x, 0.0, pm.velocity.z);
    let speed = horizontal.length();
    if speed <= tuning.max_speed {
        return;
    }
    let scaled = horizontal * (tuning.max_speed / speed);
    pm.velocity = Vec3::new(scaled.x, pm.velocity.y, scaled.z);
}

/// Keep a sliding body moving along, not into, its slide surface.
pub fn project_onto_slide_surface(pm: &mut MovementState) {
    if !pm.is_sliding {
        return;
    }
    let Some(normal) = pm.slide_surface_normal else {
        return;
    };
    pm.velocity = project_on_plane(pm.velocity, normal);
    pm.external_velocity = project_on_plane(pm.external_velocity, normal);
}

/// Zero NaN components of velocity and origin, then cap each velocity
/// component at `max_velocity`. Only the upper bound is enforced.
pub fn sanitize(pm: &mut MovementState, tuning: &MoveTuning) {
    for c in [
        &mut pm.velocity.x,
        &mut pm.velocity.y,
        &mut pm.velocity.z,
        &mut pm.origin.x,
        &mut pm.origin.y,
        &mut pm.origin.z,
    ] {
        if c.is_nan() {
            *c = 0.0;
        }
    }
    for c in [&mut pm.velocity.x, &mut pm.velocity.y, &mut pm.velocity.z] {
        if *c > tuning.max_velocity {
            *c = tuning.max_velocity;
        }
    }
}

fn project(v: Vec3, normal: Vec3) -> Vec3 {
    let len_sq = normal.length_squared();
    if len_sq <= f32::EPSILON {
        return Vec3::ZERO;
    }
    normal * (v.dot(normal) / len_sq)
}

fn project_on_plane(v: Vec3, normal: Vec3) -> Vec3 {
    v - project(v, normal)
}

fn reflect(direction: Vec3, normal: Vec3) -> Vec3 {
    direction - 2.0 * direction.dot(normal) * normal
}

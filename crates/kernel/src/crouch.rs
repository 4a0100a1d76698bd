use bhop_common::LayerMask;
use glam::Vec3;
use tracing::trace;

use crate::collision::OverlapQuery;
use crate::state::{CrouchState, MovementState};

/// Advance the crouch machine one tick.
///
/// Crouching halves the height at once. Standing up only happens when a
/// full-height capsule fits; until then the body waits in
/// [`CrouchState::WishStanding`] and retries every tick. The regained height
/// is recorded in `height_to_recover` so the controller can grow back
/// gradually (see [`crate::tick::recover_height`]).
pub fn update_crouch(pm: &mut MovementState, query: &dyn OverlapQuery) {
    match pm.crouch_state {
        CrouchState::Standing => {
            if pm.cmd.crouching {
                pm.height /= 2.0;
                pm.height_to_recover = 0.0;
                pm.crouch_state = CrouchState::Crouching;
                trace!(height = pm.height, "crouch");
            }
        }
        CrouchState::Crouching => {
            if !pm.cmd.crouching {
                pm.crouch_state = CrouchState::WishStanding;
                try_stand(pm, query);
            }
        }
        CrouchState::WishStanding => {
            if pm.cmd.crouching {
                pm.crouch_state = CrouchState::Crouching;
            } else {
                try_stand(pm, query);
            }
        }
    }
}

fn try_stand(pm: &mut MovementState, query: &dyn OverlapQuery) {
    let stand_height = pm.height * 2.0;
    let feet = pm.origin - Vec3::Y * (pm.height * 0.5);
    let bottom = feet + Vec3::Y * pm.radius;
    let top = feet + Vec3::Y * (stand_height - pm.radius);
    let mask = LayerMask::all_except(LayerMask::PLAYER_LAYER);

    if query.capsule_overlap(bottom, top, pm.radius, mask) {
        return;
    }

    pm.height_to_recover = stand_height - pm.height;
    pm.height = stand_height;
    pm.crouch_state = CrouchState::Standing;
    trace!(height = pm.height, recover = pm.height_to_recover, "stand");
}

#[cfg(test)]
mod tests {
    use super::*;
    use bhop_input::Command;
    use bhop_tuning::BodyTuning;
    use std::cell::Cell;

    struct Ceiling {
        blocked: Cell<bool>,
        last_query: Cell<Option<(Vec3, Vec3, f32)>>,
    }

    impl Ceiling {
        fn open() -> Self {
            Self {
                blocked: Cell::new(false),
                last_query: Cell::new(None),
            }
        }
    }

    impl OverlapQuery for Ceiling {
        fn capsule_overlap(&self, bottom: Vec3, top: Vec3, radius: f32, mask: LayerMask) -> bool {
            assert!(!mask.contains(LayerMask::PLAYER_LAYER));
            self.last_query.set(Some((bottom, top, radius)));
            self.blocked.get()
        }
    }

    fn body() -> MovementState {
        MovementState::spawn(Vec3::new(0.0, 0.9, 0.0), &BodyTuning::default())
    }

    #[test]
    fn crouch_halves_height() {
        let mut pm = body();
        pm.cmd = Command::default().with_crouch();
        update_crouch(&mut pm, &Ceiling::open());
        assert_eq!(pm.crouch_state, CrouchState::Crouching);
        assert_eq!(pm.height, 0.9);
        assert_eq!(pm.height_to_recover, 0.0);
    }

    #[test]
    fn release_stands_in_same_tick_when_clear() {
        let world = Ceiling::open();
        let mut pm = body();
        pm.cmd = Command::default().with_crouch();
        update_crouch(&mut pm, &world);

        pm.cmd = Command::default();
        update_crouch(&mut pm, &world);
        assert_eq!(pm.crouch_state, CrouchState::Standing);
        assert_eq!(pm.height, 1.8);
        assert!((pm.height_to_recover - 0.9).abs() < 1e-6);

        let (bottom, top, radius) = world.last_query.get().unwrap();
        assert!((bottom.y - 0.9).abs() < 1e-6);
        assert!((top.y - bottom.y - (1.8 - 0.9)).abs() < 1e-6);
        assert_eq!(radius, 0.45);
    }

    #[test]
    fn blocked_stand_waits_then_retries() {
        let world = Ceiling::open();
        world.blocked.set(true);
        let mut pm = body();
        pm.cmd = Command::default().with_crouch();
        update_crouch(&mut pm, &world);

        pm.cmd = Command::default();
        update_crouch(&mut pm, &world);
        assert_eq!(pm.crouch_state, CrouchState::WishStanding);
        assert_eq!(pm.height, 0.9);

        update_crouch(&mut pm, &world);
        assert_eq!(pm.crouch_state, CrouchState::WishStanding);

        world.blocked.set(false);
        update_crouch(&mut pm, &world);
        assert_eq!(pm.crouch_state, CrouchState::Standing);
        assert_eq!(pm.height, 1.8);
    }

    #[test]
    fn crouch_again_while_waiting() {
        let world = Ceiling::open();
        world.blocked.set(true);
        let mut pm = body();
        pm.cmd = Command::default().with_crouch();
        update_crouch(&mut pm, &world);
        pm.cmd = Command::default();
        update_crouch(&mut pm, &world);

        pm.cmd = Command::default().with_crouch();
        update_crouch(&mut pm, &world);
        assert_eq!(pm.crouch_state, CrouchState::Crouching);
        assert_eq!(pm.height, 0.9);
    }
}

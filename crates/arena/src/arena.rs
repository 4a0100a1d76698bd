use bhop_common::{ColliderId, LayerMask};
use bhop_kernel::{
    Capsule, CollisionEvent, CollisionFlags, CollisionFrame, DisplacementApplier, MoveRequest,
    MoveResult, OverlapQuery,
};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::surface::{Bounds, Surface};

/// Push-out passes per substep, enough for a corner between three surfaces.
const MAX_PUSH_ITERATIONS: usize = 4;
const MAX_SUBSTEPS: usize = 64;
/// Overlaps shallower than this do not block a stand-up.
const OVERLAP_TOLERANCE: f32 = 1.0e-3;
/// Normals with |y| below this count as side contacts.
const SIDE_NORMAL_Y: f32 = 0.05;

/// A static collision world made of half-space surfaces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    surfaces: Vec<Surface>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, surface: Surface) -> Self {
        self.surfaces.push(surface);
        self
    }

    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    /// An endless floor at y = 0.
    pub fn flat() -> Self {
        Self::new().with(Surface::plane(ColliderId(1), Vec3::Y, Vec3::ZERO))
    }

    /// Floor plus one of each feature: a wall ahead (+Z), a 50 degree ramp to
    /// the right (+X) and a ladder to the left (-X).
    pub fn proving_ground() -> Self {
        let far = 1000.0;
        let ramp_angle = 50.0_f32.to_radians();
        let ramp_normal = Vec3::new(-ramp_angle.sin(), ramp_angle.cos(), 0.0);

        Self::flat()
            .with(
                Surface::plane(ColliderId(2), Vec3::NEG_Z, Vec3::new(0.0, 0.0, 40.0)).bounded(
                    Bounds::new(Vec3::new(-20.0, -far, 30.0), Vec3::new(20.0, far, 41.0)),
                ),
            )
            .with(
                Surface::plane(ColliderId(3), ramp_normal, Vec3::new(10.0, 0.0, 0.0)).bounded(
                    Bounds::new(Vec3::new(10.0, -1.0, -5.0), Vec3::new(20.0, 15.0, 5.0)),
                ),
            )
            .with(
                Surface::plane(ColliderId(4), Vec3::X, Vec3::new(-10.0, 0.0, 0.0))
                    .bounded(Bounds::new(
                        Vec3::new(-11.0, -1.0, -1.0),
                        Vec3::new(-9.0, 8.0, 1.0),
                    ))
                    .ladder(),
            )
    }

    /// Resolve penetrations at `center`, recording contacts into `frame`.
    ///
    /// A climbable ladder (slope limit above its angle) holds the body up and
    /// turns the push-out into height.
    fn push_out(&self, center: &mut Vec3, capsule: Capsule, step: Vec3, frame: &mut CollisionFrame) {
        let mut held = false;
        for _ in 0..MAX_PUSH_ITERATIONS {
            let (a, b) = Capsule {
                center: *center,
                ..capsule
            }
            .segment();

            let deepest = self
                .surfaces
                .iter()
                .filter_map(|s| {
                    s.clearance(a, b, capsule.radius)
                        .filter(|c| *c < 0.0)
                        .map(|c| (s, -c))
                })
                .fold(None::<(&Surface, f32)>, |best, (s, depth)| match best {
                    Some((_, d)) if d >= depth => best,
                    _ => Some((s, depth)),
                });
            let Some((surface, depth)) = deepest else {
                break;
            };

            let mut event = CollisionEvent::from_normal(surface.normal, surface.collider);
            if surface.is_ladder {
                event = event.ladder();
            }

            *center += surface.normal * depth;
            if event.is_ladder && event.angle <= frame.slope_limit {
                if !held {
                    center.y -= step.y.min(0.0);
                    held = true;
                }
                center.y += depth;
            }
            record(frame, event);
        }
    }

    fn overlapping(&self, capsule: Capsule, radius: f32) -> Vec<ColliderId> {
        let (a, b) = capsule.segment();
        let mut ids: Vec<ColliderId> = Vec::new();
        for s in &self.surfaces {
            if s.clearance(a, b, radius).is_some_and(|c| c < 0.0) && !ids.contains(&s.collider) {
                ids.push(s.collider);
            }
        }
        ids
    }
}

fn record(frame: &mut CollisionFrame, event: CollisionEvent) {
    if event.angle <= frame.slope_limit {
        frame.grounded = true;
    }
    frame.flags.insert(if event.normal.y > SIDE_NORMAL_Y {
        CollisionFlags::BELOW
    } else if event.normal.y < -SIDE_NORMAL_Y {
        CollisionFlags::ABOVE
    } else {
        CollisionFlags::SIDES
    });
    if !frame.contacts.iter().any(|c| c.collider == event.collider) {
        frame.contacts.push(event);
    }
}

impl DisplacementApplier for Arena {
    fn apply_displacement(&self, request: &MoveRequest) -> MoveResult {
        let capsule = request.capsule;
        let length = request.displacement.length();
        let substeps = if capsule.radius > 0.0 && length.is_finite() {
            ((length / capsule.radius).ceil() as usize).clamp(1, MAX_SUBSTEPS)
        } else {
            1
        };
        let step = request.displacement / substeps as f32;

        let mut frame = CollisionFrame {
            slope_limit: request.slope_limit,
            ..CollisionFrame::default()
        };
        let mut center = capsule.center;
        for _ in 0..substeps {
            center += step;
            self.push_out(&mut center, capsule, step, &mut frame);
        }

        let settled = Capsule { center, ..capsule };
        frame.nearby = self.overlapping(settled, capsule.radius + request.skin);

        trace!(
            contacts = frame.contacts.len(),
            nearby = frame.nearby.len(),
            substeps,
            "displacement applied"
        );
        MoveResult {
            origin: center,
            frame,
        }
    }
}

impl OverlapQuery for Arena {
    fn capsule_overlap(&self, bottom: Vec3, top: Vec3, radius: f32, mask: LayerMask) -> bool {
        self.surfaces.iter().any(|s| {
            mask.contains(s.layer)
                && s.clearance(bottom, top, radius)
                    .is_some_and(|c| c < -OVERLAP_TOLERANCE)
        })
    }
}

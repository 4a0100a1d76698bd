//! Collaborator interfaces for geometry.
//!
//! The movement core never sweeps or overlaps shapes itself. A host engine (or
//! the reference arena) implements these traits and feeds the results back as
//! a [`CollisionFrame`].

use bhop_common::LayerMask;
use glam::Vec3;

use crate::state::CollisionFrame;

/// Vertical capsule described by its center, total height and radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capsule {
    pub center: Vec3,
    pub height: f32,
    pub radius: f32,
}

impl Capsule {
    /// Centers of the bottom and top hemispheres.
    pub fn segment(&self) -> (Vec3, Vec3) {
        let half = (self.height * 0.5 - self.radius).max(0.0);
        (self.center - Vec3::Y * half, self.center + Vec3::Y * half)
    }
}

/// One displacement the application layer should perform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveRequest {
    pub capsule: Capsule,
    pub displacement: Vec3,
    /// Steepest surface (degrees) the controller treats as ground for this move.
    pub slope_limit: f32,
    /// Inflation used when collecting `CollisionFrame::nearby`.
    pub skin: f32,
}

/// Where the body ended up and what it touched on the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoveResult {
    pub origin: Vec3,
    pub frame: CollisionFrame,
}

/// Capsule overlap test, used by the crouch stand-up check.
pub trait OverlapQuery {
    /// Whether a capsule between hemisphere centers `bottom` and `top` overlaps
    /// any collider on a layer in `mask`.
    fn capsule_overlap(&self, bottom: Vec3, top: Vec3, radius: f32, mask: LayerMask) -> bool;
}

/// Turns a resolved velocity into an actual move and reports the contacts.
pub trait DisplacementApplier {
    fn apply_displacement(&self, request: &MoveRequest) -> MoveResult;
}

/// Everything a movement tick needs from the world.
pub trait CollisionWorld: OverlapQuery + DisplacementApplier {}

impl<T: OverlapQuery + DisplacementApplier + ?Sized> CollisionWorld for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capsule_segment_spans_cylinder() {
        let c = Capsule {
            center: Vec3::new(0.0, 0.9, 0.0),
            height: 1.8,
            radius: 0.45,
        };
        let (bottom, top) = c.segment();
        assert!((bottom.y - 0.45).abs() < 1e-6);
        assert!((top.y - 1.35).abs() < 1e-6);
    }

    #[test]
    fn degenerate_capsule_collapses_to_sphere() {
        let c = Capsule {
            center: Vec3::ZERO,
            height: 0.5,
            radius: 0.45,
        };
        let (bottom, top) = c.segment();
        assert_eq!(bottom, top);
    }
}

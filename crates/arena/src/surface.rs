use bhop_common::ColliderId;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned box of capsule centers for which a surface is solid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }
}

/// A static half-space: everything behind the plane is solid.
///
/// `bounds` limits the surface to a region so walls, ramps and ladders can be
/// finite. Without bounds the half-space extends forever.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub collider: ColliderId,
    /// Unit normal pointing out of the solid.
    pub normal: Vec3,
    /// Plane distance: points `p` with `normal.dot(p) == offset` lie on the surface.
    pub offset: f32,
    pub bounds: Option<Bounds>,
    pub layer: u32,
    pub is_ladder: bool,
}

impl Surface {
    /// Plane through `point` facing `normal`.
    pub fn plane(collider: ColliderId, normal: Vec3, point: Vec3) -> Self {
        let normal = normal.normalize_or_zero();
        Self {
            collider,
            normal,
            offset: normal.dot(point),
            bounds: None,
            layer: 0,
            is_ladder: false,
        }
    }

    pub fn bounded(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn ladder(mut self) -> Self {
        self.is_ladder = true;
        self
    }

    pub fn on_layer(mut self, layer: u32) -> Self {
        self.layer = layer;
        self
    }

    /// Signed gap between a capsule (hemisphere centers `a`, `b`) and the
    /// plane. Negative means the capsule is inside the solid by that much.
    /// `None` when the capsule center is outside `bounds`.
    pub fn clearance(&self, a: Vec3, b: Vec3, radius: f32) -> Option<f32> {
        if let Some(bounds) = self.bounds {
            if !bounds.contains((a + b) * 0.5) {
                return None;
            }
        }
        let nearest = self.normal.dot(a).min(self.normal.dot(b));
        Some(nearest - self.offset - radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_clearance() {
        let floor = Surface::plane(ColliderId(1), Vec3::Y, Vec3::ZERO);
        let a = Vec3::new(0.0, 0.45, 0.0);
        let b = Vec3::new(0.0, 1.35, 0.0);
        assert!(floor.clearance(a, b, 0.45).unwrap().abs() < 1e-6);
        let sunk = floor.clearance(a - Vec3::Y * 0.2, b - Vec3::Y * 0.2, 0.45).unwrap();
        assert!((sunk + 0.2).abs() < 1e-6);
    }

    #[test]
    fn bounds_limit_the_surface() {
        let wall = Surface::plane(ColliderId(2), Vec3::NEG_Z, Vec3::new(0.0, 0.0, 5.0))
            .bounded(Bounds::new(Vec3::new(-1.0, -10.0, 0.0), Vec3::new(1.0, 10.0, 6.0)));
        let inside = Vec3::new(0.0, 1.0, 4.8);
        assert!(wall.clearance(inside, inside, 0.45).unwrap() < 0.0);
        let beside = Vec3::new(3.0, 1.0, 4.8);
        assert!(wall.clearance(beside, beside, 0.45).is_none());
    }

    #[test]
    fn bounds_normalize_corners() {
        let b = Bounds::new(Vec3::ONE, Vec3::NEG_ONE);
        assert_eq!(b.min, Vec3::NEG_ONE);
        assert!(b.contains(Vec3::ZERO));
        assert!(!b.contains(Vec3::splat(2.0)));
    }
}

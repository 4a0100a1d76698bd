use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a networked movement entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

/// A network tick number. Ticks increase monotonically and order all
/// replicate/reconcile traffic.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Tick(pub u32);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    /// The tick after this one.
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    /// Whether this tick is strictly newer than `other`.
    pub fn is_newer_than(self, other: Tick) -> bool {
        self.0 > other.0
    }
}

impl std::fmt::Display for Tick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque handle to a collider owned by the collision provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColliderId(pub u32);

/// Collision layer bitmask used by overlap queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const ALL: LayerMask = LayerMask(u32::MAX);

    /// Layer the moving player capsule itself lives on.
    pub const PLAYER_LAYER: u32 = 6;

    /// Everything except the given layer.
    pub fn all_except(layer: u32) -> Self {
        Self(!layer_bit(layer))
    }

    /// Layers 32 and up fall outside every mask.
    pub fn contains(self, layer: u32) -> bool {
        self.0 & layer_bit(layer) != 0
    }
}

fn layer_bit(layer: u32) -> u32 {
    1u32.checked_shl(layer).unwrap_or(0)
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::ALL
    }
}

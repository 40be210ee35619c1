//! Surface kinds shared by side-collision and ground detection

use serde::{Deserialize, Serialize};

/// Surface tag carried by every obstacle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    /// Plain solid geometry
    #[default]
    Normal,
    /// Solid, but keeps horizontal momentum when stood on
    Ice,
    /// Walkable pad, never blocks sideways movement
    Slime,
    /// Walkable incline, never blocks sideways movement
    Ramp,
}

impl SurfaceKind {
    /// Whether the horizontal collision test treats this surface as a wall.
    ///
    /// Ramps and slime are resolved by the ground probe instead; letting the
    /// resolver block on them makes it fight the ground snap.
    pub fn blocks_horizontal(self) -> bool {
        matches!(self, SurfaceKind::Normal | SurfaceKind::Ice)
    }

    /// Fraction of horizontal velocity lost per second while grounded
    pub fn friction(self) -> f32 {
        match self {
            SurfaceKind::Normal | SurfaceKind::Ramp => 10.0,
            SurfaceKind::Ice => 0.5,
            SurfaceKind::Slime => 20.0,
        }
    }

    /// Upward velocity applied on landing (slime pads bounce)
    pub fn landing_bounce(self) -> f32 {
        match self {
            SurfaceKind::Slime => 12.0,
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walkable_surfaces_do_not_block() {
        assert!(SurfaceKind::Normal.blocks_horizontal());
        assert!(SurfaceKind::Ice.blocks_horizontal());
        assert!(!SurfaceKind::Ramp.blocks_horizontal());
        assert!(!SurfaceKind::Slime.blocks_horizontal());
    }

    #[test]
    fn ice_is_slippery() {
        assert!(SurfaceKind::Ice.friction() < SurfaceKind::Normal.friction());
    }
}

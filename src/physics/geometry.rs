//! Obstacle registry with a two-tier broad phase
//!
//! Large geometry (walls, platforms) is "structural" and returned by every
//! query. Small geometry ("props": crates, pistons, pads) is only returned when
//! its center is near the query point.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::surface::SurfaceKind;

/// Obstacles whose largest full extent exceeds this are structural
pub const STRUCTURAL_EXTENT_THRESHOLD: f32 = 20.0;

/// Axis-aligned box obstacle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub center: Vec3,
    pub half_extents: Vec3,
    #[serde(default)]
    pub surface: SurfaceKind,
    /// Set for moving platforms
    #[serde(default)]
    pub velocity: Option<Vec3>,
}

impl Obstacle {
    pub fn new(center: Vec3, half_extents: Vec3, surface: SurfaceKind) -> Self {
        Self {
            center,
            half_extents,
            surface,
            velocity: None,
        }
    }

    /// Build from a center and full width/height/depth
    pub fn from_size(center: Vec3, size: Vec3, surface: SurfaceKind) -> Self {
        Self::new(center, size * 0.5, surface)
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = Some(velocity);
        self
    }

    pub fn min(&self) -> Vec3 {
        self.center - self.half_extents
    }

    pub fn max(&self) -> Vec3 {
        self.center + self.half_extents
    }

    /// Height of the walkable top at horizontal point (`x`, `z`).
    ///
    /// Ramps incline along their longer horizontal axis from `min.y` up to
    /// `max.y`, climbing away from the world origin. Everything else is flat.
    pub fn top_at(&self, x: f32, z: f32) -> f32 {
        let min = self.min();
        let max = self.max();
        if self.surface != SurfaceKind::Ramp {
            return max.y;
        }

        let (along, center, half) = if self.half_extents.x > self.half_extents.z {
            (x, self.center.x, self.half_extents.x)
        } else {
            (z, self.center.z, self.half_extents.z)
        };
        if half <= 0.0 {
            return max.y;
        }
        let mut t = ((along - center) / half * 0.5 + 0.5).clamp(0.0, 1.0);
        if center < 0.0 {
            t = 1.0 - t;
        }
        min.y + (max.y - min.y) * t
    }

    /// Largest full extent along any axis
    pub fn max_extent(&self) -> f32 {
        self.half_extents.max_element() * 2.0
    }

    pub fn is_structural(&self) -> bool {
        self.max_extent() > STRUCTURAL_EXTENT_THRESHOLD
    }
}

/// Stable handle returned by [`GeometryIndex::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObstacleId {
    tier: Tier,
    index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Tier {
    Structural,
    Prop,
}

/// Source of candidate obstacles for collision tests
pub trait GeometryQuery {
    /// All structural obstacles plus props whose center is within `radius`
    fn query(&self, center: Vec3, radius: f32) -> Vec<&Obstacle>;
}

/// Size-partitioned obstacle store
#[derive(Debug, Clone, Default)]
pub struct GeometryIndex {
    structural: Vec<Obstacle>,
    props: Vec<Obstacle>,
}

impl GeometryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_obstacles(obstacles: impl IntoIterator<Item = Obstacle>) -> Self {
        let mut index = Self::new();
        for obstacle in obstacles {
            index.register(obstacle);
        }
        index
    }

    /// Add an obstacle; its tier is fixed from here on
    pub fn register(&mut self, obstacle: Obstacle) -> ObstacleId {
        if obstacle.is_structural() {
            self.structural.push(obstacle);
            ObstacleId {
                tier: Tier::Structural,
                index: self.structural.len() - 1,
            }
        } else {
            self.props.push(obstacle);
            ObstacleId {
                tier: Tier::Prop,
                index: self.props.len() - 1,
            }
        }
    }

    pub fn get(&self, id: ObstacleId) -> Option<&Obstacle> {
        match id.tier {
            Tier::Structural => self.structural.get(id.index),
            Tier::Prop => self.props.get(id.index),
        }
    }

    /// Change a moving platform's velocity. Returns false for an unknown id.
    pub fn set_velocity(&mut self, id: ObstacleId, velocity: Option<Vec3>) -> bool {
        let slot = match id.tier {
            Tier::Structural => self.structural.get_mut(id.index),
            Tier::Prop => self.props.get_mut(id.index),
        };
        match slot {
            Some(obstacle) => {
                obstacle.velocity = velocity;
                true
            }
            None => false,
        }
    }

    /// Move every obstacle that has a velocity by `velocity * dt`
    pub fn advance(&mut self, dt: f32) {
        for obstacle in self.structural.iter_mut().chain(self.props.iter_mut()) {
            if let Some(velocity) = obstacle.velocity {
                obstacle.center += velocity * dt;
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Obstacle> {
        self.structural.iter().chain(self.props.iter())
    }

    pub fn len(&self) -> usize {
        self.structural.len() + self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn structural_count(&self) -> usize {
        self.structural.len()
    }

    pub fn prop_count(&self) -> usize {
        self.props.len()
    }
}

impl GeometryQuery for GeometryIndex {
    fn query(&self, center: Vec3, radius: f32) -> Vec<&Obstacle> {
        let radius_sq = radius * radius;
        let mut result: Vec<&Obstacle> = self.structural.iter().collect();
        result.extend(
            self.props
                .iter()
                .filter(|prop| prop.center.distance_squared(center) < radius_sq),
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crate_at(x: f32, z: f32) -> Obstacle {
        Obstacle::from_size(Vec3::new(x, 2.0, z), Vec3::splat(4.0), SurfaceKind::Normal)
    }

    fn wall() -> Obstacle {
        Obstacle::from_size(
            Vec3::new(0.0, 5.0, -50.0),
            Vec3::new(100.0, 10.0, 2.0),
            SurfaceKind::Normal,
        )
    }

    #[test]
    fn classifies_by_max_extent() {
        let mut index = GeometryIndex::new();
        index.register(wall());
        index.register(crate_at(10.0, 10.0));
        assert_eq!(index.structural_count(), 1);
        assert_eq!(index.prop_count(), 1);
    }

    #[test]
    fn query_always_returns_structural() {
        let index = GeometryIndex::from_obstacles([wall(), crate_at(100.0, 100.0)]);
        let found = index.query(Vec3::ZERO, 5.0);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].half_extents.x, 50.0);
    }

    #[test]
    fn query_filters_props_by_distance() {
        let index = GeometryIndex::from_obstacles([crate_at(10.0, 0.0), crate_at(40.0, 0.0)]);
        let found = index.query(Vec3::new(0.0, 2.0, 0.0), 20.0);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].center.x, 10.0);
    }

    #[test]
    fn empty_world_returns_nothing() {
        let index = GeometryIndex::new();
        assert!(index.query(Vec3::ZERO, 100.0).is_empty());
    }

    #[test]
    fn advance_moves_only_platforms_with_velocity() {
        let mut index = GeometryIndex::new();
        let still = index.register(crate_at(0.0, 0.0));
        let moving = index.register(crate_at(5.0, 0.0));
        assert!(index.set_velocity(moving, Some(Vec3::new(0.0, 2.0, 0.0))));

        index.advance(0.5);

        assert_eq!(index.get(still).map(|o| o.center.y), Some(2.0));
        assert_eq!(index.get(moving).map(|o| o.center.y), Some(3.0));
        // Tier does not change when a platform moves
        assert_eq!(index.prop_count(), 2);
    }
}

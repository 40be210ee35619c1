//! Ground detection and per-tick actor integration
//!
//! The resolver only handles sideways blocking. Standing on things (floor,
//! crates, ramps, slime pads) is a downward probe from the eye position.

use glam::{Vec2, Vec3};

use super::geometry::GeometryQuery;
use super::resolver::{ActorShape, MovementResolver, BROAD_PHASE_RADIUS, SKIN};
use super::surface::SurfaceKind;

/// Downward gravity in units per second squared
pub const GRAVITY: f32 = 30.0;

/// Highest walkable surface under the actor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundHit {
    pub height: f32,
    pub surface: SurfaceKind,
}

/// Cast a ray straight down from `eye` and return the highest top face at or
/// below the eye. Ramp tops are sampled on their incline. Falls back to the
/// arena floor.
pub fn probe<G>(geometry: &G, eye: Vec3, floor_y: f32) -> GroundHit
where
    G: GeometryQuery + ?Sized,
{
    let mut best = GroundHit {
        height: floor_y,
        surface: SurfaceKind::Normal,
    };

    for obstacle in geometry.query(eye, BROAD_PHASE_RADIUS) {
        let min = obstacle.min();
        let max = obstacle.max();

        let under_ray = eye.x >= min.x && eye.x <= max.x && eye.z >= min.z && eye.z <= max.z;
        if !under_ray {
            continue;
        }
        let top = obstacle.top_at(eye.x, eye.z);
        if top <= eye.y && top > best.height {
            best = GroundHit {
                height: top,
                surface: obstacle.surface,
            };
        }
    }

    best
}

/// Client-side movement state of one actor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActorState {
    /// Eye-level reference point
    pub position: Vec3,
    pub vertical_velocity: f32,
    pub horizontal_velocity: Vec2,
    pub on_ground: bool,
    pub surface: SurfaceKind,
}

impl ActorState {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            vertical_velocity: 0.0,
            horizontal_velocity: Vec2::ZERO,
            on_ground: false,
            surface: SurfaceKind::Normal,
        }
    }

    /// Apply gravity, snap onto `ground` when falling through it, then apply
    /// the friction of whatever surface the actor stands on.
    pub fn settle(&mut self, ground: GroundHit, shape: &ActorShape, dt: f32) {
        self.vertical_velocity -= GRAVITY * dt;
        self.position.y += self.vertical_velocity * dt;

        // Rest a hair above the surface so the feet never register as inside it
        let rest_height = ground.height + shape.eye_height + SKIN;
        if self.position.y <= rest_height && self.vertical_velocity <= 0.0 {
            self.position.y = rest_height;
            self.on_ground = true;
            self.surface = ground.surface;
            self.vertical_velocity = ground.surface.landing_bounce();
        } else {
            self.on_ground = false;
        }

        if self.on_ground {
            let keep = (1.0 - self.surface.friction() * dt).max(0.0);
            self.horizontal_velocity *= keep;
        }
    }

    /// One simulation tick: resolve the horizontal move, then settle vertically
    pub fn step<G>(&mut self, resolver: &MovementResolver, geometry: &G, dt: f32)
    where
        G: GeometryQuery + ?Sized,
    {
        let displacement = Vec3::new(
            self.horizontal_velocity.x * dt,
            0.0,
            self.horizontal_velocity.y * dt,
        );
        self.position = resolver.resolve(self.position, displacement, geometry);

        let floor_y = resolver.bounds.map(|b| b.floor_y).unwrap_or(0.0);
        let ground = probe(geometry, self.position, floor_y);
        self.settle(ground, &resolver.shape, dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::geometry::{GeometryIndex, Obstacle};
    use crate::physics::resolver::WorldBounds;

    fn resolver() -> MovementResolver {
        MovementResolver::new(ActorShape::default(), WorldBounds::square(150.0))
    }

    #[test]
    fn probe_falls_back_to_floor() {
        let world = GeometryIndex::new();
        let hit = probe(&world, Vec3::new(0.0, 1.6, 0.0), 0.0);
        assert_eq!(hit.height, 0.0);
        assert_eq!(hit.surface, SurfaceKind::Normal);
    }

    #[test]
    fn probe_sees_walkable_surfaces() {
        let world = GeometryIndex::from_obstacles([Obstacle::from_size(
            Vec3::new(0.0, 0.5, 0.0),
            Vec3::new(6.0, 1.0, 6.0),
            SurfaceKind::Slime,
        )]);
        let hit = probe(&world, Vec3::new(1.0, 3.0, 1.0), 0.0);
        assert_eq!(hit.height, 1.0);
        assert_eq!(hit.surface, SurfaceKind::Slime);
    }

    #[test]
    fn probe_ignores_surfaces_above_the_eye() {
        let world = GeometryIndex::from_obstacles([Obstacle::from_size(
            Vec3::new(0.0, 25.0, 0.0),
            Vec3::new(40.0, 2.0, 40.0),
            SurfaceKind::Ice,
        )]);
        let hit = probe(&world, Vec3::new(0.0, 1.6, 0.0), 0.0);
        assert_eq!(hit.height, 0.0);
    }

    #[test]
    fn falling_actor_lands_on_crate() {
        let world = GeometryIndex::from_obstacles([Obstacle::from_size(
            Vec3::new(0.0, 2.0, 0.0),
            Vec3::splat(4.0),
            SurfaceKind::Normal,
        )]);
        let r = resolver();
        let mut actor = ActorState::new(Vec3::new(0.0, 8.0, 0.0));
        for _ in 0..120 {
            actor.step(&r, &world, 1.0 / 60.0);
        }
        assert!(actor.on_ground);
        assert!((actor.position.y - (4.0 + 1.6)).abs() < 1e-2);
        assert_eq!(actor.position.x, 0.0);
    }

    #[test]
    fn ice_keeps_more_momentum_than_normal_ground() {
        let shape = ActorShape::default();
        let mut on_ice = ActorState::new(Vec3::new(0.0, 1.6, 0.0));
        let mut on_grass = on_ice;
        on_ice.horizontal_velocity = Vec2::new(10.0, 0.0);
        on_grass.horizontal_velocity = Vec2::new(10.0, 0.0);

        let ice = GroundHit { height: 0.0, surface: SurfaceKind::Ice };
        let grass = GroundHit { height: 0.0, surface: SurfaceKind::Normal };
        for _ in 0..10 {
            on_ice.settle(ice, &shape, 1.0 / 60.0);
            on_grass.settle(grass, &shape, 1.0 / 60.0);
        }
        assert!(on_ice.horizontal_velocity.x > on_grass.horizontal_velocity.x);
        assert_eq!(on_ice.surface, SurfaceKind::Ice);
    }

    #[test]
    fn actor_walks_up_a_ramp() {
        // 48 long in z, rising from y=0 at z=36 to y=24 at z=84
        let world = GeometryIndex::from_obstacles([Obstacle::from_size(
            Vec3::new(0.0, 12.0, 60.0),
            Vec3::new(10.0, 24.0, 48.0),
            SurfaceKind::Ramp,
        )]);
        let r = resolver();
        let mut actor = ActorState::new(Vec3::new(0.0, 1.6, 30.0));
        let mut last_y = actor.position.y;
        for _ in 0..240 {
            actor.horizontal_velocity = Vec2::new(0.0, 10.0);
            actor.step(&r, &world, 1.0 / 60.0);
            assert!(actor.position.y + 1e-3 >= last_y);
            last_y = actor.position.y;
        }
        assert!(actor.position.z > 65.0 && actor.position.z < 84.0);
        assert!(actor.on_ground);
        assert_eq!(actor.surface, SurfaceKind::Ramp);
        let expected = (actor.position.z - 36.0) / 48.0 * 24.0 + 1.6;
        assert!((actor.position.y - expected).abs() < 0.1);
    }

    #[test]
    fn ramp_climbs_away_from_origin() {
        let north = Obstacle::from_size(Vec3::new(0.0, 12.0, 60.0), Vec3::new(10.0, 24.0, 48.0), SurfaceKind::Ramp);
        let south = Obstacle::from_size(Vec3::new(0.0, 12.0, -60.0), Vec3::new(10.0, 24.0, 48.0), SurfaceKind::Ramp);
        assert_eq!(north.top_at(0.0, 36.0), 0.0);
        assert_eq!(north.top_at(0.0, 84.0), 24.0);
        assert_eq!(south.top_at(0.0, -84.0), 24.0);
        assert_eq!(south.top_at(0.0, -36.0), 0.0);

        let crate_box = Obstacle::from_size(Vec3::new(0.0, 1.0, 0.0), Vec3::splat(2.0), SurfaceKind::Normal);
        assert_eq!(crate_box.top_at(0.5, 0.5), 2.0);
    }
}

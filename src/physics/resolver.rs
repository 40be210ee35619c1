//! Continuous-collision movement resolver
//!
//! Turns a desired displacement into a safe position: depenetrate the start,
//! then sweep the displacement against nearby boxes, bisecting for the time
//! of impact and sliding the remainder along the hit face.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::geometry::{GeometryQuery, Obstacle};

/// Maximum sweep/slide passes per resolve
pub const MAX_SLIDES: usize = 3;
/// Bisection steps when searching for the time of impact
pub const TOI_REFINEMENT_STEPS: usize = 4;
/// Remaining displacement below this length is dropped
pub const MOVE_EPSILON: f32 = 1e-4;
/// Remaining fraction at or below this ends the slide loop
pub const MIN_REMAINING_FRACTION: f32 = 1e-3;
/// Gap left between the actor and a face it was pushed onto
pub const SKIN: f32 = 1e-3;
/// Candidate radius for the broad phase around the start position
pub const BROAD_PHASE_RADIUS: f32 = 30.0;

/// Cylindrical actor footprint, measured from the eye-level reference point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActorShape {
    pub radius: f32,
    /// Distance from the eye down to the feet
    pub eye_height: f32,
    /// Distance from the eye up to the top of the head
    pub head_clearance: f32,
}

impl Default for ActorShape {
    fn default() -> Self {
        Self {
            radius: 0.5,
            eye_height: 1.6,
            head_clearance: 0.2,
        }
    }
}

/// Horizontal play area; everything outside is solid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_z: f32,
    pub max_z: f32,
    /// Height of the arena floor
    #[serde(default)]
    pub floor_y: f32,
}

impl WorldBounds {
    /// Square arena centred on the origin
    pub fn square(half_extent: f32) -> Self {
        Self {
            min_x: -half_extent,
            max_x: half_extent,
            min_z: -half_extent,
            max_z: half_extent,
            floor_y: 0.0,
        }
    }
}

/// Horizontal bounds of an obstacle grown by the actor radius
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpandedBox {
    pub min_x: f32,
    pub max_x: f32,
    pub min_z: f32,
    pub max_z: f32,
}

/// Result of a single collision test
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Contact {
    Clear,
    Obstacle(ExpandedBox),
    WorldBound,
}

impl Contact {
    pub fn is_hit(&self) -> bool {
        !matches!(self, Contact::Clear)
    }
}

/// Movement resolver for one actor shape inside one arena
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MovementResolver {
    pub shape: ActorShape,
    pub bounds: Option<WorldBounds>,
}

impl MovementResolver {
    pub fn new(shape: ActorShape, bounds: WorldBounds) -> Self {
        Self {
            shape,
            bounds: Some(bounds),
        }
    }

    /// Resolve a desired displacement from `start` into a final position
    pub fn resolve<G>(&self, start: Vec3, displacement: Vec3, geometry: &G) -> Vec3
    where
        G: GeometryQuery + ?Sized,
    {
        let candidates = geometry.query(start, BROAD_PHASE_RADIUS);

        let mut position = self.depenetrate_among(start, &candidates);
        let mut remaining = displacement;

        for _ in 0..MAX_SLIDES {
            if remaining.length() < MOVE_EPSILON {
                break;
            }

            let target = position + remaining;
            if !self.check(target, &candidates).is_hit() {
                position = target;
                break;
            }

            // Bisect on the in/out answer of the collision test
            let mut t_min = 0.0_f32;
            let mut t_max = 1.0_f32;
            for _ in 0..TOI_REFINEMENT_STEPS {
                let t_mid = (t_min + t_max) * 0.5;
                if self.check(position + remaining * t_mid, &candidates).is_hit() {
                    t_max = t_mid;
                } else {
                    t_min = t_mid;
                }
            }

            let impact = position + remaining * t_max;
            let normal = self.contact_normal(impact, self.check(impact, &candidates));

            position += remaining * t_min;

            let fraction_left = 1.0 - t_min;
            if fraction_left <= MIN_REMAINING_FRACTION {
                break;
            }

            let mut slide = remaining * fraction_left;
            let into_surface = slide.dot(normal);
            if into_surface < 0.0 {
                slide -= normal * into_surface;
            }
            remaining = slide;
        }

        position
    }

    /// Push `position` out of the first obstacle it overlaps
    pub fn depenetrate<G>(&self, position: Vec3, geometry: &G) -> Vec3
    where
        G: GeometryQuery + ?Sized,
    {
        let candidates = geometry.query(position, BROAD_PHASE_RADIUS);
        self.depenetrate_among(position, &candidates)
    }

    fn depenetrate_among(&self, mut position: Vec3, candidates: &[&Obstacle]) -> Vec3 {
        match self.check(position, candidates) {
            Contact::Clear => position,
            Contact::WorldBound => self.clamp_to_bounds(position),
            Contact::Obstacle(expanded) => {
                let d_left = position.x - expanded.min_x;
                let d_right = expanded.max_x - position.x;
                let d_back = position.z - expanded.min_z;
                let d_front = expanded.max_z - position.z;

                let nearest = d_left.min(d_right).min(d_back).min(d_front);

                if nearest == d_left {
                    position.x = expanded.min_x - SKIN;
                } else if nearest == d_right {
                    position.x = expanded.max_x + SKIN;
                } else if nearest == d_back {
                    position.z = expanded.min_z - SKIN;
                } else {
                    position.z = expanded.max_z + SKIN;
                }
                position
            }
        }
    }

    fn clamp_to_bounds(&self, mut position: Vec3) -> Vec3 {
        if let Some(bounds) = self.bounds {
            let inset = self.shape.radius + SKIN;
            position.x = position.x.clamp(bounds.min_x + inset, bounds.max_x - inset);
            position.z = position.z.clamp(bounds.min_z + inset, bounds.max_z - inset);
        }
        position
    }

    /// Test the actor at `position` against candidate boxes and the bounds
    pub fn check(&self, position: Vec3, candidates: &[&Obstacle]) -> Contact {
        let r = self.shape.radius;
        let feet = position.y - self.shape.eye_height;
        let head = position.y + self.shape.head_clearance;

        for obstacle in candidates {
            if !obstacle.surface.blocks_horizontal() {
                continue;
            }

            let min = obstacle.min();
            let max = obstacle.max();

            if position.x - r < max.x
                && position.x + r > min.x
                && feet < max.y
                && head > min.y
                && position.z - r < max.z
                && position.z + r > min.z
            {
                return Contact::Obstacle(ExpandedBox {
                    min_x: min.x - r,
                    max_x: max.x + r,
                    min_z: min.z - r,
                    max_z: max.z + r,
                });
            }
        }

        if let Some(bounds) = self.bounds {
            if position.x - r < bounds.min_x
                || position.x + r > bounds.max_x
                || position.z - r < bounds.min_z
                || position.z + r > bounds.max_z
            {
                return Contact::WorldBound;
            }
        }

        Contact::Clear
    }

    /// Face normal at an impact point
    fn contact_normal(&self, impact: Vec3, contact: Contact) -> Vec3 {
        match contact {
            Contact::Obstacle(expanded) => {
                let center_x = (expanded.min_x + expanded.max_x) * 0.5;
                let center_z = (expanded.min_z + expanded.max_z) * 0.5;
                let half_w = (expanded.max_x - expanded.min_x) * 0.5;
                let half_d = (expanded.max_z - expanded.min_z) * 0.5;

                let px = (impact.x - center_x) / half_w;
                let pz = (impact.z - center_z) / half_d;

                if px.abs() > pz.abs() {
                    Vec3::new(px.signum(), 0.0, 0.0)
                } else {
                    Vec3::new(0.0, 0.0, pz.signum())
                }
            }
            Contact::WorldBound => {
                let r = self.shape.radius;
                match self.bounds {
                    Some(b) if impact.x - r < b.min_x => Vec3::X,
                    Some(b) if impact.x + r > b.max_x => Vec3::NEG_X,
                    Some(b) if impact.z - r < b.min_z => Vec3::Z,
                    Some(b) if impact.z + r > b.max_z => Vec3::NEG_Z,
                    _ => Vec3::Y,
                }
            }
            Contact::Clear => Vec3::Y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::geometry::GeometryIndex;
    use crate::physics::surface::SurfaceKind;
    use proptest::prelude::*;

    const EYE: f32 = 1.6;

    fn crate_at(x: f32, z: f32) -> Obstacle {
        Obstacle::from_size(Vec3::new(x, 2.0, z), Vec3::splat(4.0), SurfaceKind::Normal)
    }

    fn resolver() -> MovementResolver {
        MovementResolver::new(ActorShape::default(), WorldBounds::square(150.0))
    }

    #[test]
    fn free_move_is_committed() {
        let world = GeometryIndex::new();
        let end = resolver().resolve(Vec3::new(0.0, EYE, 0.0), Vec3::new(3.0, 0.0, 1.0), &world);
        assert_eq!(end, Vec3::new(3.0, EYE, 1.0));
    }

    #[test]
    fn blocked_move_stops_before_the_wall() {
        let world = GeometryIndex::from_obstacles([crate_at(5.0, 0.0)]);
        let r = resolver();
        let end = r.resolve(Vec3::new(0.0, EYE, 0.0), Vec3::new(6.0, 0.0, 0.0), &world);

        // Expanded face is at x = 2.5
        assert!(end.x < 2.5, "ended inside the box at {end:?}");
        assert!(end.x > 1.5);
        let candidates = world.query(end, 10.0);
        assert!(!r.check(end, &candidates).is_hit());
    }

    #[test]
    fn diagonal_move_slides_along_face() {
        let world = GeometryIndex::from_obstacles([crate_at(5.0, 0.0)]);
        let end = resolver().resolve(Vec3::new(0.0, EYE, 0.0), Vec3::new(6.0, 0.0, 1.5), &world);
        assert!(end.x < 2.5);
        // The z component survives the slide
        assert!((end.z - 1.5).abs() < 1e-4, "expected slide along z, got {end:?}");
    }

    #[test]
    fn ramps_and_slime_do_not_block() {
        let world = GeometryIndex::from_obstacles([
            Obstacle::from_size(Vec3::new(5.0, 1.0, 0.0), Vec3::splat(4.0), SurfaceKind::Ramp),
            Obstacle::from_size(Vec3::new(-5.0, 0.5, 0.0), Vec3::splat(4.0), SurfaceKind::Slime),
        ]);
        let r = resolver();
        let start = Vec3::new(0.0, EYE, 0.0);
        assert_eq!(r.resolve(start, Vec3::new(6.0, 0.0, 0.0), &world), Vec3::new(6.0, EYE, 0.0));
        assert_eq!(r.resolve(start, Vec3::new(-6.0, 0.0, 0.0), &world), Vec3::new(-6.0, EYE, 0.0));
    }

    #[test]
    fn obstacle_above_the_head_does_not_block() {
        // Platform bottom at 24, actor head at 23.99
        let platform = Obstacle::from_size(
            Vec3::new(0.0, 25.0, 0.0),
            Vec3::new(10.0, 2.0, 10.0),
            SurfaceKind::Ice,
        );
        let world = GeometryIndex::from_obstacles([platform]);
        let start = Vec3::new(-8.0, 23.79, 0.0);
        let end = resolver().resolve(start, Vec3::new(8.0, 0.0, 0.0), &world);
        assert_eq!(end, Vec3::new(0.0, 23.79, 0.0));
    }

    #[test]
    fn world_bounds_slide_inward() {
        let world = GeometryIndex::new();
        let end = resolver().resolve(Vec3::new(148.0, EYE, 0.0), Vec3::new(5.0, 0.0, 5.0), &world);
        assert!(end.x + 0.5 <= 150.0);
        assert!(end.z > 4.0);
    }

    #[test]
    fn depenetration_pushes_to_nearest_face() {
        let world = GeometryIndex::from_obstacles([crate_at(0.0, 0.0)]);
        let r = resolver();
        // 0.5 inside the +x expanded face (2.5)
        let pushed = r.depenetrate(Vec3::new(2.0, EYE, 0.3), &world);
        assert!((pushed.x - (2.5 + SKIN)).abs() < 1e-6);
        assert_eq!(pushed.z, 0.3);
    }

    #[test]
    fn depenetration_is_idempotent() {
        let world = GeometryIndex::from_obstacles([crate_at(0.0, 0.0)]);
        let r = resolver();
        let start = Vec3::new(-1.0, EYE, 1.8);
        let first = r.depenetrate(start, &world);
        let again = r.depenetrate(start, &world);
        assert_eq!(first, again);
        assert_eq!(r.depenetrate(first, &world), first);
    }

    #[test]
    fn depenetration_tie_prefers_first_axis() {
        let world = GeometryIndex::from_obstacles([crate_at(0.0, 0.0)]);
        // Dead centre: all four depths equal, -x wins
        let pushed = resolver().depenetrate(Vec3::new(0.0, EYE, 0.0), &world);
        assert!((pushed.x - (-2.5 - SKIN)).abs() < 1e-6);
        assert_eq!(pushed.z, 0.0);
    }

    proptest! {
        #[test]
        fn resolved_position_never_overlaps(
            start_x in -60.0f32..60.0,
            start_z in -60.0f32..60.0,
            dx in -4.0f32..4.0,
            dz in -4.0f32..4.0,
        ) {
            let world = GeometryIndex::from_obstacles([
                crate_at(10.0, 10.0),
                crate_at(-15.0, -20.0),
                crate_at(25.0, -5.0),
                crate_at(-5.0, 25.0),
                crate_at(3.0, 0.0),
                Obstacle::from_size(Vec3::new(0.0, 5.0, -50.0), Vec3::new(100.0, 10.0, 2.0), SurfaceKind::Normal),
            ]);
            let r = resolver();
            let start = Vec3::new(start_x, EYE, start_z);
            let all: Vec<&Obstacle> = world.iter().collect();
            prop_assume!(!r.check(start, &all).is_hit());

            let end = r.resolve(start, Vec3::new(dx, 0.0, dz), &world);
            prop_assert!(!r.check(end, &all).is_hit(), "end {:?} overlaps", end);
        }
    }
}

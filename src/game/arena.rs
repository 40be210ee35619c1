//! Arena layout: obstacles, respawn ring, weapon pickup locations
//!
//! The built-in layout is used unless `ARENA_PATH` points at a JSON file
//! with the same shape.

use std::path::Path;

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::pickup::PickupSpawn;
use super::player::Pose;
use crate::physics::{ActorShape, GeometryIndex, MovementResolver, Obstacle, SurfaceKind, WorldBounds};
use crate::ws::protocol::WeaponKind;

/// Arena loading errors
#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    #[error("Failed to read arena file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse arena file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid arena: {0}")]
    Invalid(&'static str),
}

/// Where players reappear: a ring around the center, split into sectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RespawnZones {
    /// Sector centers in degrees; empty means anywhere on the ring
    pub sector_angles_deg: Vec<f32>,
    /// Random angular offset around a sector center, radians
    pub jitter_rad: f32,
    pub min_radius: f32,
    pub max_radius: f32,
    /// Eye height of a fresh spawn
    pub spawn_height: f32,
}

impl RespawnZones {
    /// Random point on the ring as (x, z)
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> (f32, f32) {
        let angle = if self.sector_angles_deg.is_empty() {
            rng.gen_range(0.0..std::f32::consts::TAU)
        } else {
            let sector = self.sector_angles_deg[rng.gen_range(0..self.sector_angles_deg.len())];
            let jitter = if self.jitter_rad > 0.0 {
                rng.gen_range(-self.jitter_rad..=self.jitter_rad)
            } else {
                0.0
            };
            sector.to_radians() + jitter
        };
        let radius = rng.gen_range(self.min_radius..=self.max_radius);
        (angle.cos() * radius, angle.sin() * radius)
    }
}

/// Complete arena description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaConfig {
    pub bounds: WorldBounds,
    #[serde(default)]
    pub actor: ActorShape,
    pub obstacles: Vec<Obstacle>,
    pub respawn: RespawnZones,
    pub pickups: Vec<PickupSpawn>,
}

impl ArenaConfig {
    /// Load and validate a JSON arena file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArenaError> {
        let raw = std::fs::read_to_string(path)?;
        let arena: ArenaConfig = serde_json::from_str(&raw)?;
        arena.validate()?;
        Ok(arena)
    }

    pub fn validate(&self) -> Result<(), ArenaError> {
        let b = &self.bounds;
        if !(b.min_x < b.max_x && b.min_z < b.max_z) {
            return Err(ArenaError::Invalid("bounds are empty"));
        }
        let r = &self.respawn;
        if !(r.min_radius >= 0.0 && r.min_radius <= r.max_radius) {
            return Err(ArenaError::Invalid("respawn radius range is empty"));
        }
        if !(r.jitter_rad >= 0.0 && r.jitter_rad.is_finite()) {
            return Err(ArenaError::Invalid("respawn jitter must be non-negative"));
        }
        if self
            .obstacles
            .iter()
            .any(|o| o.half_extents.min_element() <= 0.0)
        {
            return Err(ArenaError::Invalid("obstacle with non-positive size"));
        }
        let inside = |x: f32, z: f32| x >= b.min_x && x <= b.max_x && z >= b.min_z && z <= b.max_z;
        if self.pickups.iter().any(|p| !inside(p.x, p.z)) {
            return Err(ArenaError::Invalid("pickup outside bounds"));
        }
        Ok(())
    }

    pub fn geometry(&self) -> GeometryIndex {
        GeometryIndex::from_obstacles(self.obstacles.iter().copied())
    }

    pub fn resolver(&self) -> MovementResolver {
        MovementResolver::new(self.actor, self.bounds)
    }

    /// Random respawn pose, pushed out of any prop it lands in
    pub fn spawn_point<R: Rng + ?Sized>(&self, geometry: &GeometryIndex, rng: &mut R) -> Pose {
        let (x, z) = self.respawn.sample(rng);
        let eye = Vec3::new(x, self.bounds.floor_y + self.respawn.spawn_height, z);
        let p = self.resolver().depenetrate(eye, geometry);
        Pose {
            x: p.x,
            y: p.y,
            z: p.z,
            // face the middle of the arena
            rotation: (-p.x).atan2(-p.z),
        }
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        let mut obstacles = Vec::new();

        // crates
        for (x, z) in [(10.0, 10.0), (-15.0, -20.0), (25.0, -5.0), (-5.0, 25.0)] {
            obstacles.push(Obstacle::from_size(
                Vec3::new(x, 2.0, z),
                Vec3::splat(4.0),
                SurfaceKind::Normal,
            ));
        }

        // pistons
        for step in 0..6 {
            let angle = (step as f32 * 60.0).to_radians();
            obstacles.push(Obstacle::from_size(
                Vec3::new(angle.cos() * 110.0, 4.0, angle.sin() * 110.0),
                Vec3::new(6.0, 8.0, 6.0),
                SurfaceKind::Normal,
            ));
        }

        // center pedestal
        obstacles.push(Obstacle::from_size(
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(6.0, 2.0, 6.0),
            SurfaceKind::Normal,
        ));

        // slime pads
        for (x, z) in [(0.0, -30.0), (30.0, 30.0), (-30.0, 30.0)] {
            obstacles.push(Obstacle::from_size(
                Vec3::new(x, 0.5, z),
                Vec3::new(8.0, 1.0, 8.0),
                SurfaceKind::Slime,
            ));
        }

        // tier 2 ice ring
        for (center, size) in [
            (Vec3::new(80.0, 25.0, 0.0), Vec3::new(30.0, 2.0, 120.0)),
            (Vec3::new(-80.0, 25.0, 0.0), Vec3::new(30.0, 2.0, 120.0)),
            (Vec3::new(0.0, 25.0, 80.0), Vec3::new(120.0, 2.0, 30.0)),
            (Vec3::new(0.0, 25.0, -80.0), Vec3::new(120.0, 2.0, 30.0)),
        ] {
            obstacles.push(Obstacle::from_size(center, size, SurfaceKind::Ice));
        }

        // ramps up to tier 2, climbing outward onto the ice ring
        for (x, z) in [(40.0, 60.0), (-40.0, -60.0)] {
            obstacles.push(Obstacle::from_size(
                Vec3::new(x, 12.0, z),
                Vec3::new(10.0, 24.0, 48.0),
                SurfaceKind::Ramp,
            ));
        }

        // tier 3 sniper decks
        for z in [-140.0, 140.0] {
            obstacles.push(Obstacle::from_size(
                Vec3::new(0.0, 46.0, z),
                Vec3::new(60.0, 2.0, 16.0),
                SurfaceKind::Normal,
            ));
        }

        let pickup = |x: f32, y: f32, z: f32, weapon: WeaponKind| PickupSpawn { x, y, z, weapon };

        Self {
            bounds: WorldBounds::square(150.0),
            actor: ActorShape::default(),
            obstacles,
            respawn: RespawnZones {
                sector_angles_deg: vec![30.0, 90.0, 150.0, 210.0, 270.0, 330.0],
                jitter_rad: 0.175,
                min_radius: 125.0,
                max_radius: 140.0,
                spawn_height: 5.0,
            },
            pickups: vec![
                pickup(50.0, 1.5, 0.0, WeaponKind::Ak47),
                pickup(-50.0, 1.5, 0.0, WeaponKind::Pistol),
                pickup(0.0, 1.5, 50.0, WeaponKind::Ak47),
                pickup(0.0, 1.5, -50.0, WeaponKind::Pistol),
                pickup(80.0, 26.5, 0.0, WeaponKind::Sniper),
                pickup(-80.0, 26.5, 0.0, WeaponKind::Sniper),
                pickup(0.0, 47.0, -140.0, WeaponKind::Sniper),
                pickup(0.0, 47.0, 140.0, WeaponKind::Sniper),
                pickup(0.0, 3.0, 0.0, WeaponKind::Ak47),
            ],
        }
    }
}

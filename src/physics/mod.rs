//! Client-side movement: obstacle index, swept collision resolver, ground probe
//!
//! Clients run this every frame for the actor they control. The room server
//! only uses it to keep respawn points out of props; it never re-simulates a
//! client's movement.

pub mod geometry;
pub mod ground;
pub mod resolver;
pub mod surface;

pub use geometry::{GeometryIndex, GeometryQuery, Obstacle, ObstacleId};
pub use ground::{ActorState, GroundHit};
pub use resolver::{ActorShape, Contact, MovementResolver, WorldBounds};
pub use surface::SurfaceKind;

//! Room authority: lifecycle, players, combat, pickups

pub mod arena;
pub mod combat;
pub mod error;
pub mod lifecycle;
pub mod pickup;
pub mod player;
pub mod registry;
pub mod room;
pub mod session;
pub mod weapons;

pub use arena::{ArenaConfig, ArenaError};
pub use error::GameError;
pub use lifecycle::RoomPhase;
pub use registry::RoomRegistry;
pub use room::{RoomSettings, RoomState, RoomSummary};
pub use session::{GameRoom, RoomCommand, RoomHandle};

//! Arena Server - authoritative room server for a browser arena shooter
//!
//! - Rooms with a lobby, synchronized countdown and timed matches
//! - Server-validated damage, kills, respawns and weapon pickups
//! - Collision resolution shared with clients through the `physics` module

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod physics;
pub mod util;
pub mod ws;

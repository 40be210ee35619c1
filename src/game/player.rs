//! Player state and the per-room player directory

use std::collections::HashMap;

use uuid::Uuid;

use crate::ws::protocol::{PlayerInfo, WeaponKind};

/// Maximum players in a room, one per palette color
pub const MAX_ROOM_PLAYERS: usize = 6;

/// Health at spawn and respawn
pub const MAX_HEALTH: u32 = 100;

/// Longest display name kept; the rest is cut off
pub const MAX_NAME_CHARS: usize = 24;

/// Player colors, indexed by `color_index`
pub const PALETTE: [u32; MAX_ROOM_PLAYERS] = [
    0xff4444, // red
    0x4488ff, // blue
    0x44dd44, // green
    0xffdd33, // yellow
    0xdd44ff, // purple
    0x33dddd, // cyan
];

/// Client-reported pose
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rotation: f32,
}

impl Pose {
    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            rotation: 0.0,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.rotation.is_finite()
    }
}

/// Player state tracked by the room
#[derive(Debug, Clone)]
pub struct Player {
    pub id: Uuid,
    pub name: String,
    pub color_index: usize,
    pub pose: Pose,
    pub health: u32,
    pub kills: u32,
    pub weapon: WeaponKind,
    pub is_dead: bool,
    /// Server time of the last accepted shot
    pub last_fire_at: Option<u64>,
    /// Where the player comes back after the respawn delay
    pub pending_respawn: Option<Pose>,
}

impl Player {
    pub fn new(id: Uuid, name: String, color_index: usize, spawn: Pose) -> Self {
        Self {
            id,
            name,
            color_index,
            pose: spawn,
            health: MAX_HEALTH,
            kills: 0,
            weapon: WeaponKind::default(),
            is_dead: false,
            last_fire_at: None,
            pending_respawn: None,
        }
    }

    pub fn color(&self) -> u32 {
        PALETTE[self.color_index % PALETTE.len()]
    }

    /// Bring the player back at `at` with full health
    pub fn revive(&mut self, at: Pose) {
        self.pose = at;
        self.health = MAX_HEALTH;
        self.is_dead = false;
        self.pending_respawn = None;
    }

    /// Clear everything a match accumulates
    pub fn reset_for_lobby(&mut self) {
        self.health = MAX_HEALTH;
        self.kills = 0;
        self.weapon = WeaponKind::default();
        self.is_dead = false;
        self.last_fire_at = None;
        self.pending_respawn = None;
    }

    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            player_id: self.id,
            name: self.name.clone(),
            color: self.color(),
            color_index: self.color_index,
            x: self.pose.x,
            y: self.pose.y,
            z: self.pose.z,
            rotation: self.pose.rotation,
            health: self.health,
            kills: self.kills,
            is_dead: self.is_dead,
            weapon: self.weapon,
        }
    }
}

/// Trim a requested display name; empty names get a color-based default
pub fn display_name(requested: &str, color_index: usize) -> String {
    let name: String = requested
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_NAME_CHARS)
        .collect();
    if name.is_empty() {
        format!("Player {}", color_index + 1)
    } else {
        name
    }
}

/// Players of one room, keyed by id
#[derive(Debug, Default)]
pub struct PlayerDirectory {
    players: HashMap<Uuid, Player>,
}

impl PlayerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, player: Player) {
        self.players.insert(player.id, player);
    }

    pub fn remove(&mut self, id: &Uuid) -> Option<Player> {
        self.players.remove(id)
    }

    pub fn get(&self, id: &Uuid) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.players.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.values_mut()
    }

    /// Lowest palette index not held by anyone
    pub fn free_color(&self) -> Option<usize> {
        (0..PALETTE.len()).find(|idx| self.players.values().all(|p| p.color_index != *idx))
    }
}

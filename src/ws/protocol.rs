//! WebSocket protocol message definitions
//! These are the wire types for client-server communication.
//!
//! Every frame is `{"event": "<name>", "data": {...}}`; events without a
//! payload omit `data`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Weapons available in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeaponKind {
    Pistol,
    Ak47,
    Sniper,
    /// Everyone spawns with this
    #[default]
    Slingshot,
}

/// Plain 3-component vector on the wire
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientMsg {
    /// Join (or create) a room. An empty code asks the server to pick one.
    JoinGame {
        #[serde(default)]
        room_code: String,
        #[serde(default)]
        name: String,
    },

    /// Host asks to leave the lobby and start the countdown
    StartGame,

    /// Client-resolved position, relayed to peers as-is
    PlayerMovement {
        x: f32,
        y: f32,
        z: f32,
        #[serde(default)]
        rotation: f32,
    },

    /// Client-side hit detection claims a hit on `target_id`
    Shoot {
        target_id: Uuid,
        #[serde(default)]
        weapon_type: WeaponKind,
    },

    /// Cosmetic tracer for peers
    #[serde(alias = "playerShot")]
    PlayerShoot {
        origin: Point3,
        direction: Point3,
        #[serde(default)]
        weapon_type: Option<WeaponKind>,
    },

    /// Client-side hit on a destructible wall
    DamageObstacle { id: String, damage: u32 },

    PickupWeapon { pickup_id: String },

    WeaponSwitch { weapon_type: WeaponKind },

    /// Leave the current room without closing the socket
    LeaveGame,

    /// Clock-offset probe
    Ping { t: u64 },
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerMsg {
    /// Sent to the joiner only
    GameJoined {
        room_code: String,
        player_id: Uuid,
        assigned_color: u32,
        color_index: usize,
        x: f32,
        z: f32,
        host_id: Uuid,
    },

    /// Full roster, sent to the joiner only
    CurrentPlayers { players: BTreeMap<Uuid, PlayerInfo> },

    /// Sent to everyone already in the room
    NewPlayer(PlayerInfo),

    /// Roster or host changed
    RoomUpdate {
        players: BTreeMap<Uuid, PlayerInfo>,
        host_id: Uuid,
    },

    /// Server wall-clock millisecond at which play begins
    CountdownStart { start_time: u64 },

    GameStart {
        /// Match length in milliseconds
        duration: u64,
        players: BTreeMap<Uuid, PlayerInfo>,
    },

    /// All pickups that are active at match start
    PickupsState { pickups: Vec<PickupInfo> },

    PlayerMoved {
        player_id: Uuid,
        x: f32,
        y: f32,
        z: f32,
        rotation: f32,
    },

    PlayerHit {
        id: Uuid,
        health: u32,
        attacker_id: Uuid,
    },

    PlayerKilled {
        victim_id: Uuid,
        killer_id: Uuid,
        killer_kills: u32,
    },

    PlayerRespawn { id: Uuid, x: f32, y: f32, z: f32 },

    PlayerShot {
        shooter_id: Uuid,
        origin: Point3,
        direction: Point3,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        weapon_type: Option<WeaponKind>,
    },

    ObstacleDamaged { id: String, damage: u32 },

    PickupCollected {
        pickup_id: String,
        player_id: Uuid,
        weapon_type: WeaponKind,
    },

    PickupRespawned { pickup: PickupInfo },

    PlayerWeaponChanged {
        player_id: Uuid,
        weapon_type: WeaponKind,
    },

    UserDisconnected { id: Uuid },

    GameFinished {
        winner: Option<LeaderboardEntry>,
        leaderboard: Vec<LeaderboardEntry>,
    },

    GameError { code: String, message: String },

    Pong {
        /// Echo of the client timestamp
        t: u64,
        server_time: u64,
    },
}

/// Public view of a player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub player_id: Uuid,
    pub name: String,
    pub color: u32,
    pub color_index: usize,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rotation: f32,
    pub health: u32,
    pub kills: u32,
    pub is_dead: bool,
    pub weapon: WeaponKind,
}

/// Public view of a weapon pickup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickupInfo {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub weapon_type: WeaponKind,
    pub spawn_index: usize,
    pub is_active: bool,
}

/// One row of the end-of-match leaderboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub player_id: Uuid,
    pub name: String,
    pub color: u32,
    pub kills: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_named_events() {
        let join: ClientMsg =
            serde_json::from_str(r#"{"event":"joinGame","data":{"roomCode":"000001","name":"Alice"}}"#)
                .unwrap();
        match join {
            ClientMsg::JoinGame { room_code, name } => {
                assert_eq!(room_code, "000001");
                assert_eq!(name, "Alice");
            }
            other => panic!("unexpected {other:?}"),
        }

        let start: ClientMsg = serde_json::from_str(r#"{"event":"startGame"}"#).unwrap();
        assert!(matches!(start, ClientMsg::StartGame));
    }

    #[test]
    fn shoot_defaults_to_slingshot() {
        let target = Uuid::new_v4();
        let raw = format!(r#"{{"event":"shoot","data":{{"targetId":"{target}"}}}}"#);
        let msg: ClientMsg = serde_json::from_str(&raw).unwrap();
        match msg {
            ClientMsg::Shoot { target_id, weapon_type } => {
                assert_eq!(target_id, target);
                assert_eq!(weapon_type, WeaponKind::Slingshot);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_browser_tracer_frame() {
        let raw = r#"{"event":"playerShoot","data":{"origin":{"x":1.0,"y":2.0,"z":3.0},"direction":{"x":0.0,"y":0.0,"z":-1.0},"weaponType":"ak47"}}"#;
        match serde_json::from_str::<ClientMsg>(raw).unwrap() {
            ClientMsg::PlayerShoot {
                origin,
                direction,
                weapon_type,
            } => {
                assert_eq!(origin, Point3 { x: 1.0, y: 2.0, z: 3.0 });
                assert_eq!(direction.z, -1.0);
                assert_eq!(weapon_type, Some(WeaponKind::Ak47));
            }
            other => panic!("unexpected {other:?}"),
        }

        // weapon is optional on the inbound tracer
        let bare = r#"{"event":"playerShoot","data":{"origin":{"x":0.0,"y":0.0,"z":0.0},"direction":{"x":1.0,"y":0.0,"z":0.0}}}"#;
        assert!(matches!(
            serde_json::from_str::<ClientMsg>(bare).unwrap(),
            ClientMsg::PlayerShoot { weapon_type: None, .. }
        ));
    }

    #[test]
    fn parses_obstacle_damage() {
        let raw = r#"{"event":"damageObstacle","data":{"id":"wall_3","damage":10}}"#;
        match serde_json::from_str::<ClientMsg>(raw).unwrap() {
            ClientMsg::DamageObstacle { id, damage } => {
                assert_eq!(id, "wall_3");
                assert_eq!(damage, 10);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_weapon_is_rejected() {
        let raw = r#"{"event":"weaponSwitch","data":{"weaponType":"railgun"}}"#;
        assert!(serde_json::from_str::<ClientMsg>(raw).is_err());
    }

    #[test]
    fn server_events_use_camel_case_payloads() {
        let id = Uuid::new_v4();
        let json = serde_json::to_value(ServerMsg::PlayerHit {
            id,
            health: 80,
            attacker_id: id,
        })
        .unwrap();
        assert_eq!(json["event"], "playerHit");
        assert_eq!(json["data"]["health"], 80);
        assert!(json["data"]["attackerId"].is_string());
    }
}

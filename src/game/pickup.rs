//! Weapon pickups for one room

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::GameError;
use crate::ws::protocol::{PickupInfo, WeaponKind};

/// Fixed pickup location from the arena layout
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PickupSpawn {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub weapon: WeaponKind,
}

/// Live pickup instance
#[derive(Debug, Clone, PartialEq)]
pub struct Pickup {
    pub id: String,
    pub spawn_index: usize,
    pub spawn: PickupSpawn,
    pub is_active: bool,
}

impl Pickup {
    pub fn info(&self) -> PickupInfo {
        PickupInfo {
            id: self.id.clone(),
            x: self.spawn.x,
            y: self.spawn.y,
            z: self.spawn.z,
            weapon_type: self.spawn.weapon,
            spawn_index: self.spawn_index,
            is_active: self.is_active,
        }
    }
}

/// What a successful claim hands back
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimGrant {
    pub pickup_id: String,
    pub spawn_index: usize,
    pub weapon: WeaponKind,
}

/// Request to bring a spawn point back after `delay`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RespawnRequest {
    pub spawn_index: usize,
    pub delay: Duration,
}

/// Pickup instances of a room
///
/// Instances only exist between `initialize` (match start) and
/// `deactivate_all` (match end). Respawns outside that window are ignored.
#[derive(Debug, Default)]
pub struct PickupRegistry {
    room_code: String,
    spawns: Vec<PickupSpawn>,
    pickups: BTreeMap<String, Pickup>,
    live: bool,
}

impl PickupRegistry {
    pub fn new(room_code: impl Into<String>, spawns: Vec<PickupSpawn>) -> Self {
        Self {
            room_code: room_code.into(),
            spawns,
            pickups: BTreeMap::new(),
            live: false,
        }
    }

    fn pickup_id(&self, spawn_index: usize) -> String {
        format!("pickup_{}_{}", self.room_code, spawn_index)
    }

    /// One active pickup per spawn point
    pub fn initialize(&mut self) {
        self.pickups.clear();
        for (idx, spawn) in self.spawns.iter().enumerate() {
            let id = self.pickup_id(idx);
            self.pickups.insert(
                id.clone(),
                Pickup {
                    id,
                    spawn_index: idx,
                    spawn: *spawn,
                    is_active: true,
                },
            );
        }
        self.live = true;
    }

    /// Claim an active pickup. Exactly one caller wins.
    pub fn claim(&mut self, pickup_id: &str) -> Result<ClaimGrant, GameError> {
        let pickup = self
            .pickups
            .get_mut(pickup_id)
            .ok_or(GameError::NotFound("pickup"))?;
        if !pickup.is_active {
            return Err(GameError::AlreadyClaimed);
        }
        pickup.is_active = false;
        Ok(ClaimGrant {
            pickup_id: pickup.id.clone(),
            spawn_index: pickup.spawn_index,
            weapon: pickup.spawn.weapon,
        })
    }

    /// Validate a spawn index and wrap it into a timer request
    pub fn schedule_respawn(&self, spawn_index: usize, delay: Duration) -> Option<RespawnRequest> {
        (self.live && spawn_index < self.spawns.len()).then_some(RespawnRequest { spawn_index, delay })
    }

    /// Reactivate the pickup of `spawn_index`. `None` when the room is not live.
    pub fn respawn(&mut self, spawn_index: usize) -> Option<&Pickup> {
        if !self.live {
            return None;
        }
        let spawn = *self.spawns.get(spawn_index)?;
        let id = self.pickup_id(spawn_index);
        let pickup = self.pickups.entry(id.clone()).or_insert(Pickup {
            id,
            spawn_index,
            spawn,
            is_active: true,
        });
        pickup.is_active = true;
        Some(pickup)
    }

    /// Drop all instances; pending respawns become no-ops
    pub fn deactivate_all(&mut self) {
        self.pickups.clear();
        self.live = false;
    }

    pub fn get(&self, pickup_id: &str) -> Option<&Pickup> {
        self.pickups.get(pickup_id)
    }

    pub fn active(&self) -> Vec<PickupInfo> {
        self.pickups
            .values()
            .filter(|p| p.is_active)
            .map(Pickup::info)
            .collect()
    }

    pub fn is_live(&self) -> bool {
        self.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> PickupRegistry {
        PickupRegistry::new(
            "1234",
            vec![
                PickupSpawn {
                    x: 50.0,
                    y: 1.5,
                    z: 0.0,
                    weapon: WeaponKind::Ak47,
                },
                PickupSpawn {
                    x: -50.0,
                    y: 1.5,
                    z: 0.0,
                    weapon: WeaponKind::Pistol,
                },
            ],
        )
    }

    #[test]
    fn initialize_creates_one_per_spawn() {
        let mut reg = registry();
        reg.initialize();
        let active = reg.active();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].id, "pickup_1234_0");
        assert_eq!(active[1].weapon_type, WeaponKind::Pistol);
    }

    #[test]
    fn claim_succeeds_exactly_once() {
        let mut reg = registry();
        reg.initialize();

        let grant = reg.claim("pickup_1234_0").unwrap();
        assert_eq!(grant.weapon, WeaponKind::Ak47);
        assert_eq!(grant.spawn_index, 0);
        assert_eq!(reg.claim("pickup_1234_0"), Err(GameError::AlreadyClaimed));
        assert_eq!(reg.claim("pickup_1234_9"), Err(GameError::NotFound("pickup")));
    }

    #[test]
    fn respawn_reactivates() {
        let mut reg = registry();
        reg.initialize();
        reg.claim("pickup_1234_1").unwrap();
        assert_eq!(reg.active().len(), 1);

        let back = reg.respawn(1).unwrap();
        assert!(back.is_active);
        assert_eq!(reg.active().len(), 2);
        assert!(reg.claim("pickup_1234_1").is_ok());
    }

    #[test]
    fn respawn_after_reset_is_a_noop() {
        let mut reg = registry();
        reg.initialize();
        reg.claim("pickup_1234_0").unwrap();
        assert!(reg.schedule_respawn(0, Duration::from_secs(45)).is_some());

        reg.deactivate_all();
        assert!(reg.respawn(0).is_none());
        assert!(reg.active().is_empty());
        assert!(reg.schedule_respawn(0, Duration::from_secs(45)).is_none());
    }

    #[test]
    fn unknown_spawn_index_is_ignored() {
        let mut reg = registry();
        reg.initialize();
        assert!(reg.schedule_respawn(7, Duration::from_secs(1)).is_none());
        assert!(reg.respawn(7).is_none());
    }
}

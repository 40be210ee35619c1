//! Room state owned by a single room task
//!
//! Every operation is synchronous and returns the messages to deliver and the
//! timers to arm. The task that owns the state does the actual I/O.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::arena::ArenaConfig;
use super::combat::{CombatEffect, CombatResolver};
use super::error::GameError;
use super::lifecycle::{transition, LifecycleEvent, RoomPhase};
use super::pickup::PickupRegistry;
use super::player::{display_name, Player, PlayerDirectory, Pose, MAX_ROOM_PLAYERS};
use crate::physics::GeometryIndex;
use crate::ws::protocol::{LeaderboardEntry, PlayerInfo, Point3, ServerMsg, WeaponKind};

/// Longest destructible-wall id relayed to peers
const MAX_OBSTACLE_ID_LEN: usize = 64;

/// Timing knobs for a room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomSettings {
    pub countdown: Duration,
    pub match_duration: Duration,
    pub respawn_delay: Duration,
    pub pickup_respawn: Duration,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            countdown: Duration::from_millis(3_500),
            match_duration: Duration::from_secs(180),
            respawn_delay: Duration::from_secs(3),
            pickup_respawn: Duration::from_secs(45),
        }
    }
}

/// Who receives an outbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    Player(Uuid),
    Room,
    RoomExcept(Uuid),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub to: Recipient,
    pub msg: ServerMsg,
}

/// Deferred room work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    CountdownElapsed,
    MatchElapsed,
    RespawnPlayer(Uuid),
    RespawnPickup(usize),
}

/// A timer to arm. It fires back into the room tagged with `epoch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scheduled {
    pub delay: Duration,
    pub epoch: u64,
    pub event: TimerEvent,
}

/// Side effects of one room operation
#[derive(Debug, Default)]
pub struct Effects {
    pub messages: Vec<Outbound>,
    pub timers: Vec<Scheduled>,
}

impl Effects {
    fn to_player(&mut self, id: Uuid, msg: ServerMsg) {
        self.messages.push(Outbound {
            to: Recipient::Player(id),
            msg,
        });
    }

    fn to_room(&mut self, msg: ServerMsg) {
        self.messages.push(Outbound {
            to: Recipient::Room,
            msg,
        });
    }

    fn to_others(&mut self, except: Uuid, msg: ServerMsg) {
        self.messages.push(Outbound {
            to: Recipient::RoomExcept(except),
            msg,
        });
    }

    fn after(&mut self, delay: Duration, epoch: u64, event: TimerEvent) {
        self.timers.push(Scheduled {
            delay,
            epoch,
            event,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.timers.is_empty()
    }
}

/// Room listing entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub code: String,
    pub phase: RoomPhase,
    pub players: usize,
    pub max_players: usize,
    pub host_id: Option<Uuid>,
}

/// Authoritative state of one room
pub struct RoomState {
    code: String,
    phase: RoomPhase,
    /// Bumped whenever a match starts or ends; timers from another epoch are dropped
    epoch: u64,
    host: Option<Uuid>,
    /// Join order, used for host hand-over
    roster: Vec<Uuid>,
    players: PlayerDirectory,
    pickups: PickupRegistry,
    combat: CombatResolver,
    arena: Arc<ArenaConfig>,
    geometry: Arc<GeometryIndex>,
    settings: RoomSettings,
    rng: ChaCha8Rng,
}

impl RoomState {
    pub fn new(
        code: impl Into<String>,
        arena: Arc<ArenaConfig>,
        geometry: Arc<GeometryIndex>,
        settings: RoomSettings,
        seed: u64,
    ) -> Self {
        let code = code.into();
        Self {
            pickups: PickupRegistry::new(code.clone(), arena.pickups.clone()),
            code,
            phase: RoomPhase::Waiting,
            epoch: 0,
            host: None,
            roster: Vec::new(),
            players: PlayerDirectory::new(),
            combat: CombatResolver::new(settings.respawn_delay),
            arena,
            geometry,
            settings,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn phase(&self) -> RoomPhase {
        self.phase
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn host(&self) -> Option<Uuid> {
        self.host
    }

    pub fn player(&self, id: &Uuid) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn pickups(&self) -> &PickupRegistry {
        &self.pickups
    }

    pub fn len(&self) -> usize {
        self.roster.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            code: self.code.clone(),
            phase: self.phase,
            players: self.roster.len(),
            max_players: MAX_ROOM_PLAYERS,
            host_id: self.host,
        }
    }

    fn players_map(&self) -> BTreeMap<Uuid, PlayerInfo> {
        self.players.iter().map(|p| (p.id, p.info())).collect()
    }

    fn room_update(&self) -> Option<ServerMsg> {
        self.host.map(|host_id| ServerMsg::RoomUpdate {
            players: self.players_map(),
            host_id,
        })
    }

    fn spawn_point(&mut self) -> Pose {
        self.arena.spawn_point(&self.geometry, &mut self.rng)
    }

    /// Add a player. Only allowed in the lobby and while a color is free.
    pub fn join(&mut self, player_id: Uuid, requested_name: &str) -> Result<Effects, GameError> {
        if self.players.contains(&player_id) {
            return Err(GameError::State("Already in this room."));
        }
        transition(self.phase, LifecycleEvent::Join)?;
        if self.roster.len() >= MAX_ROOM_PLAYERS {
            return Err(GameError::Capacity(MAX_ROOM_PLAYERS));
        }
        let color_index = self
            .players
            .free_color()
            .ok_or(GameError::Capacity(MAX_ROOM_PLAYERS))?;

        let spawn = self.spawn_point();
        let player = Player::new(player_id, display_name(requested_name, color_index), color_index, spawn);
        let info = player.info();
        self.players.insert(player);
        self.roster.push(player_id);
        let host_id = *self.host.get_or_insert(player_id);

        info!(
            room = %self.code,
            player_id = %player_id,
            color_index,
            player_count = self.roster.len(),
            "Player joined room"
        );

        let mut effects = Effects::default();
        effects.to_player(
            player_id,
            ServerMsg::GameJoined {
                room_code: self.code.clone(),
                player_id,
                assigned_color: info.color,
                color_index,
                x: spawn.x,
                z: spawn.z,
                host_id,
            },
        );
        effects.to_player(
            player_id,
            ServerMsg::CurrentPlayers {
                players: self.players_map(),
            },
        );
        effects.to_others(player_id, ServerMsg::NewPlayer(info));
        if let Some(update) = self.room_update() {
            effects.to_room(update);
        }
        Ok(effects)
    }

    /// Remove a player. Unknown ids are ignored.
    pub fn leave(&mut self, player_id: Uuid) -> Effects {
        let mut effects = Effects::default();
        if self.players.remove(&player_id).is_none() {
            return effects;
        }
        self.roster.retain(|id| *id != player_id);

        if self.host == Some(player_id) {
            self.host = self.roster.first().copied();
            if let Some(new_host) = self.host {
                info!(room = %self.code, host_id = %new_host, "Host reassigned");
            }
        }

        info!(
            room = %self.code,
            player_id = %player_id,
            player_count = self.roster.len(),
            "Player left room"
        );

        if !self.roster.is_empty() {
            effects.to_room(ServerMsg::UserDisconnected { id: player_id });
            if let Some(update) = self.room_update() {
                effects.to_room(update);
            }
        }
        effects
    }

    /// Host asks to start. Arms the countdown timer.
    pub fn start_game(&mut self, requester: Uuid, now_ms: u64) -> Result<Effects, GameError> {
        if !self.players.contains(&requester) {
            return Err(GameError::NotFound("player"));
        }
        let by_host = self.host == Some(requester);
        self.phase = transition(self.phase, LifecycleEvent::Start { by_host })?;
        self.epoch += 1;

        let start_time = now_ms + self.settings.countdown.as_millis() as u64;
        info!(room = %self.code, start_time, "Countdown started");

        let mut effects = Effects::default();
        effects.to_room(ServerMsg::CountdownStart { start_time });
        effects.after(self.settings.countdown, self.epoch, TimerEvent::CountdownElapsed);
        Ok(effects)
    }

    /// A timer armed earlier has fired
    pub fn on_timer(&mut self, epoch: u64, event: TimerEvent) -> Effects {
        if epoch != self.epoch {
            debug!(room = %self.code, ?event, epoch, current = self.epoch, "Stale timer ignored");
            return Effects::default();
        }
        match event {
            TimerEvent::CountdownElapsed => self.begin_match(),
            TimerEvent::MatchElapsed => self.finish_match(),
            TimerEvent::RespawnPlayer(id) => {
                let mut effects = Effects::default();
                if let Some(at) = self.combat.complete_respawn(&mut self.players, id) {
                    effects.to_room(ServerMsg::PlayerRespawn {
                        id,
                        x: at.x,
                        y: at.y,
                        z: at.z,
                    });
                }
                effects
            }
            TimerEvent::RespawnPickup(spawn_index) => {
                let mut effects = Effects::default();
                if let Some(pickup) = self.pickups.respawn(spawn_index) {
                    effects.to_room(ServerMsg::PickupRespawned {
                        pickup: pickup.info(),
                    });
                }
                effects
            }
        }
    }

    fn begin_match(&mut self) -> Effects {
        let mut effects = Effects::default();
        match transition(self.phase, LifecycleEvent::CountdownElapsed) {
            Ok(phase) => self.phase = phase,
            Err(e) => {
                warn!(room = %self.code, error = %e, "Countdown elapsed out of phase");
                return effects;
            }
        }

        let ids: Vec<Uuid> = self.roster.clone();
        for id in ids {
            let spawn = self.spawn_point();
            if let Some(player) = self.players.get_mut(&id) {
                player.reset_for_lobby();
                player.pose = spawn;
            }
        }
        self.pickups.initialize();

        info!(room = %self.code, players = self.roster.len(), "Match started");

        effects.to_room(ServerMsg::GameStart {
            duration: self.settings.match_duration.as_millis() as u64,
            players: self.players_map(),
        });
        effects.to_room(ServerMsg::PickupsState {
            pickups: self.pickups.active(),
        });
        effects.after(self.settings.match_duration, self.epoch, TimerEvent::MatchElapsed);
        effects
    }

    /// Kills descending, ties in join order
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> = self
            .roster
            .iter()
            .filter_map(|id| self.players.get(id))
            .map(|p| LeaderboardEntry {
                player_id: p.id,
                name: p.name.clone(),
                color: p.color(),
                kills: p.kills,
            })
            .collect();
        entries.sort_by(|a, b| b.kills.cmp(&a.kills));
        entries
    }

    fn finish_match(&mut self) -> Effects {
        let mut effects = Effects::default();
        match transition(self.phase, LifecycleEvent::MatchElapsed) {
            Ok(phase) => self.phase = phase,
            Err(e) => {
                warn!(room = %self.code, error = %e, "Match elapsed out of phase");
                return effects;
            }
        }

        let leaderboard = self.leaderboard();
        let winner = leaderboard.first().cloned();
        info!(
            room = %self.code,
            winner = ?winner.as_ref().map(|w| w.player_id),
            "Match finished"
        );
        effects.to_room(ServerMsg::GameFinished {
            winner,
            leaderboard,
        });

        self.pickups.deactivate_all();
        for player in self.players.iter_mut() {
            player.reset_for_lobby();
        }
        self.phase = transition(self.phase, LifecycleEvent::ResultsBroadcast).unwrap_or(RoomPhase::Waiting);
        self.epoch += 1;

        if let Some(update) = self.room_update() {
            effects.to_room(update);
        }
        effects
    }

    /// Relay a client-resolved pose to the other players
    pub fn handle_movement(&mut self, player_id: Uuid, pose: Pose) -> Result<Effects, GameError> {
        if !pose.is_finite() {
            return Err(GameError::Malformed("position"));
        }
        let player = self
            .players
            .get_mut(&player_id)
            .ok_or(GameError::NotFound("player"))?;
        if player.is_dead {
            return Err(GameError::State("Dead players cannot move."));
        }
        player.pose = pose;

        let mut effects = Effects::default();
        effects.to_others(
            player_id,
            ServerMsg::PlayerMoved {
                player_id,
                x: pose.x,
                y: pose.y,
                z: pose.z,
                rotation: pose.rotation,
            },
        );
        Ok(effects)
    }

    /// Apply a hit claim
    pub fn handle_shot(
        &mut self,
        attacker: Uuid,
        target: Uuid,
        weapon: WeaponKind,
        now_ms: u64,
    ) -> Result<Effects, GameError> {
        if self.phase != RoomPhase::Playing {
            return Err(GameError::State("Game is not in progress."));
        }

        let arena = &self.arena;
        let geometry = &self.geometry;
        let rng = &mut self.rng;
        let outcome = self.combat.apply_shot(
            &mut self.players,
            attacker,
            target,
            weapon,
            now_ms,
            || arena.spawn_point(geometry, rng),
        )?;

        let mut effects = Effects::default();
        for effect in outcome {
            match effect {
                CombatEffect::Hit {
                    target,
                    health,
                    attacker,
                } => effects.to_room(ServerMsg::PlayerHit {
                    id: target,
                    health,
                    attacker_id: attacker,
                }),
                CombatEffect::Kill {
                    victim,
                    killer,
                    killer_kills,
                } => {
                    info!(room = %self.code, victim = %victim, killer = %killer, "Player killed");
                    effects.to_room(ServerMsg::PlayerKilled {
                        victim_id: victim,
                        killer_id: killer,
                        killer_kills,
                    });
                }
                CombatEffect::Respawn { player, delay, .. } => {
                    effects.after(delay, self.epoch, TimerEvent::RespawnPlayer(player));
                }
            }
        }
        Ok(effects)
    }

    /// Claim a weapon pickup
    pub fn handle_pickup(&mut self, player_id: Uuid, pickup_id: &str) -> Result<Effects, GameError> {
        if self.phase != RoomPhase::Playing {
            return Err(GameError::State("Game is not in progress."));
        }
        let player = self.players.get(&player_id).ok_or(GameError::NotFound("player"))?;
        if player.is_dead {
            return Err(GameError::State("Dead players cannot collect pickups."));
        }

        let grant = self.pickups.claim(pickup_id)?;
        if let Some(player) = self.players.get_mut(&player_id) {
            player.weapon = grant.weapon;
        }
        debug!(room = %self.code, player_id = %player_id, pickup = %grant.pickup_id, "Pickup collected");

        let mut effects = Effects::default();
        effects.to_room(ServerMsg::PickupCollected {
            pickup_id: grant.pickup_id,
            player_id,
            weapon_type: grant.weapon,
        });
        if let Some(request) = self
            .pickups
            .schedule_respawn(grant.spawn_index, self.settings.pickup_respawn)
        {
            effects.after(request.delay, self.epoch, TimerEvent::RespawnPickup(request.spawn_index));
        }
        Ok(effects)
    }

    pub fn handle_weapon_switch(&mut self, player_id: Uuid, weapon: WeaponKind) -> Result<Effects, GameError> {
        let player = self
            .players
            .get_mut(&player_id)
            .ok_or(GameError::NotFound("player"))?;
        player.weapon = weapon;

        let mut effects = Effects::default();
        effects.to_others(
            player_id,
            ServerMsg::PlayerWeaponChanged {
                player_id,
                weapon_type: weapon,
            },
        );
        Ok(effects)
    }

    /// Relay a cosmetic tracer
    pub fn handle_tracer(
        &mut self,
        player_id: Uuid,
        origin: Point3,
        direction: Point3,
        weapon_type: Option<WeaponKind>,
    ) -> Result<Effects, GameError> {
        if !(origin.is_finite() && direction.is_finite()) {
            return Err(GameError::Malformed("tracer"));
        }
        if !self.players.contains(&player_id) {
            return Err(GameError::NotFound("player"));
        }

        let mut effects = Effects::default();
        effects.to_others(
            player_id,
            ServerMsg::PlayerShot {
                shooter_id: player_id,
                origin,
                direction,
                weapon_type,
            },
        );
        Ok(effects)
    }

    /// Relay a hit on a destructible wall. Walls keep no health here.
    pub fn handle_obstacle_damage(
        &mut self,
        player_id: Uuid,
        obstacle_id: &str,
        damage: u32,
    ) -> Result<Effects, GameError> {
        if self.phase != RoomPhase::Playing {
            return Err(GameError::State("Game is not in progress."));
        }
        let player = self.players.get(&player_id).ok_or(GameError::NotFound("player"))?;
        if player.is_dead {
            return Err(GameError::State("Dead players cannot shoot."));
        }
        if obstacle_id.is_empty() || obstacle_id.len() > MAX_OBSTACLE_ID_LEN {
            return Err(GameError::Malformed("obstacle id"));
        }

        let mut effects = Effects::default();
        effects.to_room(ServerMsg::ObstacleDamaged {
            id: obstacle_id.to_string(),
            damage,
        });
        Ok(effects)
    }
}

//! Registry of all live rooms, keyed by room code

use std::sync::{Arc, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::Rng;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use super::arena::ArenaConfig;
use super::error::GameError;
use super::room::{RoomSettings, RoomState, RoomSummary};
use super::session::{GameRoom, JoinError, RoomHandle};
use crate::physics::GeometryIndex;
use crate::ws::protocol::ServerMsg;

/// Longest room code accepted from clients
pub const MAX_ROOM_CODE_LEN: usize = 32;

/// Joins retried when a room closes under us
const JOIN_ATTEMPTS: usize = 3;

/// Trim a client-supplied room code. `None` asks for a generated one.
pub fn normalize_room_code(raw: &str) -> Result<Option<String>, GameError> {
    let code = raw.trim();
    if code.is_empty() {
        return Ok(None);
    }
    if code.chars().count() > MAX_ROOM_CODE_LEN || code.chars().any(char::is_control) {
        return Err(GameError::Malformed("room code"));
    }
    Ok(Some(code.to_string()))
}

/// All rooms on this server
pub struct RoomRegistry {
    rooms: DashMap<String, RoomHandle>,
    arena: Arc<ArenaConfig>,
    geometry: Arc<GeometryIndex>,
    settings: RoomSettings,
}

impl RoomRegistry {
    pub fn new(arena: Arc<ArenaConfig>, settings: RoomSettings) -> Self {
        let geometry = Arc::new(arena.geometry());
        Self {
            rooms: DashMap::new(),
            arena,
            geometry,
            settings,
        }
    }

    pub fn arena(&self) -> &Arc<ArenaConfig> {
        &self.arena
    }

    pub fn get(&self, code: &str) -> Option<RoomHandle> {
        self.rooms.get(code).map(|r| r.value().clone())
    }

    pub fn active_rooms(&self) -> usize {
        self.rooms.len()
    }

    pub fn total_players(&self) -> usize {
        self.rooms.iter().map(|r| r.value().player_count()).sum()
    }

    pub fn summaries(&self) -> Vec<RoomSummary> {
        let mut rooms: Vec<RoomSummary> = self.rooms.iter().map(|r| r.value().summary()).collect();
        rooms.sort_by(|a, b| a.code.cmp(&b.code));
        rooms
    }

    /// Random six-digit code not currently in use
    fn generate_code(&self) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let code = format!("{:06}", rng.gen_range(0..1_000_000));
            if !self.rooms.contains_key(&code) {
                return code;
            }
        }
    }

    /// Join `requested_code`, creating the room if needed
    pub async fn join(
        self: &Arc<Self>,
        requested_code: &str,
        player_id: Uuid,
        name: &str,
        outbound: mpsc::Sender<ServerMsg>,
    ) -> Result<RoomHandle, GameError> {
        let code = match normalize_room_code(requested_code)? {
            Some(code) => code,
            None => self.generate_code(),
        };

        for attempt in 0..JOIN_ATTEMPTS {
            let handle = self.open(&code);
            match handle.join(player_id, name.to_string(), outbound.clone()).await {
                Ok(()) => return Ok(handle),
                Err(JoinError::Rejected(e)) => return Err(e),
                Err(JoinError::Closed) => {
                    debug!(room = %code, attempt, "Room closed during join, retrying");
                    self.remove_if_current(&code, handle.id);
                }
            }
        }
        Err(GameError::State("Room is closing, try again."))
    }

    /// Existing live room for `code`, or a freshly spawned one
    fn open(self: &Arc<Self>, code: &str) -> RoomHandle {
        let entry = self.rooms.entry(code.to_string());
        if let Entry::Occupied(ref occupied) = entry {
            if !occupied.get().is_closed() {
                return occupied.get().clone();
            }
        }

        let handle = self.spawn_room(code);
        match entry {
            Entry::Occupied(mut stale) => {
                stale.insert(handle.clone());
            }
            Entry::Vacant(vacant) => {
                vacant.insert(handle.clone());
            }
        }
        handle
    }

    fn spawn_room(self: &Arc<Self>, code: &str) -> RoomHandle {
        let seed: u64 = rand::random();
        let state = RoomState::new(
            code,
            self.arena.clone(),
            self.geometry.clone(),
            self.settings,
            seed,
        );
        let (room, handle) = GameRoom::new(state);
        info!(room = %code, room_id = %handle.id, "Room created");

        let registry: Weak<Self> = Arc::downgrade(self);
        let (code, id) = (code.to_string(), handle.id);
        tokio::spawn(async move {
            room.run().await;
            if let Some(registry) = registry.upgrade() {
                registry.remove_if_current(&code, id);
            }
        });

        handle
    }

    /// Drop `code` only if it still points at room `id`
    fn remove_if_current(&self, code: &str, id: Uuid) {
        if self.rooms.remove_if(code, |_, h| h.id == id).is_some() {
            info!(room = %code, room_id = %id, "Room removed");
        }
    }
}

//! Application state shared across routes

use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::game::{ArenaConfig, ArenaError, RoomRegistry};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub rooms: Arc<RoomRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, ArenaError> {
        let config = Arc::new(config);

        // Arena layout, shared read-only by every room
        let arena = match &config.arena_path {
            Some(path) => {
                info!(path = %path.display(), "Loading arena layout");
                ArenaConfig::load(path)?
            }
            None => ArenaConfig::default(),
        };

        let rooms = Arc::new(RoomRegistry::new(Arc::new(arena), config.room));

        Ok(Self { config, rooms })
    }
}

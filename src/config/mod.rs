//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::game::RoomSettings;
use crate::util::rate_limit::DEFAULT_INPUT_RATE_LIMIT;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS, empty allows any
    pub client_origins: Vec<String>,
    /// Optional JSON arena layout, built-in layout otherwise
    pub arena_path: Option<PathBuf>,
    /// Room timers
    pub room: RoomSettings,
    /// Max inbound frames per connection per second
    pub input_rate_limit: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        };

        let defaults = RoomSettings::default();

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            client_origins: env::var("CLIENT_ORIGIN")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),

            arena_path: env::var("ARENA_PATH").ok().map(PathBuf::from),

            room: RoomSettings {
                countdown: Duration::from_millis(parse_or(
                    "COUNTDOWN_MS",
                    defaults.countdown.as_millis() as u64,
                )?),
                match_duration: Duration::from_secs(parse_or(
                    "MATCH_DURATION_SECS",
                    defaults.match_duration.as_secs(),
                )?),
                respawn_delay: Duration::from_millis(parse_or(
                    "RESPAWN_DELAY_MS",
                    defaults.respawn_delay.as_millis() as u64,
                )?),
                pickup_respawn: Duration::from_millis(parse_or(
                    "PICKUP_RESPAWN_MS",
                    defaults.pickup_respawn.as_millis() as u64,
                )?),
            },

            input_rate_limit: parse_or("INPUT_RATE_LIMIT", DEFAULT_INPUT_RATE_LIMIT)?,
        })
    }
}

/// Parse an optional variable, keeping `default` when unset
fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}

//! Time utilities

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Millisecond wall clock anchored to the tokio clock.
///
/// Reads the Unix time once and advances with `tokio::time::Instant`, so
/// rooms see a monotonic clock that also follows paused test time.
#[derive(Debug, Clone, Copy)]
pub struct GameClock {
    origin: tokio::time::Instant,
    origin_unix_ms: u64,
}

impl GameClock {
    pub fn start() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
            origin_unix_ms: unix_millis(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.origin_unix_ms + self.origin.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn game_clock_follows_tokio_time() {
        let clock = GameClock::start();
        let before = clock.now_ms();
        tokio::time::advance(Duration::from_millis(1_500)).await;
        assert_eq!(clock.now_ms() - before, 1_500);
    }

    #[test]
    fn uptime_starts_at_zero() {
        init_server_time();
        assert!(uptime_secs() < 5);
    }
}

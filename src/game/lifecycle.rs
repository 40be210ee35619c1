//! Room lifecycle state machine

use serde::Serialize;

use super::error::GameError;

/// Room phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomPhase {
    /// Lobby, players may join
    Waiting,
    /// Start requested, synchronized countdown running
    Countdown,
    /// Match in progress
    Playing,
    /// Results being broadcast, state being cleared
    Resetting,
}

/// Inputs that can move a room between phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Join,
    Start { by_host: bool },
    CountdownElapsed,
    MatchElapsed,
    ResultsBroadcast,
}

/// The transition table. Anything not listed is rejected.
pub fn transition(phase: RoomPhase, event: LifecycleEvent) -> Result<RoomPhase, GameError> {
    use LifecycleEvent as E;
    use RoomPhase as P;

    match (phase, event) {
        (P::Waiting, E::Join) => Ok(P::Waiting),
        (_, E::Join) => Err(GameError::State("Game already in progress.")),

        (_, E::Start { by_host: false }) => Err(GameError::State("Only the host can start the game.")),
        (P::Waiting, E::Start { by_host: true }) => Ok(P::Countdown),
        (_, E::Start { .. }) => Err(GameError::State("Game cannot be started.")),

        (P::Countdown, E::CountdownElapsed) => Ok(P::Playing),
        (P::Playing, E::MatchElapsed) => Ok(P::Resetting),
        (P::Resetting, E::ResultsBroadcast) => Ok(P::Waiting),

        _ => Err(GameError::State("Invalid room transition.")),
    }
}

//! Recoverable game errors

/// Reasons the authority refuses a client event.
///
/// None of these are fatal: the event is dropped or answered with a
/// `gameError`, and room state is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Room is full (max {0} players).")]
    Capacity(usize),

    #[error("{0}")]
    State(&'static str),

    #[error("Unknown {0}.")]
    NotFound(&'static str),

    #[error("Firing faster than the weapon allows.")]
    RateLimit,

    #[error("Pickup was already taken.")]
    AlreadyClaimed,

    #[error("Malformed {0}.")]
    Malformed(&'static str),
}

impl GameError {
    /// Stable machine-readable code sent alongside the message
    pub fn code(&self) -> &'static str {
        match self {
            GameError::Capacity(_) => "room_full",
            GameError::State(_) => "invalid_state",
            GameError::NotFound(_) => "not_found",
            GameError::RateLimit => "rate_limited",
            GameError::AlreadyClaimed => "already_claimed",
            GameError::Malformed(_) => "malformed",
        }
    }
}

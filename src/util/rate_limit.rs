//! Inbound frame throttling for WebSocket connections

use std::num::NonZeroU32;

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};

/// Default cap on inbound WebSocket frames per connection per second
pub const DEFAULT_INPUT_RATE_LIMIT: u32 = 60;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Token bucket for one socket. A rate of zero is treated as one frame per second.
pub struct FrameLimiter {
    bucket: DirectLimiter,
    dropped: u64,
}

impl FrameLimiter {
    pub fn per_second(frames: u32) -> Self {
        let rate = NonZeroU32::new(frames).unwrap_or(NonZeroU32::MIN);
        Self {
            bucket: RateLimiter::direct(Quota::per_second(rate)),
            dropped: 0,
        }
    }

    /// Take a token for the next frame. Counts the frame as dropped if none is left.
    pub fn admit(&mut self) -> bool {
        let ok = self.bucket.check().is_ok();
        if !ok {
            self.dropped += 1;
        }
        ok
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

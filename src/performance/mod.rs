//! # Frame Pacing
//!
//! Timing helpers used by the frame driver: a toggleable frame limiter and
//! a once-per-second FPS counter. Both take the current `Instant` as an
//! argument so they can be driven deterministically in tests.
//!
//! ## Usage
//!
//! ```rust
//! use lifegrid::performance::{FpsCounter, FrameLimiter};
//! use std::time::{Duration, Instant};
//!
//! let mut limiter = FrameLimiter::new(Duration::from_millis(33), true);
//! let mut fps = FpsCounter::new(Instant::now());
//!
//! let now = Instant::now();
//! if limiter.ready(now) {
//!     limiter.mark(now);
//!     if let Some(frames) = fps.tick(now) {
//!         println!("FPS: {frames}");
//!     }
//! }
//! ```

use std::time::{Duration, Instant};

/// Gates frames to a target interval; can be switched off at runtime
#[derive(Debug, Clone)]
pub struct FrameLimiter {
    target_frame_time: Duration,
    limited: bool,
    last_frame: Option<Instant>,
}

impl FrameLimiter {
    pub fn new(target_frame_time: Duration, limited: bool) -> Self {
        Self {
            target_frame_time,
            limited,
            last_frame: None,
        }
    }

    pub fn is_limited(&self) -> bool {
        self.limited
    }

    /// Flip the limiter and return the new state
    pub fn toggle(&mut self) -> bool {
        self.limited = !self.limited;
        self.limited
    }

    /// Whether a frame may run at `now`
    pub fn ready(&self, now: Instant) -> bool {
        match self.last_frame {
            _ if !self.limited => true,
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.target_frame_time,
        }
    }

    /// Record that a frame ran at `now`
    pub fn mark(&mut self, now: Instant) {
        self.last_frame = Some(now);
    }

    /// Earliest instant the next frame may run, if limited
    pub fn next_deadline(&self) -> Option<Instant> {
        if !self.limited {
            return None;
        }
        self.last_frame.map(|last| last + self.target_frame_time)
    }
}

/// Counts frames and reports the total once per second
#[derive(Debug, Clone)]
pub struct FpsCounter {
    frames: u32,
    window_start: Instant,
    window: Duration,
}

impl FpsCounter {
    pub fn new(now: Instant) -> Self {
        Self {
            frames: 0,
            window_start: now,
            window: Duration::from_secs(1),
        }
    }

    /// Count one frame; returns the frame count when a full window elapsed
    pub fn tick(&mut self, now: Instant) -> Option<u32> {
        self.frames += 1;
        if now.saturating_duration_since(self.window_start) >= self.window {
            let frames = self.frames;
            self.frames = 0;
            self.window_start = now;
            Some(frames)
        } else {
            None
        }
    }
}

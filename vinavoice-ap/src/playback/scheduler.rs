//! Progress scheduling
//!
//! Two pieces:
//! - [`ProgressScheduler`] decides *whether* a progress poll may run. Every
//!   `arm` issues a new [`FrameTicket`]; `cancel` revokes it. A poll carrying a
//!   revoked ticket is stale and does nothing.
//! - [`FrameClock`] decides *when* polls happen: one tick per display frame.
//!
//! Arming happens on play, cancelling on pause, end of clip, buffer
//! replacement and teardown, always in the same step that acquires or
//! releases the source.

use std::time::Duration;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Default display refresh rate for progress polling
pub const DEFAULT_FRAME_RATE_HZ: u32 = 60;

/// Identity of one armed polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTicket {
    /// Session the loop belongs to
    pub session: u64,
    /// Playback segment within the session
    pub segment: u64,
}

/// Armed/cancelled state of the progress loop
#[derive(Debug, Default)]
pub struct ProgressScheduler {
    armed: Option<FrameTicket>,
    segments_issued: u64,
}

impl ProgressScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm polling for a new segment of `session`, replacing any previous ticket
    pub fn arm(&mut self, session: u64) -> FrameTicket {
        self.segments_issued += 1;
        let ticket = FrameTicket {
            session,
            segment: self.segments_issued,
        };
        self.armed = Some(ticket);
        ticket
    }

    /// Stop polling. Safe to call when not armed.
    pub fn cancel(&mut self) {
        self.armed = None;
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Currently valid ticket, if any
    pub fn current(&self) -> Option<FrameTicket> {
        self.armed
    }

    /// Whether a poll carrying `ticket` may still run
    pub fn is_armed_for(&self, ticket: FrameTicket) -> bool {
        self.armed == Some(ticket)
    }
}

/// Display-refresh driver for progress polls
#[derive(Debug)]
pub struct FrameClock {
    interval: Interval,
    period: Duration,
}

impl FrameClock {
    /// Create a frame clock ticking `frame_rate_hz` times per second.
    ///
    /// Late frames are skipped rather than bunched up.
    ///
    /// # Panics
    /// Must be called from within a tokio runtime.
    pub fn new(frame_rate_hz: u32) -> Self {
        let period = Self::period_for(frame_rate_hz);
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval, period }
    }

    /// Frame period for a refresh rate (a rate of 0 is treated as 1Hz)
    pub fn period_for(frame_rate_hz: u32) -> Duration {
        Duration::from_secs_f64(1.0 / frame_rate_hz.max(1) as f64)
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Wait for the next frame
    pub async fn tick(&mut self) -> Instant {
        self.interval.tick().await
    }

    /// Restart the cadence from now, so the first frame after arming waits a
    /// full period.
    pub fn reset(&mut self) {
        self.interval.reset();
    }
}

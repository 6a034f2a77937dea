//! Player event types
//!
//! Everything the playback controller reports to the presentation layer.
//! Events are serializable so the CLI can stream them as JSON lines.

use serde::{Deserialize, Serialize};

/// Coarse playback status visible to the presentation layer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    /// No audio loaded
    Idle,
    /// Audio loaded, not playing (never started, paused, or ended)
    Stopped,
    /// Audio is playing
    Playing,
}

impl std::fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackStatus::Idle => write!(f, "idle"),
            PlaybackStatus::Stopped => write!(f, "stopped"),
            PlaybackStatus::Playing => write!(f, "playing"),
        }
    }
}

/// Point-in-time view of the player
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PlayerSnapshot {
    pub status: PlaybackStatus,
    pub is_playing: bool,
    /// Seconds of audio played so far
    pub elapsed: f64,
    /// Total seconds of loaded audio (0 when idle)
    pub duration: f64,
    pub muted: bool,
}

impl PlayerSnapshot {
    /// Snapshot of a player with nothing loaded
    pub fn idle() -> Self {
        Self {
            status: PlaybackStatus::Idle,
            is_playing: false,
            elapsed: 0.0,
            duration: 0.0,
            muted: false,
        }
    }
}

impl Default for PlayerSnapshot {
    fn default() -> Self {
        Self::idle()
    }
}

/// Player events pushed to subscribers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerEvent {
    /// A new buffer replaced whatever was loaded before
    BufferLoaded { duration: f64 },

    /// Any transport transition (play, pause, restart, end, teardown)
    StateChanged { snapshot: PlayerSnapshot },

    /// Per-frame position report while playing
    Progress { elapsed: f64, duration: f64 },

    /// Gain stage muted or unmuted
    MuteChanged { muted: bool },

    /// Playback reached the end of the clip and rewound to 0
    Ended { duration: f64 },
}

impl PlayerEvent {
    /// Event type name as it appears in serialized form
    pub fn event_type(&self) -> &'static str {
        match self {
            PlayerEvent::BufferLoaded { .. } => "buffer_loaded",
            PlayerEvent::StateChanged { .. } => "state_changed",
            PlayerEvent::Progress { .. } => "progress",
            PlayerEvent::MuteChanged { .. } => "mute_changed",
            PlayerEvent::Ended { .. } => "ended",
        }
    }
}

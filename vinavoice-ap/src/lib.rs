//! # VinaVoice Audio Player Library (vinavoice-ap)
//!
//! Plays synthesized speech: decodes a base64 16-bit PCM payload into a
//! [`PlayableBuffer`](audio::PlayableBuffer) and drives it through a
//! play/pause/restart controller with clock-based progress reporting.
//!
//! **Architecture:** decoder → [`PlaybackController`](playback::PlaybackController)
//! over an [`OutputContext`](audio::OutputContext) (cpal device or virtual),
//! polled once per display frame.

pub mod audio;
pub mod config;
pub mod error;
pub mod playback;

pub use error::{DecodeError, Error, Result};

/// Short commit hash of the build ("unknown" outside a git checkout)
pub const GIT_HASH: &str = env!("GIT_HASH");

/// Cargo profile the binary was built with
pub const BUILD_PROFILE: &str = env!("BUILD_PROFILE");

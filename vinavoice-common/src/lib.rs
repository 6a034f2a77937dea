//! # VinaVoice Common Library
//!
//! Shared code for the VinaVoice workspace:
//! - Error type and Result alias
//! - Configuration file resolution
//! - Player event and snapshot types (controller → presentation layer)
//! - Human-readable clock formatting

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;

pub use error::{Error, Result};
pub use events::{PlaybackStatus, PlayerEvent, PlayerSnapshot};

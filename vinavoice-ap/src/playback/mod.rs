//! Playback control: transport state, progress scheduling and commands

pub mod command;
pub mod controller;
pub mod scheduler;
pub mod state;

pub use command::TransportCommand;
pub use controller::{PlaybackController, TickOutcome};
pub use scheduler::{FrameClock, FrameTicket, ProgressScheduler};
pub use state::Transport;

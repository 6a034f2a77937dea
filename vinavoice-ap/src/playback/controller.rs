//! Playback controller
//!
//! Owns one loaded buffer at a time, the audio-graph nodes that play it, and
//! the clock arithmetic that turns the context clock into elapsed seconds.
//!
//! **States:**
//! - Idle: no session
//! - Stopped: session loaded, position frozen at `paused_offset`
//! - Playing: one started source, `elapsed = now - segment_start`
//!
//! Every transition that releases the source also cancels the progress
//! scheduler, and every transition that starts a source arms it. The
//! controller never logs; failures are returned to the caller.

use crate::audio::context::{ActiveSource, ContextState, GainNode, OutputContext};
use crate::audio::types::PlayableBuffer;
use crate::error::{Error, Result};
use crate::playback::scheduler::{FrameTicket, ProgressScheduler};
use crate::playback::state::Transport;
use tokio::sync::broadcast;
use vinavoice_common::{PlaybackStatus, PlayerEvent, PlayerSnapshot};

/// Capacity of the player event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Result of one progress poll
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Nothing to do: not playing, or the poll was stale
    Idle,
    /// Still playing at this many elapsed seconds
    Progress(f64),
    /// The clip finished; transport rewound to 0 and polling stopped
    Ended,
    /// The output context closed mid-play; the session was torn down
    OutputClosed,
}

/// One loaded buffer and the gain stage it plays through
struct Session<C: OutputContext> {
    id: u64,
    buffer: PlayableBuffer,
    gain: C::Gain,
    muted: bool,
    transport: Transport<C::Source>,
}

impl<C: OutputContext> Session<C> {
    fn duration(&self) -> f64 {
        self.buffer.duration_seconds()
    }
}

impl<C: OutputContext> Drop for Session<C> {
    fn drop(&mut self) {
        // Source first, then the gain it feeds
        self.transport = Transport::loaded();
        self.gain.disconnect();
    }
}

/// Play/pause/restart state machine over an output context
pub struct PlaybackController<C: OutputContext> {
    context: C,
    session: Option<Session<C>>,
    scheduler: ProgressScheduler,
    sessions_created: u64,
    event_tx: broadcast::Sender<PlayerEvent>,
}

impl<C: OutputContext> PlaybackController<C> {
    /// Create an idle controller over `context`
    pub fn new(context: C) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            context,
            session: None,
            scheduler: ProgressScheduler::new(),
            sessions_created: 0,
            event_tx,
        }
    }

    /// Subscribe to player events
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.event_tx.subscribe()
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    /// Replace whatever is loaded with `buffer`.
    ///
    /// The previous session (source, gain stage and progress loop) is
    /// released first. The new session starts stopped at 0, unmuted.
    ///
    /// # Errors
    /// [`Error::PlaybackResource`](crate::Error::PlaybackResource) if the gain
    /// stage cannot be created; the controller is then idle.
    pub fn load_buffer(&mut self, buffer: PlayableBuffer) -> Result<()> {
        let had_session = self.release_session();

        let gain = match self.context.create_gain() {
            Ok(gain) => gain,
            Err(e) => {
                if had_session {
                    self.emit_state();
                }
                return Err(e);
            }
        };

        self.sessions_created += 1;
        let duration = buffer.duration_seconds();
        self.session = Some(Session {
            id: self.sessions_created,
            buffer,
            gain,
            muted: false,
            transport: Transport::loaded(),
        });

        self.emit(PlayerEvent::BufferLoaded { duration });
        self.emit_state();
        Ok(())
    }

    /// Start (or resume) playback from the paused offset.
    ///
    /// Ignored when idle or already playing. A suspended context is resumed
    /// first. An offset at or past the end of the clip plays from 0.
    ///
    /// # Errors
    /// [`Error::PlaybackResource`] if the context is closed, cannot be
    /// resumed, or a source cannot be started; the controller stays stopped
    /// at the same offset.
    pub fn play(&mut self) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        let paused_offset = match session.transport {
            Transport::Playing { .. } => return Ok(()),
            Transport::Stopped { paused_offset } => paused_offset,
        };

        match self.context.state() {
            ContextState::Running => {}
            ContextState::Suspended => self.context.resume()?,
            ContextState::Closed => {
                return Err(Error::PlaybackResource(
                    "audio output is closed".to_string(),
                ));
            }
        }

        let offset = if paused_offset >= session.duration() {
            0.0
        } else {
            paused_offset.max(0.0)
        };

        let node = self.context.create_source(&session.buffer)?;
        let source = ActiveSource::start(node, &session.gain, offset)?;

        session.transport = Transport::Playing {
            segment_start: self.context.current_time() - offset,
            source,
        };
        self.scheduler.arm(session.id);

        self.emit_state();
        Ok(())
    }

    /// Pause playback, freezing the elapsed position.
    ///
    /// Ignored unless playing.
    pub fn pause(&mut self) {
        let now = self.context.current_time();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.transport.is_playing() {
            return;
        }

        let paused_offset = session.transport.elapsed_at(now, session.duration());
        self.scheduler.cancel();
        session.transport = Transport::Stopped { paused_offset };

        self.emit_state();
    }

    /// Play from 0, whether playing, paused or ended.
    ///
    /// # Errors
    /// As [`play`](Self::play); on failure the transport is stopped at 0.
    pub fn restart(&mut self) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };

        self.scheduler.cancel();
        session.transport = Transport::Stopped { paused_offset: 0.0 };

        let result = self.play();
        if result.is_err() {
            self.emit_state();
        }
        result
    }

    /// Pause when playing, play when stopped
    pub fn toggle(&mut self) -> Result<()> {
        match self.status() {
            PlaybackStatus::Playing => {
                self.pause();
                Ok(())
            }
            PlaybackStatus::Stopped => self.play(),
            PlaybackStatus::Idle => Ok(()),
        }
    }

    /// Flip the gain stage between 0 and 1.
    ///
    /// Returns the new mute state (`false` when idle). Transport is untouched.
    pub fn toggle_mute(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };

        session.muted = !session.muted;
        session.gain.set_gain(if session.muted { 0.0 } else { 1.0 });

        let muted = session.muted;
        self.emit(PlayerEvent::MuteChanged { muted });
        muted
    }

    /// Poll progress with the currently armed ticket, if any
    pub fn tick(&mut self) -> TickOutcome {
        match self.scheduler.current() {
            Some(ticket) => self.poll(ticket),
            None => TickOutcome::Idle,
        }
    }

    /// Poll progress on behalf of the loop identified by `ticket`.
    ///
    /// A revoked ticket (paused, replaced or torn down since it was issued)
    /// does nothing. Reaching the end of the clip rewinds to 0, releases the
    /// source and stops polling. A closed context can never reach the end, so
    /// it tears the session down instead.
    pub fn poll(&mut self, ticket: FrameTicket) -> TickOutcome {
        if !self.scheduler.is_armed_for(ticket) {
            return TickOutcome::Idle;
        }

        if self.context.state() == ContextState::Closed {
            self.teardown();
            return TickOutcome::OutputClosed;
        }

        let now = self.context.current_time();
        let Some(session) = self
            .session
            .as_mut()
            .filter(|s| s.id == ticket.session && s.transport.is_playing())
        else {
            self.scheduler.cancel();
            return TickOutcome::Idle;
        };

        let duration = session.duration();
        let Transport::Playing { segment_start, .. } = session.transport else {
            return TickOutcome::Idle;
        };
        let elapsed = now - segment_start;

        if elapsed >= duration {
            self.scheduler.cancel();
            session.transport = Transport::Stopped { paused_offset: 0.0 };

            self.emit(PlayerEvent::Progress {
                elapsed: 0.0,
                duration,
            });
            self.emit(PlayerEvent::Ended { duration });
            self.emit_state();
            return TickOutcome::Ended;
        }

        let elapsed = elapsed.max(0.0);
        self.emit(PlayerEvent::Progress { elapsed, duration });
        TickOutcome::Progress(elapsed)
    }

    /// Release the session and stop polling. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        if self.release_session() {
            self.emit_state();
        }
    }

    /// Whether the progress loop is armed
    pub fn is_scheduled(&self) -> bool {
        self.scheduler.is_armed()
    }

    /// Ticket of the armed progress loop
    pub fn frame_ticket(&self) -> Option<FrameTicket> {
        self.scheduler.current()
    }

    pub fn status(&self) -> PlaybackStatus {
        self.session
            .as_ref()
            .map_or(PlaybackStatus::Idle, |s| s.transport.status())
    }

    pub fn is_playing(&self) -> bool {
        self.status() == PlaybackStatus::Playing
    }

    pub fn is_muted(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.muted)
    }

    /// Elapsed seconds, clamped to the clip (0 when idle)
    pub fn elapsed(&self) -> f64 {
        self.session.as_ref().map_or(0.0, |s| {
            s.transport
                .elapsed_at(self.context.current_time(), s.duration())
        })
    }

    /// Duration of the loaded clip (0 when idle)
    pub fn duration(&self) -> f64 {
        self.session.as_ref().map_or(0.0, |s| s.duration())
    }

    pub fn buffer(&self) -> Option<&PlayableBuffer> {
        self.session.as_ref().map(|s| &s.buffer)
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        match &self.session {
            None => PlayerSnapshot::idle(),
            Some(session) => PlayerSnapshot {
                status: session.transport.status(),
                is_playing: session.transport.is_playing(),
                elapsed: session
                    .transport
                    .elapsed_at(self.context.current_time(), session.duration()),
                duration: session.duration(),
                muted: session.muted,
            },
        }
    }

    /// Cancel polling and drop the session together. Returns whether a
    /// session existed.
    fn release_session(&mut self) -> bool {
        self.scheduler.cancel();
        self.session.take().is_some()
    }

    fn emit(&self, event: PlayerEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    fn emit_state(&self) {
        self.emit(PlayerEvent::StateChanged {
            snapshot: self.snapshot(),
        });
    }
}

impl<C: OutputContext> Drop for PlaybackController<C> {
    fn drop(&mut self) {
        self.release_session();
    }
}

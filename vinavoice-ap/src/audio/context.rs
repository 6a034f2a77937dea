//! Output context abstraction
//!
//! An output context is the host audio subsystem: a monotonic clock plus a
//! small graph of connectable nodes. The playback controller only talks to
//! these traits, so the same controller drives a real device or a virtual
//! (headless) graph.
//!
//! Node handles are ownership-bearing: whoever holds a source decides when it
//! stops. [`ActiveSource`] ties that decision to scope.

use crate::audio::types::PlayableBuffer;
use crate::error::Result;

/// Whether the context clock is advancing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Running,
    Suspended,
    /// The output failed (device lost, stream error). The clock will not
    /// advance again and the context cannot be resumed.
    Closed,
}

/// Host audio subsystem
pub trait OutputContext {
    type Source: SourceNode<Gain = Self::Gain>;
    type Gain: GainNode;

    /// Monotonic audio clock in seconds. Frozen while suspended.
    fn current_time(&self) -> f64;

    fn state(&self) -> ContextState;

    /// Resume a suspended clock. No-op when already running; an error when closed.
    fn resume(&mut self) -> Result<()>;

    /// Create a gain stage connected to the context destination
    fn create_gain(&mut self) -> Result<Self::Gain>;

    /// Create a fresh one-shot source bound to `buffer`
    fn create_source(&mut self, buffer: &PlayableBuffer) -> Result<Self::Source>;
}

/// One-shot playback unit. Never restarted after `stop`.
pub trait SourceNode {
    type Gain;

    fn connect(&mut self, gain: &Self::Gain) -> Result<()>;

    /// Begin output `offset` seconds into the buffer
    fn start(&mut self, offset: f64) -> Result<()>;

    /// Stop output. Stopping twice (or before start) is not an error.
    fn stop(&mut self);

    fn disconnect(&mut self);
}

/// Gain stage between sources and the destination
pub trait GainNode {
    fn set_gain(&mut self, gain: f32);

    fn gain(&self) -> f32;

    fn disconnect(&mut self);
}

/// Scoped owner of a started source.
///
/// Dropping the guard stops and disconnects the source, so every exit path
/// (pause, end of clip, buffer replacement, teardown, error) releases it.
#[derive(Debug)]
pub struct ActiveSource<S: SourceNode> {
    node: S,
}

impl<S: SourceNode> ActiveSource<S> {
    /// Connect `node` through `gain` and start it at `offset`.
    ///
    /// On failure the node is released before the error is returned.
    pub fn start(node: S, gain: &S::Gain, offset: f64) -> Result<Self> {
        let mut guard = Self { node };
        guard.node.connect(gain)?;
        guard.node.start(offset)?;
        Ok(guard)
    }
}

impl<S: SourceNode> Drop for ActiveSource<S> {
    fn drop(&mut self) {
        self.node.stop();
        self.node.disconnect();
    }
}

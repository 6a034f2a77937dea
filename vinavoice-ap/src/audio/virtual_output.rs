//! Virtual (headless) output context
//!
//! Implements the output-context traits without an audio device:
//! - The clock only moves when [`VirtualClock::advance`] is called
//! - The node graph is bookkeeping only; [`VirtualGraph`] exposes it for inspection
//!
//! Used by `--null-output` and by the test suites, which need to drive the
//! clock deterministically and check node ownership.

use crate::audio::context::{ContextState, GainNode, OutputContext, SourceNode};
use crate::audio::types::PlayableBuffer;
use crate::error::{Error, Result};
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared handle to a manually advanced audio clock
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    inner: Arc<Mutex<ClockInner>>,
}

#[derive(Debug, Default)]
struct ClockInner {
    now: f64,
    suspended: bool,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ClockInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current clock reading in seconds
    pub fn now(&self) -> f64 {
        self.lock().now
    }

    /// Move the clock forward. Ignored while suspended.
    pub fn advance(&self, seconds: f64) {
        let mut inner = self.lock();
        if !inner.suspended && seconds > 0.0 {
            inner.now += seconds;
        }
    }

    /// Freeze the clock, as a host does before the first user gesture
    pub fn suspend(&self) {
        self.lock().suspended = true;
    }

    pub fn is_suspended(&self) -> bool {
        self.lock().suspended
    }

    fn resume(&self) {
        self.lock().suspended = false;
    }
}

/// Bookkeeping for one virtual source node
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    pub id: u64,
    /// Gain stage the source is connected to
    pub connected_gain: Option<u64>,
    /// Offset passed to `start`, if started
    pub start_offset: Option<f64>,
    pub stopped: bool,
    pub stop_calls: u32,
}

impl SourceRecord {
    /// Started, not stopped, and still wired into the graph
    pub fn is_live(&self) -> bool {
        self.start_offset.is_some() && !self.stopped && self.connected_gain.is_some()
    }
}

/// Bookkeeping for one virtual gain node
#[derive(Debug, Clone, PartialEq)]
pub struct GainRecord {
    pub id: u64,
    pub gain: f32,
    pub connected: bool,
}

#[derive(Debug, Default)]
struct GraphLog {
    next_id: u64,
    sources: Vec<SourceRecord>,
    gains: Vec<GainRecord>,
    fail_next_source: bool,
    fail_next_gain: bool,
    fail_resume: bool,
    closed: bool,
}

impl GraphLog {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn source_mut(&mut self, id: u64) -> Option<&mut SourceRecord> {
        self.sources.iter_mut().find(|s| s.id == id)
    }

    fn gain_mut(&mut self, id: u64) -> Option<&mut GainRecord> {
        self.gains.iter_mut().find(|g| g.id == id)
    }
}

/// Shared handle for inspecting (and sabotaging) the virtual node graph
#[derive(Debug, Clone, Default)]
pub struct VirtualGraph {
    inner: Arc<Mutex<GraphLog>>,
}

impl VirtualGraph {
    fn lock(&self) -> MutexGuard<'_, GraphLog> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Total source nodes ever created
    pub fn sources_created(&self) -> usize {
        self.lock().sources.len()
    }

    /// Sources currently producing output into a gain stage
    pub fn live_sources(&self) -> usize {
        self.lock().sources.iter().filter(|s| s.is_live()).count()
    }

    pub fn source(&self, id: u64) -> Option<SourceRecord> {
        self.lock().sources.iter().find(|s| s.id == id).cloned()
    }

    /// Most recently created source
    pub fn last_source(&self) -> Option<SourceRecord> {
        self.lock().sources.last().cloned()
    }

    /// Gain stages still connected to the destination
    pub fn connected_gains(&self) -> usize {
        self.lock().gains.iter().filter(|g| g.connected).count()
    }

    /// Multiplier of the most recently created connected gain stage
    pub fn active_gain(&self) -> Option<f32> {
        self.lock()
            .gains
            .iter()
            .rev()
            .find(|g| g.connected)
            .map(|g| g.gain)
    }

    /// Make the next `create_source` call fail
    pub fn fail_next_source(&self) {
        self.lock().fail_next_source = true;
    }

    /// Make the next `create_gain` call fail
    pub fn fail_next_gain(&self) {
        self.lock().fail_next_gain = true;
    }

    /// Make every `resume` call fail, as when the host denies audio
    pub fn fail_resume(&self, fail: bool) {
        self.lock().fail_resume = fail;
    }

    /// Fail the output for good, as when the device is unplugged mid-play
    pub fn close_output(&self) {
        self.lock().closed = true;
    }
}

/// Headless output context
#[derive(Debug, Clone, Default)]
pub struct VirtualContext {
    clock: VirtualClock,
    graph: VirtualGraph,
}

impl VirtualContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clock(&self) -> VirtualClock {
        self.clock.clone()
    }

    pub fn graph(&self) -> VirtualGraph {
        self.graph.clone()
    }
}

impl OutputContext for VirtualContext {
    type Source = VirtualSource;
    type Gain = VirtualGain;

    fn current_time(&self) -> f64 {
        self.clock.now()
    }

    fn state(&self) -> ContextState {
        if self.graph.lock().closed {
            ContextState::Closed
        } else if self.clock.is_suspended() {
            ContextState::Suspended
        } else {
            ContextState::Running
        }
    }

    fn resume(&mut self) -> Result<()> {
        if self.graph.lock().closed {
            return Err(Error::PlaybackResource("audio output is closed".to_string()));
        }
        if self.graph.lock().fail_resume {
            return Err(Error::PlaybackResource(
                "audio output permission denied".to_string(),
            ));
        }
        self.clock.resume();
        Ok(())
    }

    fn create_gain(&mut self) -> Result<VirtualGain> {
        let mut log = self.graph.lock();
        if std::mem::take(&mut log.fail_next_gain) {
            return Err(Error::PlaybackResource("failed to create gain node".to_string()));
        }

        let id = log.allocate_id();
        log.gains.push(GainRecord {
            id,
            gain: 1.0,
            connected: true,
        });

        Ok(VirtualGain {
            id,
            graph: self.graph.clone(),
        })
    }

    fn create_source(&mut self, _buffer: &PlayableBuffer) -> Result<VirtualSource> {
        let mut log = self.graph.lock();
        if std::mem::take(&mut log.fail_next_source) {
            return Err(Error::PlaybackResource(
                "failed to create source node".to_string(),
            ));
        }

        let id = log.allocate_id();
        log.sources.push(SourceRecord {
            id,
            connected_gain: None,
            start_offset: None,
            stopped: false,
            stop_calls: 0,
        });

        Ok(VirtualSource {
            id,
            graph: self.graph.clone(),
        })
    }
}

/// Virtual source node handle
#[derive(Debug)]
pub struct VirtualSource {
    id: u64,
    graph: VirtualGraph,
}

impl VirtualSource {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl SourceNode for VirtualSource {
    type Gain = VirtualGain;

    fn connect(&mut self, gain: &VirtualGain) -> Result<()> {
        let mut log = self.graph.lock();
        let gain_connected = log.gains.iter().any(|g| g.id == gain.id && g.connected);
        if !gain_connected {
            return Err(Error::PlaybackResource(format!(
                "gain node {} is disconnected",
                gain.id
            )));
        }
        if let Some(source) = log.source_mut(self.id) {
            source.connected_gain = Some(gain.id);
        }
        Ok(())
    }

    fn start(&mut self, offset: f64) -> Result<()> {
        let mut log = self.graph.lock();
        let source = log
            .source_mut(self.id)
            .ok_or_else(|| Error::PlaybackResource(format!("unknown source {}", self.id)))?;

        if source.start_offset.is_some() || source.stopped {
            return Err(Error::PlaybackResource(format!(
                "source {} cannot be started twice",
                self.id
            )));
        }
        source.start_offset = Some(offset);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(source) = self.graph.lock().source_mut(self.id) {
            source.stopped = true;
            source.stop_calls += 1;
        }
    }

    fn disconnect(&mut self) {
        if let Some(source) = self.graph.lock().source_mut(self.id) {
            source.connected_gain = None;
        }
    }
}

/// Virtual gain node handle
#[derive(Debug)]
pub struct VirtualGain {
    id: u64,
    graph: VirtualGraph,
}

impl GainNode for VirtualGain {
    fn set_gain(&mut self, gain: f32) {
        if let Some(record) = self.graph.lock().gain_mut(self.id) {
            record.gain = gain;
        }
    }

    fn gain(&self) -> f32 {
        self.graph
            .lock()
            .gains
            .iter()
            .find(|g| g.id == self.id)
            .map(|g| g.gain)
            .unwrap_or(0.0)
    }

    fn disconnect(&mut self) {
        if let Some(record) = self.graph.lock().gain_mut(self.id) {
            record.connected = false;
        }
    }
}

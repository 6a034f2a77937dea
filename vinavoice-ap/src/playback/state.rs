//! Transport state of a loaded session
//!
//! Position bookkeeping lives in one tagged value, so "playing without a
//! source" or "paused with a running segment" cannot be represented.
//! The `Idle` state is the absence of a session, not a variant here.

use crate::audio::context::{ActiveSource, SourceNode};
use vinavoice_common::PlaybackStatus;

/// Transport state for one loaded buffer
#[derive(Debug)]
pub enum Transport<S: SourceNode> {
    /// Loaded and silent: never started, paused, or ended
    Stopped {
        /// Elapsed seconds to resume from
        paused_offset: f64,
    },

    /// A source is producing output
    Playing {
        /// Context clock reading that corresponds to elapsed 0
        segment_start: f64,
        source: ActiveSource<S>,
    },
}

impl<S: SourceNode> Transport<S> {
    /// Transport of a freshly loaded buffer
    pub fn loaded() -> Self {
        Transport::Stopped { paused_offset: 0.0 }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, Transport::Playing { .. })
    }

    pub fn status(&self) -> PlaybackStatus {
        match self {
            Transport::Stopped { .. } => PlaybackStatus::Stopped,
            Transport::Playing { .. } => PlaybackStatus::Playing,
        }
    }

    /// Elapsed seconds at clock reading `now`, clamped to `[0, duration]`
    pub fn elapsed_at(&self, now: f64, duration: f64) -> f64 {
        let elapsed = match self {
            Transport::Stopped { paused_offset } => *paused_offset,
            Transport::Playing { segment_start, .. } => now - segment_start,
        };
        elapsed.clamp(0.0, duration.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::context::OutputContext;
    use crate::audio::types::PlayableBuffer;
    use crate::audio::virtual_output::{VirtualContext, VirtualSource};

    #[test]
    fn test_loaded_transport_is_stopped_at_zero() {
        let transport: Transport<VirtualSource> = Transport::loaded();
        assert!(!transport.is_playing());
        assert_eq!(transport.status(), PlaybackStatus::Stopped);
        assert_eq!(transport.elapsed_at(42.0, 10.0), 0.0);
    }

    #[test]
    fn test_stopped_elapsed_is_frozen() {
        let transport: Transport<VirtualSource> = Transport::Stopped { paused_offset: 3.5 };
        assert_eq!(transport.elapsed_at(0.0, 10.0), 3.5);
        assert_eq!(transport.elapsed_at(100.0, 10.0), 3.5);
    }

    #[test]
    fn test_playing_elapsed_follows_clock() {
        let mut context = VirtualContext::new();
        let buffer = PlayableBuffer::new(vec![0.0; 24_000], 24_000, 1);
        let gain = context.create_gain().unwrap();
        let node = context.create_source(&buffer).unwrap();
        let source = ActiveSource::start(node, &gain, 0.0).unwrap();

        let transport = Transport::Playing {
            segment_start: 2.0,
            source,
        };
        assert!(transport.is_playing());
        assert_eq!(transport.status(), PlaybackStatus::Playing);
        assert_eq!(transport.elapsed_at(2.25, 1.0), 0.25);
        // Clamped to the clip
        assert_eq!(transport.elapsed_at(5.0, 1.0), 1.0);
        assert_eq!(transport.elapsed_at(1.0, 1.0), 0.0);
    }
}

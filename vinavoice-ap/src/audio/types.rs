//! Core audio data types

use std::sync::Arc;

/// Sample rate of synthesized speech payloads
pub const SPEECH_SAMPLE_RATE: u32 = 24_000;

/// Channel count of synthesized speech payloads (mono)
pub const SPEECH_CHANNELS: u16 = 1;

/// PlayableBuffer holds decoded audio ready for output.
///
/// **Format:**
/// - Samples are f32 (floating point -1.0 to 1.0)
/// - Interleaved when `channel_count > 1` (always 1 for speech)
///
/// Immutable once constructed. Cloning shares the sample storage, so an
/// output source can hold the samples without copying them.
#[derive(Debug, Clone)]
pub struct PlayableBuffer {
    samples: Arc<[f32]>,
    sample_rate: u32,
    channel_count: u16,
}

impl PlayableBuffer {
    /// Create a buffer from decoded samples.
    ///
    /// # Panics
    /// Panics if `sample_rate` or `channel_count` is zero.
    pub fn new(samples: Vec<f32>, sample_rate: u32, channel_count: u16) -> Self {
        assert!(sample_rate > 0, "sample rate must be positive");
        assert!(channel_count > 0, "channel count must be positive");

        Self {
            samples: samples.into(),
            sample_rate,
            channel_count,
        }
    }

    /// Raw sample data
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Shared handle to the sample data
    pub fn shared_samples(&self) -> Arc<[f32]> {
        Arc::clone(&self.samples)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    /// Number of frames (one sample per channel)
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channel_count as usize
    }

    /// Duration in seconds (frames / sample rate)
    pub fn duration_seconds(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// AudioFrame represents a single stereo sample (one frame of device output).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioFrame {
    pub left: f32,
    pub right: f32,
}

impl AudioFrame {
    /// Create a silent frame (0.0, 0.0)
    pub fn zero() -> Self {
        AudioFrame { left: 0.0, right: 0.0 }
    }

    /// Create a frame from mono sample (duplicate to both channels)
    pub fn from_mono(sample: f32) -> Self {
        AudioFrame { left: sample, right: sample }
    }

    /// Apply gain to both channels
    pub fn apply_gain(&mut self, gain: f32) {
        self.left *= gain;
        self.right *= gain;
    }

    /// Add another frame to this frame (for mixing)
    pub fn add(&mut self, other: &AudioFrame) {
        self.left += other.left;
        self.right += other.right;
    }

    /// Clamp samples to valid range [-1.0, 1.0] to prevent clipping
    pub fn clamp(&mut self) {
        self.left = self.left.clamp(-1.0, 1.0);
        self.right = self.right.clamp(-1.0, 1.0);
    }
}

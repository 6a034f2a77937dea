//! Test helpers for vinavoice-ap integration tests
//!
//! - Payload builders (i16 samples → base64 little-endian PCM)
//! - A controller wired to a virtual context, with clock and graph handles

#![allow(dead_code)]

use base64::{engine::general_purpose, Engine as _};
use vinavoice_ap::audio::{
    PlayableBuffer, VirtualClock, VirtualContext, VirtualGraph, SPEECH_CHANNELS,
    SPEECH_SAMPLE_RATE,
};
use vinavoice_ap::playback::PlaybackController;

/// Tolerance for clock arithmetic comparisons
pub const EPSILON: f64 = 1e-9;

/// Encode samples the way the synthesis service does
pub fn encode_pcm16(samples: &[i16]) -> String {
    let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    general_purpose::STANDARD.encode(bytes)
}

/// Encode raw bytes as base64
pub fn encode_bytes(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

/// Mono speech-rate clip of the given length
pub fn speech_clip(seconds: f64) -> PlayableBuffer {
    let frames = (seconds * SPEECH_SAMPLE_RATE as f64).round() as usize;
    PlayableBuffer::new(vec![0.25; frames], SPEECH_SAMPLE_RATE, SPEECH_CHANNELS)
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < EPSILON,
        "expected {}, got {}",
        expected,
        actual
    );
}

/// Controller over a virtual context plus handles to drive and inspect it
pub struct TestPlayer {
    pub player: PlaybackController<VirtualContext>,
    pub clock: VirtualClock,
    pub graph: VirtualGraph,
}

impl TestPlayer {
    pub fn new() -> Self {
        let context = VirtualContext::new();
        let clock = context.clock();
        let graph = context.graph();
        Self {
            player: PlaybackController::new(context),
            clock,
            graph,
        }
    }

    /// Player with a clip of `seconds` already loaded
    pub fn loaded(seconds: f64) -> Self {
        let mut test = Self::new();
        test.player
            .load_buffer(speech_clip(seconds))
            .expect("Failed to load clip");
        test
    }

    /// Player whose context starts suspended, as before a user gesture
    pub fn suspended() -> Self {
        let test = Self::new();
        test.clock.suspend();
        test
    }

    /// Advance the clock and deliver one frame tick
    pub fn advance_and_tick(&mut self, seconds: f64) -> vinavoice_ap::playback::TickOutcome {
        self.clock.advance(seconds);
        self.player.tick()
    }
}

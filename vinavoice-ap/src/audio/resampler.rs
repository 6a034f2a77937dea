//! Audio resampling using rubato
//!
//! Speech arrives at 24kHz; many output devices refuse to open below 44.1kHz.
//! Sources are converted once, when created, to the device rate.

use crate::error::{Error, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::debug;

/// Audio resampler using rubato for sample rate conversion.
pub struct Resampler;

impl Resampler {
    /// Resample interleaved audio from `input_rate` to `output_rate`.
    ///
    /// # Notes
    /// Returns a copy when the rates already match or the input is empty
    pub fn resample(
        input: &[f32],
        input_rate: u32,
        output_rate: u32,
        channels: u16,
    ) -> Result<Vec<f32>> {
        if input_rate == output_rate || input.is_empty() {
            return Ok(input.to_vec());
        }

        debug!(
            "Resampling from {}Hz to {}Hz ({} channels)",
            input_rate, output_rate, channels
        );

        // rubato expects planar format
        let planar_input = Self::deinterleave(input, channels);
        let input_frames = planar_input[0].len();

        // Whole clip in one chunk
        let mut resampler = FastFixedIn::<f32>::new(
            output_rate as f64 / input_rate as f64,
            1.0,
            PolynomialDegree::Septic,
            input_frames,
            channels as usize,
        )
        .map_err(|e| Error::PlaybackResource(format!("Failed to create resampler: {}", e)))?;

        let planar_output = resampler
            .process(&planar_input, None)
            .map_err(|e| Error::PlaybackResource(format!("Resampling failed: {}", e)))?;

        let interleaved = Self::interleave(planar_output);

        debug!(
            "Resampled {} input frames to {} output frames",
            input_frames,
            interleaved.len() / channels as usize
        );

        Ok(interleaved)
    }

    /// Convert interleaved samples to planar format.
    ///
    /// Input:  [L, R, L, R, L, R, ...]
    /// Output: [[L, L, L, ...], [R, R, R, ...]]
    fn deinterleave(samples: &[f32], channels: u16) -> Vec<Vec<f32>> {
        let num_channels = channels as usize;
        let num_frames = samples.len() / num_channels;

        let mut planar = vec![Vec::with_capacity(num_frames); num_channels];
        for frame in samples.chunks_exact(num_channels) {
            for (ch_idx, sample) in frame.iter().enumerate() {
                planar[ch_idx].push(*sample);
            }
        }

        planar
    }

    /// Convert planar samples to interleaved format.
    fn interleave(planar: Vec<Vec<f32>>) -> Vec<f32> {
        if planar.is_empty() {
            return Vec::new();
        }

        let num_channels = planar.len();
        let num_frames = planar[0].len();
        let mut interleaved = Vec::with_capacity(num_frames * num_channels);

        for frame_idx in 0..num_frames {
            for channel in &planar {
                interleaved.push(channel[frame_idx]);
            }
        }

        interleaved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deinterleave() {
        let interleaved = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let planar = Resampler::deinterleave(&interleaved, 2);

        assert_eq!(planar, vec![vec![1.0, 3.0, 5.0], vec![2.0, 4.0, 6.0]]);
    }

    #[test]
    fn test_interleave() {
        let planar = vec![vec![1.0, 3.0, 5.0], vec![2.0, 4.0, 6.0]];
        assert_eq!(Resampler::interleave(planar), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert!(Resampler::interleave(Vec::new()).is_empty());
    }

    #[test]
    fn test_resample_same_rate() {
        let input = vec![0.1, 0.2, 0.3];
        let output = Resampler::resample(&input, 24_000, 24_000, 1).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_resample_empty_input() {
        let output = Resampler::resample(&[], 24_000, 48_000, 1).unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn test_resample_speech_to_device_rate() {
        let input_rate = 24_000;
        let frames = 2_400;
        let input: Vec<f32> = (0..frames)
            .map(|i| {
                let t = i as f32 / input_rate as f32;
                (2.0 * std::f32::consts::PI * 220.0 * t).sin() * 0.5
            })
            .collect();

        let output = Resampler::resample(&input, input_rate, 48_000, 1).unwrap();

        // Roughly twice as many frames, allowing for resampler delay
        let expected = frames * 2;
        assert!(
            output.len() + 20 >= expected && output.len() <= expected + 20,
            "Expected ~{} frames, got {}",
            expected,
            output.len()
        );
    }
}

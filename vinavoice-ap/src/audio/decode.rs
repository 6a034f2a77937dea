//! Speech payload decoder
//!
//! Synthesis returns raw PCM wrapped in base64:
//! - 16-bit signed samples, little-endian
//! - No header; sample rate and channel count are fixed by the caller
//!
//! Decoding is a pure function of its input. The same payload always yields
//! the same samples.

use crate::audio::types::PlayableBuffer;
use crate::error::{DecodeError, Result};
use base64::{engine::general_purpose, Engine as _};
use std::io::Read;
use std::path::Path;

/// Bytes per 16-bit PCM sample
pub const BYTES_PER_SAMPLE: usize = 2;

/// Normalization divisor mapping i16 onto [-1.0, 1.0)
const I16_SCALE: f32 = 32768.0;

/// Decode a base64 PCM payload into a playable buffer.
///
/// Surrounding whitespace is ignored. Interior whitespace is not.
///
/// # Errors
/// - [`DecodeError::EmptyPayload`] for an empty (or whitespace-only) payload
/// - [`DecodeError::InvalidBase64`] when the text is not base64
/// - [`DecodeError::TruncatedSample`] when the byte count is odd
///
/// # Examples
///
/// ```
/// use vinavoice_ap::audio::decode::decode_speech_payload;
///
/// // Two samples: 0x4000 (0.5) and 0xC000 (-0.5)
/// let buffer = decode_speech_payload("AEAAwA==", 24_000, 1).unwrap();
/// assert_eq!(buffer.samples(), &[0.5, -0.5]);
/// ```
pub fn decode_speech_payload(
    payload: &str,
    sample_rate: u32,
    channel_count: u16,
) -> Result<PlayableBuffer, DecodeError> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Err(DecodeError::EmptyPayload);
    }

    let bytes = general_purpose::STANDARD.decode(payload)?;
    let samples = pcm16_le_to_f32(&bytes)?;

    Ok(PlayableBuffer::new(samples, sample_rate, channel_count))
}

/// Read a payload from `path` ("-" reads stdin) and decode it.
///
/// # Errors
/// [`Error::Io`](crate::Error::Io) when the payload cannot be read,
/// [`Error::Decode`](crate::Error::Decode) when it cannot be decoded.
pub fn read_speech_payload(
    path: &Path,
    sample_rate: u32,
    channel_count: u16,
) -> Result<PlayableBuffer> {
    let text = if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        text
    } else {
        std::fs::read_to_string(path)?
    };

    Ok(decode_speech_payload(&text, sample_rate, channel_count)?)
}

/// Convert little-endian 16-bit PCM bytes to normalized f32 samples.
///
/// Every byte pair becomes one sample divided by 32768.
pub fn pcm16_le_to_f32(bytes: &[u8]) -> Result<Vec<f32>, DecodeError> {
    if bytes.len() % BYTES_PER_SAMPLE != 0 {
        return Err(DecodeError::TruncatedSample {
            byte_len: bytes.len(),
        });
    }

    Ok(bytes
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / I16_SCALE)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::types::{SPEECH_CHANNELS, SPEECH_SAMPLE_RATE};

    fn encode(samples: &[i16]) -> String {
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn test_decode_normalizes_samples() {
        let original = [0i16, 1, -1, 16384, -16384, i16::MAX, i16::MIN];
        let buffer =
            decode_speech_payload(&encode(&original), SPEECH_SAMPLE_RATE, SPEECH_CHANNELS).unwrap();

        assert_eq!(buffer.samples().len(), original.len());
        for (decoded, raw) in buffer.samples().iter().zip(original.iter()) {
            assert!((decoded - *raw as f32 / 32768.0).abs() < f32::EPSILON);
        }
        assert_eq!(buffer.samples()[6], -1.0);
        assert!(buffer.samples()[5] < 1.0);
    }

    #[test]
    fn test_decode_duration_matches_sample_count() {
        let original = vec![100i16; 12_000];
        let buffer =
            decode_speech_payload(&encode(&original), SPEECH_SAMPLE_RATE, SPEECH_CHANNELS).unwrap();

        assert_eq!(buffer.sample_rate(), 24_000);
        assert_eq!(buffer.channel_count(), 1);
        assert_eq!(buffer.duration_seconds(), 0.5);
    }

    #[test]
    fn test_decode_is_deterministic() {
        let payload = encode(&[123, -456, 7890, -32000]);
        let first = decode_speech_payload(&payload, SPEECH_SAMPLE_RATE, SPEECH_CHANNELS).unwrap();
        let second = decode_speech_payload(&payload, SPEECH_SAMPLE_RATE, SPEECH_CHANNELS).unwrap();
        assert_eq!(first.samples(), second.samples());
    }

    #[test]
    fn test_decode_trims_surrounding_whitespace() {
        let payload = format!("  {}\n", encode(&[16384]));
        let buffer = decode_speech_payload(&payload, SPEECH_SAMPLE_RATE, SPEECH_CHANNELS).unwrap();
        assert_eq!(buffer.samples(), &[0.5]);
    }

    #[test]
    fn test_odd_byte_count_rejected() {
        // "AAAA" decodes to 3 bytes
        let result = decode_speech_payload("AAAA", SPEECH_SAMPLE_RATE, SPEECH_CHANNELS);
        match result {
            Err(DecodeError::TruncatedSample { byte_len }) => assert_eq!(byte_len, 3),
            other => panic!("Expected TruncatedSample, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_base64_rejected() {
        let result = decode_speech_payload("not base64!", SPEECH_SAMPLE_RATE, SPEECH_CHANNELS);
        assert!(matches!(result, Err(DecodeError::InvalidBase64(_))));
    }

    #[test]
    fn test_empty_payload_rejected() {
        assert!(matches!(
            decode_speech_payload("", SPEECH_SAMPLE_RATE, SPEECH_CHANNELS),
            Err(DecodeError::EmptyPayload)
        ));
        assert!(matches!(
            decode_speech_payload(" \n\t", SPEECH_SAMPLE_RATE, SPEECH_CHANNELS),
            Err(DecodeError::EmptyPayload)
        ));
    }

    #[test]
    fn test_pcm_conversion_little_endian() {
        // 0x0100 little-endian = 1, 0x00 0x80 = -32768
        let samples = pcm16_le_to_f32(&[0x01, 0x00, 0x00, 0x80]).unwrap();
        assert_eq!(samples, vec![1.0 / 32768.0, -1.0]);
    }
}

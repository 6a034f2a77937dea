//! Audio subsystem: payload decoding, output contexts and resampling

pub mod context;
pub mod decode;
pub mod output;
pub mod resampler;
pub mod types;
pub mod virtual_output;

pub use context::{ActiveSource, ContextState, GainNode, OutputContext, SourceNode};
pub use decode::{decode_speech_payload, read_speech_payload};
pub use output::DeviceContext;
pub use types::{AudioFrame, PlayableBuffer, SPEECH_CHANNELS, SPEECH_SAMPLE_RATE};
pub use virtual_output::{VirtualClock, VirtualContext, VirtualGraph};

//! Audio output using cpal
//!
//! [`DeviceContext`] is the real-device output context:
//! - One cpal output stream, built paused (the context starts suspended)
//! - A small mixer shared with the audio callback holds sources and gain stages
//! - The clock counts frames actually rendered, so it stops while suspended
//! - A stream error closes the context for good

use crate::audio::context::{ContextState, GainNode, OutputContext, SourceNode};
use crate::audio::resampler::Resampler;
use crate::audio::types::{AudioFrame, PlayableBuffer};
use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

/// Source playing inside the mixer
#[derive(Debug)]
struct Voice {
    id: u64,
    /// Samples already converted to the device rate
    samples: Arc<[f32]>,
    channels: usize,
    /// Next frame to render
    position: usize,
    gain_id: Option<u64>,
    playing: bool,
}

impl Voice {
    fn frame_count(&self) -> usize {
        self.samples.len() / self.channels
    }

    fn next_frame(&mut self) -> Option<AudioFrame> {
        if !self.playing || self.position >= self.frame_count() {
            return None;
        }

        let base = self.position * self.channels;
        self.position += 1;

        let frame = if self.channels == 1 {
            AudioFrame::from_mono(self.samples[base])
        } else {
            AudioFrame {
                left: self.samples[base],
                right: self.samples[base + 1],
            }
        };
        Some(frame)
    }
}

/// Audio graph shared between the control thread and the audio callback
#[derive(Debug, Default)]
struct Mixer {
    next_id: u64,
    voices: Vec<Voice>,
    /// (gain id, multiplier) for every connected gain stage
    gains: Vec<(u64, f32)>,
}

impl Mixer {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn gain_of(&self, id: u64) -> Option<f32> {
        self.gains.iter().find(|(gid, _)| *gid == id).map(|(_, g)| *g)
    }

    fn voice_mut(&mut self, id: u64) -> Option<&mut Voice> {
        self.voices.iter_mut().find(|v| v.id == id)
    }

    /// Mix one output frame from every playing, connected voice
    fn render_frame(&mut self) -> AudioFrame {
        let mut mixed = AudioFrame::zero();
        let gains = &self.gains;

        for voice in self.voices.iter_mut() {
            let Some(gain) = voice
                .gain_id
                .and_then(|id| gains.iter().find(|(gid, _)| *gid == id).map(|(_, g)| *g))
            else {
                continue;
            };

            if let Some(mut frame) = voice.next_frame() {
                frame.apply_gain(gain);
                mixed.add(&frame);
            }
        }

        mixed.clamp();
        mixed
    }
}

fn lock_mixer(mixer: &Mutex<Mixer>) -> MutexGuard<'_, Mixer> {
    mixer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Device-rate copy of the most recently played clip.
///
/// Every segment needs a fresh source, so without this each resume would
/// resample the whole clip again.
#[derive(Debug, Default)]
struct ResampleCache {
    entry: Option<CachedClip>,
}

#[derive(Debug)]
struct CachedClip {
    /// Speech-rate samples the entry was made from
    source: Arc<[f32]>,
    output_rate: u32,
    samples: Arc<[f32]>,
}

impl ResampleCache {
    /// Samples of `buffer` at `output_rate`, resampling only on a cache miss
    fn samples_for(&mut self, buffer: &PlayableBuffer, output_rate: u32) -> Result<Arc<[f32]>> {
        let source = buffer.shared_samples();
        if buffer.sample_rate() == output_rate {
            return Ok(source);
        }

        if let Some(cached) = &self.entry {
            if cached.output_rate == output_rate && Arc::ptr_eq(&cached.source, &source) {
                return Ok(Arc::clone(&cached.samples));
            }
        }

        let samples: Arc<[f32]> = Resampler::resample(
            buffer.samples(),
            buffer.sample_rate(),
            output_rate,
            buffer.channel_count(),
        )?
        .into();

        self.entry = Some(CachedClip {
            source,
            output_rate,
            samples: Arc::clone(&samples),
        });
        Ok(samples)
    }
}

/// Output context backed by an audio device
pub struct DeviceContext {
    device: Device,
    config: StreamConfig,
    stream: Stream,
    mixer: Arc<Mutex<Mixer>>,
    frames_rendered: Arc<AtomicU64>,
    /// Set by the stream error callback
    error_flag: Arc<AtomicBool>,
    suspended: bool,
    resampled: ResampleCache,
}

impl DeviceContext {
    /// List available audio output devices.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();

        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::PlaybackResource(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    /// Open an output device.
    ///
    /// # Arguments
    /// - `device_name`: Optional device name (None = default device). A name
    ///   that cannot be found falls back to the default device.
    /// - `preferred_rate`: Sample rate to request (speech rate); the device
    ///   default is used when the rate is unsupported
    ///
    /// The stream is built paused; the context starts [`ContextState::Suspended`].
    pub fn open(device_name: Option<&str>, preferred_rate: u32) -> Result<Self> {
        let host = cpal::default_host();
        let device = Self::select_device(&host, device_name)?;
        let (config, sample_format) = Self::get_best_config(&device, preferred_rate)?;

        debug!(
            "Audio config: sample_rate={}, channels={}, format={:?}",
            config.sample_rate.0, config.channels, sample_format
        );

        let mixer = Arc::new(Mutex::new(Mixer::default()));
        let frames_rendered = Arc::new(AtomicU64::new(0));
        let error_flag = Arc::new(AtomicBool::new(false));

        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(
                &device, &config, &mixer, &frames_rendered, &error_flag,
            )?,
            SampleFormat::I16 => Self::build_stream::<i16>(
                &device, &config, &mixer, &frames_rendered, &error_flag,
            )?,
            SampleFormat::U16 => Self::build_stream::<u16>(
                &device, &config, &mixer, &frames_rendered, &error_flag,
            )?,
            sample_format => {
                return Err(Error::PlaybackResource(format!(
                    "Unsupported sample format: {:?}",
                    sample_format
                )));
            }
        };

        // Some hosts start streams on build
        if let Err(e) = stream.pause() {
            debug!("Stream pause after build not supported: {}", e);
        }

        Ok(Self {
            device,
            config,
            stream,
            mixer,
            frames_rendered,
            error_flag,
            suspended: true,
            resampled: ResampleCache::default(),
        })
    }

    fn select_device(host: &cpal::Host, device_name: Option<&str>) -> Result<Device> {
        if let Some(name) = device_name {
            let mut devices = host
                .output_devices()
                .map_err(|e| Error::PlaybackResource(format!("Failed to enumerate devices: {}", e)))?;

            if let Some(device) = devices.find(|d| d.name().ok().as_deref() == Some(name)) {
                info!("Found requested audio device: {}", name);
                return Ok(device);
            }
            warn!("Requested device '{}' not found, falling back to default device", name);
        }

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::PlaybackResource("No default output device found".to_string()))?;

        info!(
            "Using default audio device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );
        Ok(device)
    }

    /// Get the best supported configuration for playback.
    ///
    /// Prefers the requested rate with f32 samples, then the requested rate in
    /// any format, then the device default.
    fn get_best_config(device: &Device, preferred_rate: u32) -> Result<(StreamConfig, SampleFormat)> {
        let supported: Vec<_> = device
            .supported_output_configs()
            .map_err(|e| Error::PlaybackResource(format!("Failed to get device configs: {}", e)))?
            .filter(|c| {
                c.min_sample_rate().0 <= preferred_rate && c.max_sample_rate().0 >= preferred_rate
            })
            .collect();

        let preferred = supported
            .iter()
            .find(|c| c.sample_format() == SampleFormat::F32)
            .or_else(|| supported.first());

        if let Some(range) = preferred {
            let sample_format = range.sample_format();
            let config = range
                .clone()
                .with_sample_rate(cpal::SampleRate(preferred_rate))
                .config();
            return Ok((config, sample_format));
        }

        let fallback = device
            .default_output_config()
            .map_err(|e| Error::PlaybackResource(format!("Failed to get default config: {}", e)))?;

        debug!(
            "Device does not support {}Hz, using default {}Hz",
            preferred_rate,
            fallback.sample_rate().0
        );
        Ok((fallback.config(), fallback.sample_format()))
    }

    fn build_stream<T: SizedSample + FromSample<f32>>(
        device: &Device,
        config: &StreamConfig,
        mixer: &Arc<Mutex<Mixer>>,
        frames_rendered: &Arc<AtomicU64>,
        error_flag: &Arc<AtomicBool>,
    ) -> Result<Stream> {
        let channels = config.channels as usize;
        let mixer = Arc::clone(mixer);
        let frames_rendered = Arc::clone(frames_rendered);
        let error_flag = Arc::clone(error_flag);

        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let mut mixer = lock_mixer(&mixer);
                    let mut frames = 0u64;

                    for frame in data.chunks_mut(channels) {
                        let audio_frame = mixer.render_frame();
                        frame[0] = T::from_sample(audio_frame.left);
                        if channels > 1 {
                            frame[1] = T::from_sample(audio_frame.right);
                        }
                        for extra in frame.iter_mut().skip(2) {
                            *extra = T::from_sample(0.0f32);
                        }
                        frames += 1;
                    }

                    frames_rendered.fetch_add(frames, Ordering::Relaxed);
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                    error_flag.store(true, Ordering::SeqCst);
                },
                None,
            )
            .map_err(|e| Error::PlaybackResource(format!("Failed to build stream: {}", e)))
    }

    /// Get device name.
    pub fn device_name(&self) -> String {
        self.device
            .name()
            .unwrap_or_else(|_| "Unknown".to_string())
    }

    /// Device sample rate (the rate sources are converted to)
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    pub fn channels(&self) -> u16 {
        self.config.channels
    }
}

impl OutputContext for DeviceContext {
    type Source = DeviceSource;
    type Gain = DeviceGain;

    fn current_time(&self) -> f64 {
        self.frames_rendered.load(Ordering::Relaxed) as f64 / self.sample_rate() as f64
    }

    fn state(&self) -> ContextState {
        if self.error_flag.load(Ordering::SeqCst) {
            ContextState::Closed
        } else if self.suspended {
            ContextState::Suspended
        } else {
            ContextState::Running
        }
    }

    fn resume(&mut self) -> Result<()> {
        match self.state() {
            ContextState::Running => return Ok(()),
            ContextState::Closed => {
                return Err(Error::PlaybackResource(format!(
                    "audio stream on {} has failed",
                    self.device_name()
                )));
            }
            ContextState::Suspended => {}
        }
        self.stream
            .play()
            .map_err(|e| Error::PlaybackResource(format!("Failed to start stream: {}", e)))?;
        self.suspended = false;
        info!("Audio stream started on {}", self.device_name());
        Ok(())
    }

    fn create_gain(&mut self) -> Result<DeviceGain> {
        let mut mixer = lock_mixer(&self.mixer);
        let id = mixer.allocate_id();
        mixer.gains.push((id, 1.0));

        Ok(DeviceGain {
            id,
            gain: 1.0,
            mixer: Arc::clone(&self.mixer),
        })
    }

    fn create_source(&mut self, buffer: &PlayableBuffer) -> Result<DeviceSource> {
        let sample_rate = self.sample_rate();
        let samples = self.resampled.samples_for(buffer, sample_rate)?;

        let mut mixer = lock_mixer(&self.mixer);
        let id = mixer.allocate_id();
        mixer.voices.push(Voice {
            id,
            samples,
            channels: buffer.channel_count() as usize,
            position: 0,
            gain_id: None,
            playing: false,
        });

        Ok(DeviceSource {
            id,
            sample_rate: self.sample_rate(),
            mixer: Arc::clone(&self.mixer),
            started: false,
        })
    }
}

/// Source node living in the device mixer
#[derive(Debug)]
pub struct DeviceSource {
    id: u64,
    sample_rate: u32,
    mixer: Arc<Mutex<Mixer>>,
    started: bool,
}

impl SourceNode for DeviceSource {
    type Gain = DeviceGain;

    fn connect(&mut self, gain: &DeviceGain) -> Result<()> {
        let mut mixer = lock_mixer(&self.mixer);
        if mixer.gain_of(gain.id).is_none() {
            return Err(Error::PlaybackResource(format!(
                "gain node {} is disconnected",
                gain.id
            )));
        }
        let voice = mixer
            .voice_mut(self.id)
            .ok_or_else(|| Error::PlaybackResource(format!("source {} was released", self.id)))?;
        voice.gain_id = Some(gain.id);
        Ok(())
    }

    fn start(&mut self, offset: f64) -> Result<()> {
        if self.started {
            return Err(Error::PlaybackResource(format!(
                "source {} cannot be started twice",
                self.id
            )));
        }

        let mut mixer = lock_mixer(&self.mixer);
        let voice = mixer
            .voice_mut(self.id)
            .ok_or_else(|| Error::PlaybackResource(format!("source {} was released", self.id)))?;

        let start_frame = (offset.max(0.0) * self.sample_rate as f64).round() as usize;
        voice.position = start_frame.min(voice.frame_count());
        voice.playing = true;
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(voice) = lock_mixer(&self.mixer).voice_mut(self.id) {
            voice.playing = false;
        }
    }

    fn disconnect(&mut self) {
        lock_mixer(&self.mixer).voices.retain(|v| v.id != self.id);
    }
}

/// Gain stage living in the device mixer
#[derive(Debug)]
pub struct DeviceGain {
    id: u64,
    gain: f32,
    mixer: Arc<Mutex<Mixer>>,
}

impl GainNode for DeviceGain {
    fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
        let mut mixer = lock_mixer(&self.mixer);
        if let Some(entry) = mixer.gains.iter_mut().find(|(gid, _)| *gid == self.id) {
            entry.1 = gain;
        }
    }

    fn gain(&self) -> f32 {
        self.gain
    }

    fn disconnect(&mut self) {
        lock_mixer(&self.mixer).gains.retain(|(gid, _)| *gid != self.id);
    }
}

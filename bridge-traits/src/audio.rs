//! Audio output and decoding abstractions.
//!
//! The host exposes at most one shared output per process. The engine probes
//! the host once, keeps the resulting [`AudioCapabilities`] for the rest of the
//! process and only then asks for an [`AudioOutput`]. Every started sound is a
//! [`Voice`] created from that output.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;

/// Decoded, ready-to-play audio.
///
/// Samples are interleaved `f32` in `[-1.0, 1.0]`. The sample storage is
/// reference counted so every voice playing the same sound shares one copy.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    samples: Arc<[f32]>,
    sample_rate: u32,
    channels: u16,
}

impl PcmBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
            channels,
        }
    }

    /// Interleaved samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Shared handle to the sample storage.
    pub fn shared_samples(&self) -> Arc<[f32]> {
        Arc::clone(&self.samples)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of frames (one sample per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Playback length of one pass through the buffer.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }
}

/// Fixed description of what the host can do, produced once by
/// [`AudioHost::probe`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioCapabilities {
    /// Whether any audio output exists at all.
    pub available: bool,
    /// Human-readable backend name (e.g. `"rodio"`, `"null"`).
    pub backend: String,
    /// Preferred output sample rate, when known.
    pub sample_rate: Option<u32>,
    /// Output channel count, when known.
    pub channels: Option<u16>,
    /// Why the host is unavailable, when it is.
    pub reason: Option<String>,
}

impl AudioCapabilities {
    pub fn available(backend: impl Into<String>, sample_rate: u32, channels: u16) -> Self {
        Self {
            available: true,
            backend: backend.into(),
            sample_rate: Some(sample_rate),
            channels: Some(channels),
            reason: None,
        }
    }

    pub fn unavailable(backend: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            available: false,
            backend: backend.into(),
            sample_rate: None,
            channels: None,
            reason: Some(reason.into()),
        }
    }
}

/// Lifecycle of the host output as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputState {
    Suspended,
    Running,
    Closed,
}

/// Parameters for a new voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceParams {
    /// Initial gain, already clamped by the caller.
    pub gain: f32,
    /// Whether the voice repeats the buffer until stopped.
    pub looping: bool,
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            gain: 1.0,
            looping: false,
        }
    }
}

/// One playback node: a buffer source feeding a gain stage.
///
/// `stop` must be idempotent and must release the node's output resources.
pub trait Voice: Send + Sync {
    /// Begin rendering.
    fn start(&self) -> Result<()>;

    /// Apply a gain value immediately.
    fn set_gain(&self, gain: f32);

    /// Current gain value.
    fn gain(&self) -> f32;

    /// Halt rendering and disconnect from the output.
    fn stop(&self);

    /// `true` once the voice has been stopped or has run out of samples.
    fn is_finished(&self) -> bool;
}

/// The shared host output.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Current lifecycle state as seen by the host.
    fn state(&self) -> OutputState;

    /// Resume a suspended output. Resuming a running output is a no-op.
    async fn resume(&self) -> Result<()>;

    /// Close the output and release the device. Closing twice is a no-op.
    async fn close(&self) -> Result<()>;

    /// Bind a decoded buffer to a new, not yet started voice.
    fn create_voice(&self, buffer: Arc<PcmBuffer>, params: VoiceParams) -> Result<Box<dyn Voice>>;
}

/// Entry point a host provides for audio output.
pub trait AudioHost: Send + Sync {
    /// Inspect the platform once and describe what is available.
    fn probe(&self) -> AudioCapabilities;

    /// Open the shared output described by `capabilities`.
    fn open(&self, capabilities: &AudioCapabilities) -> Result<Arc<dyn AudioOutput>>;
}

/// Decoder turning encoded asset bytes into PCM.
#[async_trait]
pub trait SampleDecoder: Send + Sync {
    /// Decode `data` completely. `extension_hint` is the candidate's file
    /// extension (`"mp3"`, `"ogg"`, ...) when known.
    async fn decode(&self, data: Bytes, extension_hint: Option<&str>) -> Result<PcmBuffer>;
}

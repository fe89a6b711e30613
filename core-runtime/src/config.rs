//! # Engine Configuration
//!
//! Builder-based configuration for the sound-effect engine.
//!
//! ## Overview
//!
//! [`EngineConfig`] carries the host bridges the engine talks to and the
//! numeric [`EngineTuning`] that governs loading, fades and the ambient loop.
//! The builder fails fast when a required bridge is missing so hosts learn
//! about it at startup instead of on the first click.
//!
//! ## Required Dependencies
//!
//! - `HttpClient` - fetches sound assets (desktop default: reqwest)
//! - `AudioHost` - probes and opens the audio output (desktop default: rodio when
//!   compiled in, otherwise a host that reports no audio)
//!
//! ## Optional Dependencies
//!
//! - `SampleDecoder` - turns fetched bytes into PCM; the engine falls back to
//!   its built-in decoder when none is injected
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{EngineConfig, InteractionGate};
//! use std::sync::Arc;
//!
//! let config = EngineConfig::builder()
//!     .http_client(Arc::new(MyHttpClient))
//!     .audio_host(Arc::new(MyAudioHost))
//!     .interaction_gate(InteractionGate::Explicit)
//!     .fetch_timeout_ms(5_000)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{AudioHost, HttpClient, SampleDecoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// How the engine decides that the user has interacted with the page/app.
///
/// Audio output may only start after a user gesture on most hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionGate {
    /// The first `play_sound` call counts as the interaction.
    #[default]
    FirstPlay,
    /// Only an explicit `notify_user_interaction` call opens the gate.
    /// Playback requested before that returns nothing and records no error.
    Explicit,
}

/// Numeric knobs for loading, fading and the ambient loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineTuning {
    /// Per-candidate fetch timeout
    pub fetch_timeout_ms: u64,
    /// Retries allowed after the first failed load of a sound
    pub max_retries: u32,
    /// Backoff unit; the window after attempt `n` is `n * backoff_base_ms`
    pub backoff_base_ms: u64,
    /// Ambient loop volume
    pub ambient_volume: f32,
    /// Ambient fade-in
    pub ambient_fade_in_ms: u64,
    /// Ambient fade-out on `stop_ambient`
    pub ambient_fade_out_ms: u64,
    /// Share of an operation's duration used for its closing fade
    pub operation_fade_ratio: f64,
    /// Upper bound of the operation closing fade
    pub operation_fade_cap_ms: u64,
    /// Gain a fade-out ramps toward before the voice is stopped
    pub fade_floor: f32,
    /// Interval between gain steps during fades
    pub fade_step_ms: u64,
    /// Sounds preloaded sequentially before the rest of the catalog
    pub critical_sounds: Vec<String>,
    /// How user interaction is detected
    pub interaction_gate: InteractionGate,
}

impl Default for EngineTuning {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: 10_000,
            max_retries: 2,
            backoff_base_ms: 2_000,
            ambient_volume: 0.25,
            ambient_fade_in_ms: 2_000,
            ambient_fade_out_ms: 2_000,
            operation_fade_ratio: 0.1,
            operation_fade_cap_ms: 500,
            fade_floor: 0.01,
            fade_step_ms: 20,
            critical_sounds: ["click", "boot", "success", "error"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            interaction_gate: InteractionGate::FirstPlay,
        }
    }
}

impl EngineTuning {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Total load attempts allowed for one sound (first try plus retries).
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    pub fn ambient_fade_in(&self) -> Duration {
        Duration::from_millis(self.ambient_fade_in_ms)
    }

    pub fn ambient_fade_out(&self) -> Duration {
        Duration::from_millis(self.ambient_fade_out_ms)
    }

    pub fn fade_step(&self) -> Duration {
        Duration::from_millis(self.fade_step_ms.max(1))
    }

    /// Closing fade for an operation of the given length.
    pub fn operation_fade_out(&self, operation: Duration) -> Duration {
        let scaled = operation.as_secs_f64() * self.operation_fade_ratio;
        let scaled = Duration::from_secs_f64(scaled.max(0.0));
        scaled.min(Duration::from_millis(self.operation_fade_cap_ms))
    }

    /// Rejects values that would make the engine misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.fetch_timeout_ms == 0 {
            return Err(Error::Config(
                "Fetch timeout must be greater than 0 ms".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.ambient_volume) {
            return Err(Error::Config(format!(
                "Ambient volume {} is outside 0.0..=1.0",
                self.ambient_volume
            )));
        }

        if !(0.0..=1.0).contains(&self.operation_fade_ratio) {
            return Err(Error::Config(format!(
                "Operation fade ratio {} is outside 0.0..=1.0",
                self.operation_fade_ratio
            )));
        }

        if !(0.0..1.0).contains(&self.fade_floor) {
            return Err(Error::Config(format!(
                "Fade floor {} must be at least 0.0 and below 1.0",
                self.fade_floor
            )));
        }

        if self.max_retries > 10 {
            return Err(Error::Config(
                "Retry ceiling exceeds maximum of 10 retries".to_string(),
            ));
        }

        Ok(())
    }
}

/// Engine configuration: host bridges plus tuning.
///
/// Use [`EngineConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct EngineConfig {
    /// Asset fetcher
    pub http_client: Arc<dyn HttpClient>,
    /// Audio output provider
    pub audio_host: Arc<dyn AudioHost>,
    /// Custom decoder; `None` selects the engine's built-in decoder
    pub decoder: Option<Arc<dyn SampleDecoder>>,
    pub tuning: EngineTuning,
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("http_client", &"HttpClient { ... }")
            .field("audio_host", &"AudioHost { ... }")
            .field(
                "decoder",
                &self.decoder.as_ref().map(|_| "SampleDecoder { ... }"),
            )
            .field("tuning", &self.tuning)
            .finish()
    }
}

impl EngineConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        self.tuning.validate()
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required to fetch sound assets. \
                 Desktop: enable the 'desktop-shims' feature to use the default reqwest client. \
                 Embedded hosts: inject a client that serves the bundled audio directory."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn audio_host_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "AudioHost".to_string(),
        message: "AudioHost implementation is required to open an audio output. \
                 Desktop: enable the 'desktop-shims' feature to use the default output. \
                 Headless hosts: inject a host whose probe reports audio as unavailable."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::new()
        .map_err(|e| Error::BridgeInit(format!("default HttpClient: {}", e)))?;
    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_audio_host() -> Result<Arc<dyn AudioHost>> {
    Ok(bridge_desktop::default_audio_host())
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_audio_host() -> Result<Arc<dyn AudioHost>> {
    Err(audio_host_missing_error())
}

/// Builder for [`EngineConfig`].
#[derive(Default)]
pub struct EngineConfigBuilder {
    http_client: Option<Arc<dyn HttpClient>>,
    audio_host: Option<Arc<dyn AudioHost>>,
    decoder: Option<Arc<dyn SampleDecoder>>,
    tuning: EngineTuning,
}

impl EngineConfigBuilder {
    /// Sets the HTTP client used to fetch assets.
    ///
    /// If not provided, the reqwest-based desktop client is used when the
    /// `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the audio host.
    pub fn audio_host(mut self, host: Arc<dyn AudioHost>) -> Self {
        self.audio_host = Some(host);
        self
    }

    pub fn decoder(mut self, decoder: Arc<dyn SampleDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Replaces the whole tuning block, e.g. one deserialized from JSON.
    pub fn tuning(mut self, tuning: EngineTuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn fetch_timeout_ms(mut self, ms: u64) -> Self {
        self.tuning.fetch_timeout_ms = ms;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.tuning.max_retries = retries;
        self
    }

    pub fn backoff_base_ms(mut self, ms: u64) -> Self {
        self.tuning.backoff_base_ms = ms;
        self
    }

    pub fn ambient_volume(mut self, volume: f32) -> Self {
        self.tuning.ambient_volume = volume;
        self
    }

    pub fn ambient_fades_ms(mut self, fade_in: u64, fade_out: u64) -> Self {
        self.tuning.ambient_fade_in_ms = fade_in;
        self.tuning.ambient_fade_out_ms = fade_out;
        self
    }

    pub fn operation_fade(mut self, ratio: f64, cap_ms: u64) -> Self {
        self.tuning.operation_fade_ratio = ratio;
        self.tuning.operation_fade_cap_ms = cap_ms;
        self
    }

    pub fn interaction_gate(mut self, gate: InteractionGate) -> Self {
        self.tuning.interaction_gate = gate;
        self
    }

    pub fn critical_sounds<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tuning.critical_sounds = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when a required bridge is absent and no
    ///   desktop default is compiled in
    /// - [`Error::Config`] when the tuning is out of range
    pub fn build(self) -> Result<EngineConfig> {
        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let audio_host = match self.audio_host {
            Some(host) => host,
            None => provide_default_audio_host()?,
        };

        let config = EngineConfig {
            http_client,
            audio_host,
            decoder: self.decoder,
            tuning: self.tuning,
        };

        config.validate()?;
        Ok(config)
    }
}

//! # Host Bridge Traits
//!
//! Capabilities the sound engine needs from its host, expressed as traits so
//! the core stays platform-neutral.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - fetch asset bytes (network or local asset root)
//! - [`AudioHost`](audio::AudioHost) - one-time capability probe and output creation
//! - [`AudioOutput`](audio::AudioOutput) - the shared output context (resume, close, voices)
//! - [`Voice`](audio::Voice) - one started playback node with a gain stage
//! - [`SampleDecoder`](audio::SampleDecoder) - encoded bytes to PCM
//! - [`LoggerSink`](log::LoggerSink) - forward structured logs to the host
//!
//! ## Error Handling
//!
//! Every bridge returns [`BridgeError`](error::BridgeError). Implementations
//! convert their native errors into it and never panic across the boundary;
//! the engine turns bridge failures into silent no-ops for its callers.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so handles can be shared between
//! the engine's scheduled fade/stop tasks.
//!
//! ## Example
//!
//! ```ignore
//! use bridge_traits::audio::{AudioCapabilities, AudioHost, AudioOutput};
//! use bridge_traits::error::Result;
//! use std::sync::Arc;
//!
//! struct SilentHost;
//!
//! impl AudioHost for SilentHost {
//!     fn probe(&self) -> AudioCapabilities {
//!         AudioCapabilities::unavailable("silent", "no output device")
//!     }
//!
//!     fn open(&self, _caps: &AudioCapabilities) -> Result<Arc<dyn AudioOutput>> {
//!         Err(bridge_traits::BridgeError::NotAvailable("silent host".into()))
//!     }
//! }
//! ```

pub mod audio;
pub mod error;
pub mod http;
pub mod log;

pub use error::BridgeError;

pub use audio::{
    AudioCapabilities, AudioHost, AudioOutput, OutputState, PcmBuffer, SampleDecoder, Voice,
    VoiceParams,
};
pub use http::{HttpClient, HttpRequest, HttpResponse};
pub use log::{LogEntry, LogLevel, LoggerSink, RecentLogs};

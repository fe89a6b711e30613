//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest` ([`ReqwestHttpClient`])
//! - `HttpClient` over a local asset directory ([`LocalAssetClient`])
//! - `AudioHost` using `rodio` ([`RodioAudioHost`], feature `rodio-output`)
//! - `AudioHost` that reports no audio ([`NullAudioHost`])
//!
//! ## Feature Flags
//!
//! - `rodio-output`: real audio output through rodio/cpal
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{default_audio_host, LocalAssetClient};
//! use std::sync::Arc;
//!
//! let assets = Arc::new(LocalAssetClient::new("./public"));
//! let audio = default_audio_host();
//! // Hand both to EngineConfig::builder()
//! ```

mod assets;
mod audio;
mod http;

#[cfg(feature = "rodio-output")]
mod rodio_output;

pub use assets::{content_type_for, LocalAssetClient};
pub use audio::{default_audio_host, NullAudioHost};
pub use http::ReqwestHttpClient;

#[cfg(feature = "rodio-output")]
pub use rodio_output::{RodioAudioHost, RodioOutput};

//! # Sound Effects Module
//!
//! Event-driven sound effects for the retro desktop.
//!
//! ## Overview
//!
//! This module handles:
//! - The static catalog of sounds and their candidate assets
//! - Lazy creation and resumption of the audio output
//! - Coalesced, retried loading of decoded buffers
//! - Per-playback control: volume, fades, timed stops and looping
//! - The [`SoundEngine`] facade tying it together

pub mod catalog;
pub mod context;
pub mod controller;
pub mod decoder;
pub mod engine;
pub mod error;
pub mod loader;
pub mod options;
pub mod status;

pub use catalog::{SoundCatalog, SoundCatalogBuilder, SoundDefinition, AMBIENT_SOUND};
pub use context::{ContextManager, ContextState};
pub use controller::{clamp_volume, FadeSettings, PlaybackPlan, SoundHandle};
pub use decoder::SymphoniaDecoder;
pub use engine::SoundEngine;
pub use error::{Result, SfxError};
pub use loader::{BufferLoader, LoadState, LoaderSettings};
pub use options::PlayOptions;
pub use status::EngineStatus;

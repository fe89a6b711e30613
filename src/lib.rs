//! Workspace facade crate.
//!
//! Re-exports the sound engine and its configuration so host applications
//! depend on `retro-sfx` alone and pick bridges through features:
//!
//! - `desktop-shims` (default): reqwest fetching and the desktop audio host
//! - `rodio-output`: real playback through rodio/cpal
//!
//! ```ignore
//! let engine = retro_sfx::desktop_engine("./public")?;
//! engine.play_sound("boot", retro_sfx::PlayOptions::new()).await;
//! ```

pub use bridge_traits::{AudioCapabilities, AudioHost, HttpClient, SampleDecoder};
pub use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
pub use core_runtime::{EngineConfig, EngineConfigBuilder, EngineTuning, InteractionGate};
pub use core_sfx::{
    ContextState, EngineStatus, LoadState, PlayOptions, SfxError, SoundCatalog,
    SoundDefinition, SoundEngine, SoundHandle,
};

/// Engine over a local asset directory with the default desktop audio host
/// and the retro desktop catalog.
///
/// `asset_root` is the directory containing `audio/`.
#[cfg(feature = "desktop-shims")]
pub fn desktop_engine(
    asset_root: impl Into<std::path::PathBuf>,
) -> core_runtime::Result<SoundEngine> {
    use std::sync::Arc;

    let config = EngineConfig::builder()
        .http_client(Arc::new(bridge_desktop::LocalAssetClient::new(asset_root)))
        .audio_host(bridge_desktop::default_audio_host())
        .build()?;
    Ok(SoundEngine::new(config, SoundCatalog::default()))
}

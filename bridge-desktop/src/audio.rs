//! Audio hosts that need no device: the fallback used when no output can be
//! opened, and the selector for the desktop default.

use bridge_traits::{
    audio::{AudioCapabilities, AudioHost, AudioOutput},
    error::{BridgeError, Result},
};
use std::sync::Arc;
use tracing::info;

/// Host that always reports audio as unavailable.
///
/// The engine treats it like a browser without an audio context: every
/// playback request becomes a silent no-op.
#[derive(Debug, Clone)]
pub struct NullAudioHost {
    reason: String,
}

impl NullAudioHost {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Default for NullAudioHost {
    fn default() -> Self {
        Self::new("no audio backend compiled in")
    }
}

impl AudioHost for NullAudioHost {
    fn probe(&self) -> AudioCapabilities {
        AudioCapabilities::unavailable("null", self.reason.clone())
    }

    fn open(&self, _capabilities: &AudioCapabilities) -> Result<Arc<dyn AudioOutput>> {
        Err(BridgeError::NotAvailable(self.reason.clone()))
    }
}

/// Desktop default host: rodio when the `rodio-output` feature is enabled,
/// otherwise [`NullAudioHost`].
#[cfg(feature = "rodio-output")]
pub fn default_audio_host() -> Arc<dyn AudioHost> {
    info!("Using rodio audio host");
    Arc::new(crate::rodio_output::RodioAudioHost::new())
}

/// Desktop default host: rodio when the `rodio-output` feature is enabled,
/// otherwise [`NullAudioHost`].
#[cfg(not(feature = "rodio-output"))]
pub fn default_audio_host() -> Arc<dyn AudioHost> {
    info!("Audio output not compiled in; using null audio host");
    Arc::new(NullAudioHost::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_host_reports_unavailable() {
        let host = NullAudioHost::new("headless CI");
        let caps = host.probe();

        assert!(!caps.available);
        assert_eq!(caps.backend, "null");
        assert_eq!(caps.reason.as_deref(), Some("headless CI"));
        assert!(matches!(host.open(&caps), Err(BridgeError::NotAvailable(_))));
    }

    #[cfg(not(feature = "rodio-output"))]
    #[test]
    fn test_default_host_without_backend() {
        let host = default_audio_host();
        assert!(!host.probe().available);
    }
}

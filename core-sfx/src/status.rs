//! Diagnostic snapshot of the engine.

use crate::context::ContextState;
use bridge_traits::AudioCapabilities;
use serde::{Deserialize, Serialize};

/// Point-in-time view of the engine for diagnostics panels and logs.
///
/// Never feed this back into control decisions; it may be stale by the time
/// it is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub context_state: ContextState,
    pub interaction_observed: bool,
    pub loaded_buffers: usize,
    pub total_sounds: usize,
    /// Sound ids with a live playback, sorted
    pub active_sounds: Vec<String>,
    pub ambient_playing: bool,
    pub last_error: Option<String>,
    pub capabilities: Option<AudioCapabilities>,
}

impl EngineStatus {
    pub fn is_fully_loaded(&self) -> bool {
        self.total_sounds > 0 && self.loaded_buffers == self.total_sounds
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes() {
        let status = EngineStatus {
            context_state: ContextState::Running,
            interaction_observed: true,
            loaded_buffers: 13,
            total_sounds: 13,
            active_sounds: vec!["click".to_string()],
            ambient_playing: true,
            last_error: None,
            capabilities: Some(AudioCapabilities::available("test", 48_000, 2)),
        };

        assert!(status.is_fully_loaded());
        let json = status.to_json();
        assert!(json.contains("\"context_state\":\"running\""));
        assert!(json.contains("\"ambient_playing\":true"));
    }
}

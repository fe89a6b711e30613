//! # Sound Engine Error Types
//!
//! The fire-and-forget facade operations never surface these: the engine
//! logs them, keeps the latest one for diagnostics and returns `None`.
//! [`SoundEngine::try_play_sound`](crate::SoundEngine::try_play_sound)
//! hands them back instead.

use std::time::Duration;
use thiserror::Error;

/// Errors produced while preparing or playing a sound.
///
/// `Clone` so one failed load can be handed to every caller that was
/// waiting on it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SfxError {
    /// The host has no usable audio output, or it was closed.
    #[error("Audio context unavailable: {0}")]
    ContextUnavailable(String),

    /// Every candidate for a sound failed to fetch or decode.
    #[error("Failed to load sound '{sound}' (attempt {attempt}): {reason}")]
    LoadFailure {
        sound: String,
        attempt: u32,
        reason: String,
    },

    /// The identifier is not in the catalog.
    #[error("Unknown sound: {0}")]
    UnknownSound(String),

    /// The buffer loaded but the voice could not be created or started.
    #[error("Failed to set up playback for '{sound}': {reason}")]
    PlaybackSetupFailure { sound: String, reason: String },

    /// Playback was requested before the user interacted.
    #[error("Audio is locked until the user interacts")]
    InteractionRequired,

    /// A failed sound is inside its retry window.
    #[error("Sound '{sound}' is backing off, next attempt in {remaining:?}")]
    Backoff { sound: String, remaining: Duration },

    /// The catalog definition is malformed.
    #[error("Invalid sound catalog: {0}")]
    InvalidCatalog(String),
}

impl SfxError {
    /// `true` when a later call for the same sound may succeed without any
    /// change on the host side.
    pub fn is_transient(&self) -> bool {
        matches!(self, SfxError::LoadFailure { .. } | SfxError::Backoff { .. })
    }

    /// The sound this error refers to, if any.
    pub fn sound(&self) -> Option<&str> {
        match self {
            SfxError::LoadFailure { sound, .. }
            | SfxError::PlaybackSetupFailure { sound, .. }
            | SfxError::Backoff { sound, .. } => Some(sound),
            SfxError::UnknownSound(sound) => Some(sound),
            _ => None,
        }
    }
}

/// Result type for sound engine operations.
pub type Result<T> = std::result::Result<T, SfxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_failure_message_names_attempt() {
        let err = SfxError::LoadFailure {
            sound: "boot".to_string(),
            attempt: 1,
            reason: "/audio/boot.wav: HTTP 404".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("boot"));
        assert!(message.contains("attempt 1"));
        assert!(message.contains("HTTP 404"));
        assert!(err.is_transient());
        assert_eq!(err.sound(), Some("boot"));
    }

    #[test]
    fn test_non_transient_errors() {
        assert!(!SfxError::UnknownSound("beep".into()).is_transient());
        assert!(!SfxError::ContextUnavailable("closed".into()).is_transient());
        assert_eq!(SfxError::InteractionRequired.sound(), None);
    }
}

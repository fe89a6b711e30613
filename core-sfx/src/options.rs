//! Per-request playback options.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a single sound should be played.
///
/// Every field is optional; unset fields fall back to the catalog default
/// (volume) or to "play once, no fades".
///
/// ```ignore
/// let options = PlayOptions::new()
///     .volume(0.4)
///     .fade_in(Duration::from_millis(300))
///     .operation_duration(Duration::from_secs(4));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayOptions {
    pub looping: Option<bool>,
    pub volume: Option<f32>,
    /// Stop (or fade) after this long; ignored for looping playback
    pub duration: Option<Duration>,
    pub fade_in: Option<Duration>,
    /// Fade applied when a timed playback reaches its end
    pub fade_out: Option<Duration>,
    /// Length of the UI operation the sound accompanies
    pub operation_duration: Option<Duration>,
}

impl PlayOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = Some(looping);
        self
    }

    pub fn volume(mut self, volume: f32) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn fade_in(mut self, fade_in: Duration) -> Self {
        self.fade_in = Some(fade_in);
        self
    }

    pub fn fade_out(mut self, fade_out: Duration) -> Self {
        self.fade_out = Some(fade_out);
        self
    }

    pub fn operation_duration(mut self, duration: Duration) -> Self {
        self.operation_duration = Some(duration);
        self
    }

    /// Loop explicitly requested by the caller.
    pub fn wants_loop(&self) -> bool {
        self.looping.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_fields() {
        let options = PlayOptions::new()
            .looping(true)
            .volume(0.3)
            .fade_in(Duration::from_millis(200))
            .fade_out(Duration::from_millis(100))
            .operation_duration(Duration::from_secs(3));

        assert!(options.wants_loop());
        assert_eq!(options.volume, Some(0.3));
        assert_eq!(options.fade_in, Some(Duration::from_millis(200)));
        assert_eq!(options.operation_duration, Some(Duration::from_secs(3)));
        assert_eq!(options.duration, None);
    }

    #[test]
    fn test_deserialize_partial() {
        let options: PlayOptions = serde_json::from_str(r#"{ "volume": 0.8 }"#).unwrap();
        assert_eq!(options.volume, Some(0.8));
        assert!(!options.wants_loop());
    }
}

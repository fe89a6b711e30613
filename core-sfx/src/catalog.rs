//! # Sound Catalog
//!
//! Static table of the sounds the engine knows: identifier, candidate asset
//! URIs in preference order, nominal duration and default volume.
//!
//! The catalog is fixed once built. It comes from
//! [`SoundCatalog::retro_desktop`], from JSON shipped with the assets, or
//! from [`SoundCatalog::builder`].

use crate::error::{Result, SfxError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Default asset directory of the retro desktop catalog.
pub const DEFAULT_ASSET_BASE: &str = "/audio";

/// Container formats tried for each sound, most preferred first.
pub const DEFAULT_FORMATS: &[&str] = &["mp3", "ogg", "wav"];

/// Volume used when a sound has no default of its own.
pub const FALLBACK_VOLUME: f32 = 0.5;

/// Identifier of the background loop.
pub const AMBIENT_SOUND: &str = "ambient";

/// id, nominal duration (ms, `None` = unbounded), default volume
const RETRO_DESKTOP_SOUNDS: &[(&str, Option<u64>, f32)] = &[
    (AMBIENT_SOUND, None, 0.25),
    ("boot", Some(2000), 0.7),
    ("typing", Some(1000), 0.35),
    ("floppy", Some(2500), 0.45),
    ("success", Some(1500), 0.6),
    ("click", Some(300), 0.5),
    ("open", Some(800), 0.45),
    ("close", Some(600), 0.45),
    ("scan", Some(3000), 0.35),
    ("error", Some(1200), 0.55),
    ("shutdown", Some(3000), 0.7),
    ("glitch", Some(800), 0.4),
    ("reboot", Some(2500), 0.7),
];

/// One entry of the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundDefinition {
    pub id: String,
    /// Asset URIs, most preferred first
    pub candidates: Vec<String>,
    /// Nominal length in milliseconds; absent for unbounded loops
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default = "fallback_volume")]
    pub volume: f32,
}

fn fallback_volume() -> f32 {
    FALLBACK_VOLUME
}

impl SoundDefinition {
    pub fn new(id: impl Into<String>, candidates: Vec<String>) -> Self {
        Self {
            id: id.into(),
            candidates,
            duration_ms: None,
            volume: FALLBACK_VOLUME,
        }
    }

    /// Same asset name in every default format under `base`.
    pub fn with_formats(id: impl Into<String>, base: &str) -> Self {
        let id = id.into();
        let base = base.trim_end_matches('/');
        let candidates = DEFAULT_FORMATS
            .iter()
            .map(|ext| format!("{}/{}.{}", base, id, ext))
            .collect();
        Self::new(id, candidates)
    }

    pub fn duration_ms(mut self, ms: u64) -> Self {
        self.duration_ms = Some(ms);
        self
    }

    pub fn volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn nominal_duration(&self) -> Option<Duration> {
        self.duration_ms.map(Duration::from_millis)
    }

    pub fn is_unbounded(&self) -> bool {
        self.duration_ms.is_none()
    }

    fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(SfxError::InvalidCatalog(
                "sound id cannot be empty".to_string(),
            ));
        }

        if self.candidates.is_empty() {
            return Err(SfxError::InvalidCatalog(format!(
                "sound '{}' has no candidate URIs",
                self.id
            )));
        }

        if !(0.0..=1.0).contains(&self.volume) {
            return Err(SfxError::InvalidCatalog(format!(
                "sound '{}' has volume {} outside 0.0..=1.0",
                self.id, self.volume
            )));
        }

        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct CatalogFile {
    sounds: Vec<SoundDefinition>,
}

/// Immutable, ordered set of sound definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundCatalog {
    sounds: Vec<SoundDefinition>,
    index: HashMap<String, usize>,
}

impl SoundCatalog {
    /// The thirteen sounds of the retro desktop, each offered as mp3, ogg and
    /// wav under `base`.
    pub fn retro_desktop(base: &str) -> Self {
        let sounds = RETRO_DESKTOP_SOUNDS
            .iter()
            .map(|(id, duration, volume)| {
                let mut def = SoundDefinition::with_formats(*id, base).volume(*volume);
                def.duration_ms = *duration;
                def
            })
            .collect();

        Self::index(sounds)
    }

    pub fn builder() -> SoundCatalogBuilder {
        SoundCatalogBuilder::default()
    }

    /// Parses `{ "sounds": [ { "id": .., "candidates": [..], .. } ] }`.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)
            .map_err(|e| SfxError::InvalidCatalog(e.to_string()))?;
        Self::from_definitions(file.sounds)
    }

    pub fn to_json(&self) -> Result<String> {
        let file = CatalogFile {
            sounds: self.sounds.clone(),
        };
        serde_json::to_string_pretty(&file).map_err(|e| SfxError::InvalidCatalog(e.to_string()))
    }

    /// Validates and indexes definitions, keeping their order.
    pub fn from_definitions(sounds: Vec<SoundDefinition>) -> Result<Self> {
        let mut seen = HashMap::new();
        for (position, def) in sounds.iter().enumerate() {
            def.validate()?;
            if seen.insert(def.id.clone(), position).is_some() {
                return Err(SfxError::InvalidCatalog(format!(
                    "duplicate sound id '{}'",
                    def.id
                )));
            }
        }

        Ok(Self { sounds, index: seen })
    }

    fn index(sounds: Vec<SoundDefinition>) -> Self {
        let index = sounds
            .iter()
            .enumerate()
            .map(|(position, def)| (def.id.clone(), position))
            .collect();
        Self { sounds, index }
    }

    pub fn get(&self, id: &str) -> Option<&SoundDefinition> {
        self.index.get(id).map(|&position| &self.sounds[position])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Default volume of `id`, or [`FALLBACK_VOLUME`] when unknown.
    pub fn default_volume(&self, id: &str) -> f32 {
        self.get(id).map(|def| def.volume).unwrap_or(FALLBACK_VOLUME)
    }

    /// Identifiers in declaration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sounds.iter().map(|def| def.id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SoundDefinition> {
        self.sounds.iter()
    }

    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }
}

impl Default for SoundCatalog {
    fn default() -> Self {
        Self::retro_desktop(DEFAULT_ASSET_BASE)
    }
}

/// Programmatic catalog construction.
#[derive(Debug, Default)]
pub struct SoundCatalogBuilder {
    sounds: Vec<SoundDefinition>,
}

impl SoundCatalogBuilder {
    pub fn sound(mut self, definition: SoundDefinition) -> Self {
        self.sounds.push(definition);
        self
    }

    pub fn build(self) -> Result<SoundCatalog> {
        SoundCatalog::from_definitions(self.sounds)
    }
}

//! Errors raised while wiring the engine together. Playback failures live in
//! `core_sfx::SfxError`; nothing here is produced after startup.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Tuning out of range or an unparsable logging directive.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A required bridge was neither injected nor available as a default.
    #[error("No {capability} available: {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Logging already initialized or unavailable: {0}")]
    Logging(String),

    /// A default bridge could not be constructed.
    #[error("Bridge initialization failed: {0}")]
    BridgeInit(String),
}

pub type Result<T> = std::result::Result<T, Error>;

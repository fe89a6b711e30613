//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the sound engine:
//! - Logging and tracing setup
//! - Engine configuration (injected bridges and tuning)
//! - Runtime error types

pub mod config;
pub mod error;
pub mod logging;

pub use config::{EngineConfig, EngineConfigBuilder, EngineTuning, InteractionGate};
pub use error::{Error, Result};

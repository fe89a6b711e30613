//! # Playback Context Manager
//!
//! Owns the single shared audio output. The host is probed once; after that
//! the outcome is fixed for the lifetime of the engine, so a machine without
//! audio pays for the probe a single time and every later request is a cheap
//! no-op.

use crate::error::{Result, SfxError};
use bridge_traits::{AudioCapabilities, AudioHost, AudioOutput, OutputState};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lifecycle of the shared output as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextState {
    /// Not probed yet
    Uninitialized,
    /// Created; waiting for a resume
    Suspended,
    Running,
    /// Torn down; never reopened
    Closed,
    /// The probe or the open failed
    Unavailable,
}

#[derive(Default)]
struct ContextSlot {
    capabilities: Option<AudioCapabilities>,
    output: Option<Arc<dyn AudioOutput>>,
    failure: Option<String>,
    closed: bool,
}

pub struct ContextManager {
    host: Arc<dyn AudioHost>,
    slot: Mutex<ContextSlot>,
}

impl ContextManager {
    pub fn new(host: Arc<dyn AudioHost>) -> Self {
        Self {
            host,
            slot: Mutex::new(ContextSlot::default()),
        }
    }

    /// Returns the shared output, creating it on first use.
    ///
    /// Fails with [`SfxError::ContextUnavailable`] when the host has no
    /// audio, the open failed, or the context was closed.
    pub fn ensure_context(&self) -> Result<Arc<dyn AudioOutput>> {
        let mut slot = self.slot.lock();

        if slot.closed {
            return Err(SfxError::ContextUnavailable(
                "audio context closed".to_string(),
            ));
        }

        if let Some(output) = &slot.output {
            return Ok(Arc::clone(output));
        }

        if let Some(reason) = &slot.failure {
            return Err(SfxError::ContextUnavailable(reason.clone()));
        }

        let capabilities = self.host.probe();
        slot.capabilities = Some(capabilities.clone());

        if !capabilities.available {
            let reason = capabilities
                .reason
                .clone()
                .unwrap_or_else(|| format!("{} reports no audio output", capabilities.backend));
            warn!(backend = %capabilities.backend, reason = %reason, "Audio unavailable");
            slot.failure = Some(reason.clone());
            return Err(SfxError::ContextUnavailable(reason));
        }

        match self.host.open(&capabilities) {
            Ok(output) => {
                info!(
                    backend = %capabilities.backend,
                    sample_rate = ?capabilities.sample_rate,
                    channels = ?capabilities.channels,
                    "Audio context created"
                );
                slot.output = Some(Arc::clone(&output));
                Ok(output)
            }
            Err(e) => {
                let reason = format!("failed to open {} output: {}", capabilities.backend, e);
                warn!(reason = %reason, "Audio context creation failed");
                slot.failure = Some(reason.clone());
                Err(SfxError::ContextUnavailable(reason))
            }
        }
    }

    /// Resumes `output` if the host left it suspended.
    pub async fn resume_if_suspended(&self, output: &Arc<dyn AudioOutput>) -> Result<()> {
        match output.state() {
            OutputState::Running => Ok(()),
            OutputState::Closed => Err(SfxError::ContextUnavailable(
                "audio context closed".to_string(),
            )),
            OutputState::Suspended => {
                debug!("Resuming suspended audio context");
                output
                    .resume()
                    .await
                    .map_err(|e| SfxError::ContextUnavailable(format!("failed to resume: {}", e)))
            }
        }
    }

    /// Closes the output. Only the first call reaches the host.
    pub async fn close(&self) {
        let output = {
            let mut slot = self.slot.lock();
            if slot.closed {
                return;
            }
            slot.closed = true;
            slot.output.take()
        };

        if let Some(output) = output {
            if let Err(e) = output.close().await {
                warn!(error = %e, "Closing audio context failed");
            } else {
                info!("Audio context closed");
            }
        }
    }

    pub fn state(&self) -> ContextState {
        let slot = self.slot.lock();
        if slot.closed {
            return ContextState::Closed;
        }
        if slot.failure.is_some() {
            return ContextState::Unavailable;
        }
        match &slot.output {
            Some(output) => match output.state() {
                OutputState::Suspended => ContextState::Suspended,
                OutputState::Running => ContextState::Running,
                OutputState::Closed => ContextState::Closed,
            },
            None => ContextState::Uninitialized,
        }
    }

    /// Capability descriptor from the probe; `None` before the first probe.
    pub fn capabilities(&self) -> Option<AudioCapabilities> {
        self.slot.lock().capabilities.clone()
    }

    /// An output exists and is not closed.
    pub fn is_open(&self) -> bool {
        matches!(self.state(), ContextState::Suspended | ContextState::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::{BridgeError, PcmBuffer, Voice, VoiceParams};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingOutput {
        state: Mutex<OutputState>,
        closes: AtomicUsize,
    }

    #[async_trait]
    impl AudioOutput for CountingOutput {
        fn state(&self) -> OutputState {
            *self.state.lock()
        }

        async fn resume(&self) -> bridge_traits::error::Result<()> {
            *self.state.lock() = OutputState::Running;
            Ok(())
        }

        async fn close(&self) -> bridge_traits::error::Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            *self.state.lock() = OutputState::Closed;
            Ok(())
        }

        fn create_voice(
            &self,
            _buffer: Arc<PcmBuffer>,
            _params: VoiceParams,
        ) -> bridge_traits::error::Result<Box<dyn Voice>> {
            Err(BridgeError::NotAvailable("no voices in this test".into()))
        }
    }

    struct TestHost {
        available: bool,
        probes: AtomicUsize,
        output: Arc<CountingOutput>,
    }

    impl TestHost {
        fn new(available: bool) -> Arc<Self> {
            Arc::new(Self {
                available,
                probes: AtomicUsize::new(0),
                output: Arc::new(CountingOutput {
                    state: Mutex::new(OutputState::Suspended),
                    closes: AtomicUsize::new(0),
                }),
            })
        }
    }

    impl AudioHost for TestHost {
        fn probe(&self) -> AudioCapabilities {
            self.probes.fetch_add(1, Ordering::SeqCst);
            if self.available {
                AudioCapabilities::available("test", 44_100, 2)
            } else {
                AudioCapabilities::unavailable("test", "no device")
            }
        }

        fn open(&self, _caps: &AudioCapabilities) -> bridge_traits::error::Result<Arc<dyn AudioOutput>> {
            Ok(self.output.clone())
        }
    }

    #[test]
    fn test_unavailable_host_probed_once() {
        let host = TestHost::new(false);
        let manager = ContextManager::new(host.clone());

        assert_eq!(manager.state(), ContextState::Uninitialized);
        assert!(matches!(
            manager.ensure_context(),
            Err(SfxError::ContextUnavailable(_))
        ));
        assert!(manager.ensure_context().is_err());
        assert_eq!(host.probes.load(Ordering::SeqCst), 1);
        assert_eq!(manager.state(), ContextState::Unavailable);
        assert!(!manager.capabilities().unwrap().available);
    }

    #[core_async::test]
    async fn test_resume_then_close_once() {
        let host = TestHost::new(true);
        let manager = ContextManager::new(host.clone());

        let output = manager.ensure_context().unwrap();
        assert_eq!(manager.state(), ContextState::Suspended);

        manager.resume_if_suspended(&output).await.unwrap();
        assert_eq!(manager.state(), ContextState::Running);
        assert!(manager.is_open());

        manager.close().await;
        manager.close().await;
        assert_eq!(host.output.closes.load(Ordering::SeqCst), 1);
        assert_eq!(manager.state(), ContextState::Closed);
        assert!(manager.ensure_context().is_err());
    }
}

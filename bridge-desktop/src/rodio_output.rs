//! Audio output through rodio.
//!
//! rodio's `OutputStream` is not `Send`, so it lives on a dedicated thread
//! for the lifetime of the output and only the `OutputStreamHandle` is
//! shared. Each voice is its own `Sink` so gains and stops stay independent.

use async_trait::async_trait;
use bridge_traits::{
    audio::{AudioCapabilities, AudioHost, AudioOutput, OutputState, PcmBuffer, Voice, VoiceParams},
    error::{BridgeError, Result},
};
use parking_lot::Mutex;
use rodio::cpal::traits::{DeviceTrait, HostTrait};
use rodio::{buffer::SamplesBuffer, OutputStream, OutputStreamHandle, Sink, Source};
use std::sync::{mpsc, Arc};
use std::thread;
use tracing::{debug, info, warn};

/// Host backed by the system's default output device.
#[derive(Debug, Default, Clone)]
pub struct RodioAudioHost;

impl RodioAudioHost {
    pub fn new() -> Self {
        Self
    }
}

impl AudioHost for RodioAudioHost {
    fn probe(&self) -> AudioCapabilities {
        let host = rodio::cpal::default_host();
        let Some(device) = host.default_output_device() else {
            return AudioCapabilities::unavailable("rodio", "no default output device");
        };

        match device.default_output_config() {
            Ok(config) => {
                let caps =
                    AudioCapabilities::available("rodio", config.sample_rate().0, config.channels());
                info!(
                    device = %device.name().unwrap_or_else(|_| "unknown".to_string()),
                    sample_rate = ?caps.sample_rate,
                    channels = ?caps.channels,
                    "Audio device probed"
                );
                caps
            }
            Err(e) => AudioCapabilities::unavailable("rodio", e.to_string()),
        }
    }

    fn open(&self, capabilities: &AudioCapabilities) -> Result<Arc<dyn AudioOutput>> {
        if !capabilities.available {
            return Err(BridgeError::NotAvailable(
                capabilities
                    .reason
                    .clone()
                    .unwrap_or_else(|| "audio unavailable".to_string()),
            ));
        }

        let output = RodioOutput::spawn()?;
        Ok(Arc::new(output))
    }
}

/// Shared output: the stream thread plus its handle.
pub struct RodioOutput {
    handle: OutputStreamHandle,
    state: Mutex<OutputState>,
    shutdown: Mutex<Option<mpsc::Sender<()>>>,
}

impl RodioOutput {
    fn spawn() -> Result<Self> {
        let (ready_tx, ready_rx) = mpsc::channel::<std::result::Result<OutputStreamHandle, String>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        thread::Builder::new()
            .name("retro-sfx-audio".to_string())
            .spawn(move || match OutputStream::try_default() {
                Ok((stream, handle)) => {
                    if ready_tx.send(Ok(handle)).is_err() {
                        return;
                    }
                    // Blocks until the sender is dropped on close.
                    let _ = shutdown_rx.recv();
                    drop(stream);
                    debug!("Audio stream thread exiting");
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                }
            })
            .map_err(BridgeError::Io)?;

        let handle = ready_rx
            .recv()
            .map_err(|_| BridgeError::OperationFailed("audio thread exited".to_string()))?
            .map_err(BridgeError::NotAvailable)?;

        Ok(Self {
            handle,
            state: Mutex::new(OutputState::Suspended),
            shutdown: Mutex::new(Some(shutdown_tx)),
        })
    }
}

#[async_trait]
impl AudioOutput for RodioOutput {
    fn state(&self) -> OutputState {
        *self.state.lock()
    }

    async fn resume(&self) -> Result<()> {
        let mut state = self.state.lock();
        match *state {
            OutputState::Closed => Err(BridgeError::OperationFailed(
                "output already closed".to_string(),
            )),
            _ => {
                *state = OutputState::Running;
                Ok(())
            }
        }
    }

    async fn close(&self) -> Result<()> {
        *self.state.lock() = OutputState::Closed;
        // Dropping the sender releases the stream thread.
        self.shutdown.lock().take();
        Ok(())
    }

    fn create_voice(&self, buffer: Arc<PcmBuffer>, params: VoiceParams) -> Result<Box<dyn Voice>> {
        if self.state() != OutputState::Running {
            return Err(BridgeError::OperationFailed(format!(
                "output is {:?}",
                self.state()
            )));
        }

        let sink = Sink::try_new(&self.handle)
            .map_err(|e| BridgeError::OperationFailed(e.to_string()))?;
        sink.pause();
        sink.set_volume(params.gain);

        let source = SamplesBuffer::new(
            buffer.channels(),
            buffer.sample_rate(),
            buffer.samples().to_vec(),
        );
        if params.looping {
            sink.append(source.buffered().repeat_infinite());
        } else {
            sink.append(source);
        }

        Ok(Box::new(RodioVoice {
            sink,
            gain: Mutex::new(params.gain),
        }))
    }
}

impl Drop for RodioOutput {
    fn drop(&mut self) {
        if self.shutdown.lock().take().is_some() {
            warn!("Audio output dropped without close");
        }
    }
}

struct RodioVoice {
    sink: Sink,
    gain: Mutex<f32>,
}

impl Voice for RodioVoice {
    fn start(&self) -> Result<()> {
        self.sink.play();
        Ok(())
    }

    fn set_gain(&self, gain: f32) {
        *self.gain.lock() = gain;
        self.sink.set_volume(gain);
    }

    fn gain(&self) -> f32 {
        *self.gain.lock()
    }

    fn stop(&self) {
        self.sink.stop();
    }

    fn is_finished(&self) -> bool {
        self.sink.empty()
    }
}

//! In-memory host bridges for engine tests.
//!
//! Clips are encoded as their length in milliseconds (`b"1000"`); the fake
//! decoder turns that into a 1 kHz mono buffer of the same length.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    AudioCapabilities, AudioHost, AudioOutput, HttpClient, HttpRequest, HttpResponse,
    OutputState, PcmBuffer, SampleDecoder, Voice, VoiceParams,
};
use bytes::Bytes;
use core_runtime::{EngineConfig, EngineTuning};
use core_sfx::{SoundCatalog, SoundEngine};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const FAKE_SAMPLE_RATE: u32 = 1_000;

#[derive(Clone)]
enum Route {
    Clip { body: Bytes, content_type: String },
    Status(u16),
    Error(String),
    Hang,
}

/// Serves registered URLs; everything else is a 404.
#[derive(Default)]
pub struct FakeHttp {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<Vec<String>>,
    delay: Mutex<Option<Duration>>,
}

impl FakeHttp {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn serve_clip(&self, url: &str, millis: u64) {
        self.routes.lock().insert(
            url.to_string(),
            Route::Clip {
                body: Bytes::from(millis.to_string()),
                content_type: "audio/mpeg".to_string(),
            },
        );
    }

    pub fn serve_body(&self, url: &str, body: &'static [u8], content_type: &str) {
        self.routes.lock().insert(
            url.to_string(),
            Route::Clip {
                body: Bytes::from_static(body),
                content_type: content_type.to_string(),
            },
        );
    }

    pub fn serve_status(&self, url: &str, status: u16) {
        self.routes.lock().insert(url.to_string(), Route::Status(status));
    }

    pub fn fail(&self, url: &str, reason: &str) {
        self.routes
            .lock()
            .insert(url.to_string(), Route::Error(reason.to_string()));
    }

    pub fn hang(&self, url: &str) {
        self.routes.lock().insert(url.to_string(), Route::Hang);
    }

    /// Serves the first candidate of every catalog sound, with its nominal
    /// duration (4 s for unbounded sounds).
    pub fn serve_catalog(&self, catalog: &SoundCatalog) {
        for sound in catalog.iter() {
            let millis = sound.duration_ms.unwrap_or(4_000);
            self.serve_clip(&sound.candidates[0], millis);
        }
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().iter().filter(|u| u.as_str() == url).count()
    }

    /// Requested URLs in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl HttpClient for FakeHttp {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.calls.lock().push(request.url.clone());

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            core_async::sleep(delay).await;
        }

        let route = self.routes.lock().get(&request.url).cloned();
        match route {
            Some(Route::Clip { body, content_type }) => {
                Ok(HttpResponse::new(200, body).with_header("Content-Type", content_type))
            }
            Some(Route::Status(status)) => Ok(HttpResponse::new(status, Bytes::new())),
            Some(Route::Error(reason)) => Err(BridgeError::OperationFailed(reason)),
            Some(Route::Hang) => futures::future::pending().await,
            None => Ok(HttpResponse::new(404, Bytes::new())),
        }
    }
}

/// Parses the clip length out of the body.
#[derive(Default)]
pub struct FakeDecoder;

#[async_trait]
impl SampleDecoder for FakeDecoder {
    async fn decode(&self, data: Bytes, _extension_hint: Option<&str>) -> Result<PcmBuffer> {
        let millis: usize = std::str::from_utf8(&data)
            .ok()
            .and_then(|text| text.trim().parse().ok())
            .ok_or_else(|| BridgeError::Decode("not a fake clip".to_string()))?;
        let frames = millis * FAKE_SAMPLE_RATE as usize / 1_000;
        Ok(PcmBuffer::new(vec![0.25; frames], FAKE_SAMPLE_RATE, 1))
    }
}

/// What a voice went through.
pub struct VoiceRecord {
    pub looping: bool,
    pub initial_gain: f32,
    pub frames: usize,
    gain: Mutex<f32>,
    gains: Mutex<Vec<f32>>,
    started: AtomicBool,
    stopped: AtomicBool,
}

impl VoiceRecord {
    pub fn gain(&self) -> f32 {
        *self.gain.lock()
    }

    pub fn gain_history(&self) -> Vec<f32> {
        self.gains.lock().clone()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

struct FakeVoice(Arc<VoiceRecord>);

impl Voice for FakeVoice {
    fn start(&self) -> Result<()> {
        self.0.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn set_gain(&self, gain: f32) {
        *self.0.gain.lock() = gain;
        self.0.gains.lock().push(gain);
    }

    fn gain(&self) -> f32 {
        self.0.gain()
    }

    fn stop(&self) {
        self.0.stopped.store(true, Ordering::SeqCst);
    }

    fn is_finished(&self) -> bool {
        self.0.is_stopped()
    }
}

pub struct FakeOutput {
    state: Mutex<OutputState>,
    voices: Mutex<Vec<Arc<VoiceRecord>>>,
    resumes: AtomicUsize,
    refuse_voices: AtomicBool,
}

impl FakeOutput {
    pub fn voices(&self) -> Vec<Arc<VoiceRecord>> {
        self.voices.lock().clone()
    }

    pub fn last_voice(&self) -> Option<Arc<VoiceRecord>> {
        self.voices.lock().last().cloned()
    }

    /// Voices that are started and not yet stopped.
    pub fn live_voices(&self) -> usize {
        self.voices
            .lock()
            .iter()
            .filter(|voice| voice.is_started() && !voice.is_stopped())
            .count()
    }

    pub fn resumes(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }

    pub fn refuse_voices(&self) {
        self.refuse_voices.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl AudioOutput for FakeOutput {
    fn state(&self) -> OutputState {
        *self.state.lock()
    }

    async fn resume(&self) -> Result<()> {
        self.resumes.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        if *state == OutputState::Closed {
            return Err(BridgeError::NotAvailable("output closed".to_string()));
        }
        *state = OutputState::Running;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        *self.state.lock() = OutputState::Closed;
        Ok(())
    }

    fn create_voice(&self, buffer: Arc<PcmBuffer>, params: VoiceParams) -> Result<Box<dyn Voice>> {
        if self.refuse_voices.load(Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed("no free voices".to_string()));
        }
        if *self.state.lock() == OutputState::Closed {
            return Err(BridgeError::NotAvailable("output closed".to_string()));
        }

        let record = Arc::new(VoiceRecord {
            looping: params.looping,
            initial_gain: params.gain,
            frames: buffer.frames(),
            gain: Mutex::new(params.gain),
            gains: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        });
        self.voices.lock().push(Arc::clone(&record));
        Ok(Box::new(FakeVoice(record)))
    }
}

pub struct FakeHost {
    available: bool,
    pub output: Arc<FakeOutput>,
    probes: AtomicUsize,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Self::with_availability(true)
    }

    pub fn unavailable() -> Arc<Self> {
        Self::with_availability(false)
    }

    fn with_availability(available: bool) -> Arc<Self> {
        Arc::new(Self {
            available,
            output: Arc::new(FakeOutput {
                state: Mutex::new(OutputState::Suspended),
                voices: Mutex::new(Vec::new()),
                resumes: AtomicUsize::new(0),
                refuse_voices: AtomicBool::new(false),
            }),
            probes: AtomicUsize::new(0),
        })
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

impl AudioHost for FakeHost {
    fn probe(&self) -> AudioCapabilities {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.available {
            AudioCapabilities::available("fake", 48_000, 2)
        } else {
            AudioCapabilities::unavailable("fake", "no output device")
        }
    }

    fn open(&self, _capabilities: &AudioCapabilities) -> Result<Arc<dyn AudioOutput>> {
        let output: Arc<dyn AudioOutput> = self.output.clone();
        Ok(output)
    }
}

pub struct Fixture {
    pub engine: SoundEngine,
    pub http: Arc<FakeHttp>,
    pub host: Arc<FakeHost>,
}

impl Fixture {
    /// Retro desktop catalog with every sound served.
    pub fn new() -> Self {
        Self::with_tuning(EngineTuning::default())
    }

    pub fn with_tuning(tuning: EngineTuning) -> Self {
        let http = FakeHttp::new();
        let catalog = SoundCatalog::retro_desktop("/audio");
        http.serve_catalog(&catalog);
        Self::build(http, FakeHost::new(), catalog, tuning)
    }

    pub fn build(
        http: Arc<FakeHttp>,
        host: Arc<FakeHost>,
        catalog: SoundCatalog,
        tuning: EngineTuning,
    ) -> Self {
        let config = EngineConfig::builder()
            .http_client(http.clone())
            .audio_host(host.clone())
            .decoder(Arc::new(FakeDecoder))
            .tuning(tuning)
            .build()
            .expect("valid test config");

        Self {
            engine: SoundEngine::new(config, catalog),
            http,
            host,
        }
    }

    pub fn output(&self) -> &FakeOutput {
        &self.host.output
    }
}

pub fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

/// Lets spawned tasks run without moving the paused clock much.
pub async fn settle() {
    core_async::sleep(ms(1)).await;
}

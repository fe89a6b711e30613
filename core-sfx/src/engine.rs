//! # Sound Engine
//!
//! The facade UI code talks to. Every operation is fire-and-forget from the
//! caller's point of view: failures are logged, the most recent one is kept
//! for [`SoundEngine::status`], and the call returns `None` or nothing.
//!
//! ## Flow
//!
//! ```text
//! play_sound ─► interaction gate ─► catalog ─► context (probe/resume)
//!            ─► loader (cache | fetch + decode) ─► SoundHandle ─► registry
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use core_sfx::{PlayOptions, SoundCatalog, SoundEngine};
//!
//! let engine = SoundEngine::new(config, SoundCatalog::default());
//! engine.play_sound("click", PlayOptions::new()).await;
//! engine.play_operation_sound("scan", Duration::from_secs(4), PlayOptions::new()).await;
//! engine.play_ambient().await;
//! ```

use crate::catalog::{SoundCatalog, AMBIENT_SOUND};
use crate::context::{ContextManager, ContextState};
use crate::controller::{FadeSettings, PlaybackPlan, SoundHandle};
use crate::decoder::SymphoniaDecoder;
use crate::error::{Result, SfxError};
use crate::loader::{BufferLoader, LoaderSettings};
use crate::options::PlayOptions;
use crate::status::EngineStatus;
use bridge_traits::{AudioOutput, PcmBuffer, SampleDecoder};
use core_runtime::{EngineConfig, EngineTuning, InteractionGate};
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Sound-effect engine facade. Clones share the same engine.
#[derive(Clone)]
pub struct SoundEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    catalog: SoundCatalog,
    tuning: EngineTuning,
    fade: FadeSettings,
    context: ContextManager,
    loader: Arc<BufferLoader>,
    /// Live playbacks per sound id
    active: Mutex<HashMap<String, Vec<SoundHandle>>>,
    /// Background loop; never in `active`
    ambient: Mutex<Option<SoundHandle>>,
    ambient_starting: AtomicBool,
    /// Bumped by every `stop_ambient`, under the `ambient` lock
    ambient_epoch: AtomicU64,
    interaction: AtomicBool,
    preload_started: AtomicBool,
    preloaded: AtomicBool,
    torn_down: AtomicBool,
    last_error: Mutex<Option<SfxError>>,
}

impl SoundEngine {
    pub fn new(config: EngineConfig, catalog: SoundCatalog) -> Self {
        let decoder: Arc<dyn SampleDecoder> = config
            .decoder
            .unwrap_or_else(|| Arc::new(SymphoniaDecoder::new()));
        let loader = BufferLoader::new(
            config.http_client,
            decoder,
            LoaderSettings::from(&config.tuning),
        );

        info!(
            sounds = catalog.len(),
            gate = ?config.tuning.interaction_gate,
            "Sound engine created"
        );

        Self {
            inner: Arc::new(EngineInner {
                fade: FadeSettings::from(&config.tuning),
                context: ContextManager::new(config.audio_host),
                loader: Arc::new(loader),
                catalog,
                tuning: config.tuning,
                active: Mutex::new(HashMap::new()),
                ambient: Mutex::new(None),
                ambient_starting: AtomicBool::new(false),
                ambient_epoch: AtomicU64::new(0),
                interaction: AtomicBool::new(false),
                preload_started: AtomicBool::new(false),
                preloaded: AtomicBool::new(false),
                torn_down: AtomicBool::new(false),
                last_error: Mutex::new(None),
            }),
        }
    }

    /// Plays `id` and returns its handle, or `None` on any failure.
    ///
    /// Under [`InteractionGate::Explicit`] a request made before
    /// [`notify_user_interaction`](Self::notify_user_interaction) returns
    /// `None` without recording an error.
    #[instrument(skip(self, options), fields(sound = id))]
    pub async fn play_sound(&self, id: &str, options: PlayOptions) -> Option<SoundHandle> {
        match self.try_play_sound(id, options).await {
            Ok(handle) => Some(handle),
            Err(error) => {
                self.inner.fail(error);
                None
            }
        }
    }

    /// Like [`play_sound`](Self::play_sound) but returns the failure
    /// instead of recording it.
    pub async fn try_play_sound(&self, id: &str, options: PlayOptions) -> Result<SoundHandle> {
        let prepared = self.prepare(id, &options).await?;
        self.inner.register(
            id,
            &prepared.output,
            prepared.buffer,
            &prepared.plan,
            options.wants_loop(),
        )
    }

    /// Everything up to the voice: gate, catalog, context and buffer.
    async fn prepare(&self, id: &str, options: &PlayOptions) -> Result<Prepared> {
        let inner = &self.inner;

        if inner.torn_down.load(Ordering::Acquire) {
            return Err(SfxError::ContextUnavailable(
                "engine torn down".to_string(),
            ));
        }

        if !inner.interaction.load(Ordering::Acquire) {
            match inner.tuning.interaction_gate {
                InteractionGate::FirstPlay => {
                    debug!("First playback request counts as user interaction");
                    inner.interaction.store(true, Ordering::Release);
                }
                InteractionGate::Explicit => return Err(SfxError::InteractionRequired),
            }
        }

        let definition = inner
            .catalog
            .get(id)
            .ok_or_else(|| SfxError::UnknownSound(id.to_string()))?;

        let output = inner.context.ensure_context()?;
        inner.context.resume_if_suspended(&output).await?;

        let buffer = inner.loader.load(id, &definition.candidates).await?;
        let plan = PlaybackPlan::resolve(options, definition.volume, buffer.duration());

        Ok(Prepared {
            output,
            buffer,
            plan,
        })
    }

    /// Plays a sound that accompanies a UI operation of length `operation`.
    ///
    /// The sound loops if the operation outlasts it and closes with a fade
    /// of a tenth of the operation, capped at 500 ms by default.
    pub async fn play_operation_sound(
        &self,
        id: &str,
        operation: Duration,
        options: PlayOptions,
    ) -> Option<SoundHandle> {
        let options = options
            .operation_duration(operation)
            .fade_out(self.inner.tuning.operation_fade_out(operation));
        self.play_sound(id, options).await
    }

    /// Stops every live playback of `id`.
    pub fn stop_sound(&self, id: &str) {
        let handles = self.inner.active.lock().remove(id);
        if let Some(handles) = handles {
            for handle in handles {
                handle.halt();
            }
            debug!(sound = id, "Sound stopped");
        }
    }

    /// Starts the background loop unless it is already running.
    ///
    /// The loop lives outside the named-sound registry: `stop_sound` and
    /// `play_sound` on the ambient id never touch it. A `stop_ambient` that
    /// lands while the loop is still loading wins.
    pub async fn play_ambient(&self) {
        let inner = &self.inner;
        if inner
            .ambient
            .lock()
            .as_ref()
            .is_some_and(SoundHandle::is_playing)
        {
            return;
        }
        let Some(_latch) = StartLatch::acquire(&inner.ambient_starting) else {
            return;
        };
        let epoch = inner.ambient_epoch.load(Ordering::Acquire);

        let options = PlayOptions::new()
            .looping(true)
            .volume(inner.tuning.ambient_volume)
            .fade_in(inner.tuning.ambient_fade_in());

        let prepared = match self.prepare(AMBIENT_SOUND, &options).await {
            Ok(prepared) => prepared,
            Err(error) => {
                inner.fail(error);
                return;
            }
        };

        let mut slot = inner.ambient.lock();
        if inner.torn_down.load(Ordering::Acquire) {
            return;
        }
        if inner.ambient_epoch.load(Ordering::Acquire) != epoch {
            debug!("Ambient loop stopped before it started");
            return;
        }

        match SoundHandle::start(
            AMBIENT_SOUND,
            &prepared.output,
            prepared.buffer,
            &prepared.plan,
            inner.fade,
        ) {
            Ok(handle) => {
                info!("Ambient loop started");
                *slot = Some(handle);
            }
            Err(error) => {
                drop(slot);
                inner.record(error);
            }
        }
    }

    /// Fades the background loop out, or cancels one that is still
    /// starting. No-op otherwise.
    pub fn stop_ambient(&self) {
        let handle = {
            let mut slot = self.inner.ambient.lock();
            self.inner.ambient_epoch.fetch_add(1, Ordering::AcqRel);
            slot.take()
        };
        if let Some(handle) = handle {
            debug!("Fading out ambient loop");
            handle.start_fade_out(self.inner.tuning.ambient_fade_out());
        }
    }

    /// Warms the cache: critical sounds one by one, then the rest
    /// concurrently. Failures are logged and skipped. Runs once.
    #[instrument(skip(self))]
    pub async fn preload_sounds(&self) {
        let inner = &self.inner;
        if inner.preloaded.load(Ordering::Acquire)
            || inner.preload_started.swap(true, Ordering::AcqRel)
        {
            return;
        }

        if let Err(error) = inner.context.ensure_context() {
            inner.record(error);
            inner.preload_started.store(false, Ordering::Release);
            return;
        }

        let critical: Vec<&str> = inner
            .tuning
            .critical_sounds
            .iter()
            .map(String::as_str)
            .filter(|id| inner.catalog.contains(id))
            .collect();

        for id in &critical {
            if let Err(error) = self.load(id).await {
                inner.record(error);
            }
        }

        let remaining = inner
            .catalog
            .ids()
            .filter(|id| !critical.contains(id))
            .map(|id| self.load(id));

        for result in join_all(remaining).await {
            if let Err(error) = result {
                inner.record(error);
            }
        }

        inner.preloaded.store(true, Ordering::Release);
        info!(
            loaded = inner.loader.loaded_count(),
            total = inner.catalog.len(),
            "Preload finished"
        );
    }

    async fn load(&self, id: &str) -> Result<Arc<PcmBuffer>> {
        let definition = self
            .inner
            .catalog
            .get(id)
            .ok_or_else(|| SfxError::UnknownSound(id.to_string()))?;
        self.inner.loader.load(id, &definition.candidates).await
    }

    /// Explicit "the user clicked" signal: opens the interaction gate,
    /// resumes the output and preloads the catalog.
    ///
    /// Returns whether audio ended up enabled.
    pub async fn notify_user_interaction(&self) -> bool {
        let inner = &self.inner;
        inner.interaction.store(true, Ordering::Release);

        let output = match inner.context.ensure_context() {
            Ok(output) => output,
            Err(error) => {
                inner.record(error);
                return false;
            }
        };

        if let Err(error) = inner.context.resume_if_suspended(&output).await {
            inner.record(error);
            return false;
        }

        self.preload_sounds().await;
        true
    }

    /// An output exists and has not been closed.
    pub fn is_audio_enabled(&self) -> bool {
        self.inner.context.is_open()
    }

    /// Stops everything and closes the output. Later calls do nothing.
    #[instrument(skip(self))]
    pub async fn teardown(&self) {
        let inner = &self.inner;
        if inner.torn_down.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Some(ambient) = inner.ambient.lock().take() {
            ambient.halt();
        }

        let handles: Vec<SoundHandle> = inner
            .active
            .lock()
            .drain()
            .flat_map(|(_, handles)| handles)
            .collect();
        let stopped = handles.iter().filter(|handle| handle.halt()).count();

        inner.context.close().await;
        info!(stopped, "Sound engine torn down");
    }

    /// Sound ids with at least one live playback, sorted.
    pub fn active_sounds(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .inner
            .active
            .lock()
            .iter()
            .filter(|(_, handles)| handles.iter().any(SoundHandle::is_playing))
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn status(&self) -> EngineStatus {
        let inner = &self.inner;
        EngineStatus {
            context_state: inner.context.state(),
            interaction_observed: inner.interaction.load(Ordering::Acquire),
            loaded_buffers: inner.loader.loaded_count(),
            total_sounds: inner.catalog.len(),
            active_sounds: self.active_sounds(),
            ambient_playing: inner
                .ambient
                .lock()
                .as_ref()
                .is_some_and(SoundHandle::is_playing),
            last_error: inner.last_error.lock().as_ref().map(ToString::to_string),
            capabilities: inner.context.capabilities(),
        }
    }

    pub fn last_error(&self) -> Option<SfxError> {
        self.inner.last_error.lock().clone()
    }

    pub fn context_state(&self) -> ContextState {
        self.inner.context.state()
    }

    pub fn catalog(&self) -> &SoundCatalog {
        &self.inner.catalog
    }

    /// Load bookkeeping, for diagnostics and manual resets.
    pub fn loader(&self) -> &BufferLoader {
        &self.inner.loader
    }

    pub fn tuning(&self) -> &EngineTuning {
        &self.inner.tuning
    }
}

struct Prepared {
    output: Arc<dyn AudioOutput>,
    buffer: Arc<PcmBuffer>,
    plan: PlaybackPlan,
}

/// Held while the ambient loop starts. Released on drop, including when the
/// starting future is cancelled.
struct StartLatch<'a>(&'a AtomicBool);

impl<'a> StartLatch<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        (!flag.swap(true, Ordering::AcqRel)).then_some(Self(flag))
    }
}

impl Drop for StartLatch<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl EngineInner {
    /// Logs a swallowed failure; gate refusals are not errors.
    fn fail(&self, error: SfxError) {
        match error {
            SfxError::InteractionRequired => {
                debug!("Ignoring playback before user interaction")
            }
            error => self.record(error),
        }
    }

    fn record(&self, error: SfxError) {
        match &error {
            SfxError::Backoff { .. } => debug!(error = %error, "Sound request skipped"),
            _ => warn!(error = %error, "Sound request failed"),
        }
        *self.last_error.lock() = Some(error);
    }

    /// Starts a playback and swaps it into the registry in one critical
    /// section. A non-looping request replaces every live instance of the
    /// id; a looping one replaces only the non-looping ones.
    fn register(
        self: &Arc<Self>,
        id: &str,
        output: &Arc<dyn AudioOutput>,
        buffer: Arc<PcmBuffer>,
        plan: &PlaybackPlan,
        explicit_loop: bool,
    ) -> Result<SoundHandle> {
        let handle = {
            let mut active = self.active.lock();
            if self.torn_down.load(Ordering::Acquire) {
                return Err(SfxError::ContextUnavailable(
                    "engine torn down".to_string(),
                ));
            }

            let entry = active.entry(id.to_string()).or_default();
            entry.retain(SoundHandle::is_playing);
            entry.retain(|existing| {
                let keep = explicit_loop && existing.is_looping();
                if !keep {
                    existing.halt();
                }
                keep
            });

            match SoundHandle::start(id, output, buffer, plan, self.fade) {
                Ok(handle) => {
                    entry.push(handle.clone());
                    handle
                }
                Err(error) => {
                    if entry.is_empty() {
                        active.remove(id);
                    }
                    return Err(error);
                }
            }
        };

        let engine: Weak<EngineInner> = Arc::downgrade(self);
        let sound = id.to_string();
        let instance = handle.instance_id();
        handle.on_stop(move || {
            if let Some(engine) = engine.upgrade() {
                engine.deregister(&sound, instance);
            }
        });

        Ok(handle)
    }

    fn deregister(&self, id: &str, instance: u64) {
        let mut active = self.active.lock();
        if let Some(handles) = active.get_mut(id) {
            handles.retain(|handle| handle.instance_id() != instance);
            if handles.is_empty() {
                active.remove(id);
            }
        }
    }
}

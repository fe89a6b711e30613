//! # Playback Controller
//!
//! A [`SoundHandle`] is one decoded buffer bound to one output voice. It
//! owns the timers attached to that playback (fade ramps, the scheduled
//! stop) and cancels all of them on [`SoundHandle::stop`].
//!
//! Handles are cheap to clone; every clone controls the same instance.

use crate::error::{Result, SfxError};
use crate::options::PlayOptions;
use bridge_traits::{AudioOutput, PcmBuffer, Voice, VoiceParams};
use core_async::sync::CancellationToken;
use core_async::time::sleep_unless_cancelled;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Clamps a requested volume into `0.0..=1.0`. NaN becomes silence.
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

/// Gain ramp settings shared by every handle of an engine.
#[derive(Debug, Clone, Copy)]
pub struct FadeSettings {
    /// Gain a fade-out ramps toward before the voice stops
    pub floor: f32,
    /// Interval between gain updates
    pub step: Duration,
}

impl Default for FadeSettings {
    fn default() -> Self {
        Self {
            floor: 0.01,
            step: Duration::from_millis(20),
        }
    }
}

impl From<&core_runtime::EngineTuning> for FadeSettings {
    fn from(tuning: &core_runtime::EngineTuning) -> Self {
        Self {
            floor: tuning.fade_floor,
            step: tuning.fade_step(),
        }
    }
}

/// Options resolved against the clip: what actually happens on the voice.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackPlan {
    pub volume: f32,
    pub looping: bool,
    pub fade_in: Option<Duration>,
    /// Fade used when `stop_at` is reached
    pub fade_out: Option<Duration>,
    /// Timed end requested by the caller
    pub stop_at: Option<Duration>,
    /// Natural end of a non-looping clip
    pub clip_end: Option<Duration>,
}

impl PlaybackPlan {
    /// Resolves caller options for a clip of length `clip`.
    ///
    /// - With an operation duration and no explicit loop, the clip loops when
    ///   the operation outlasts it and ends at the operation duration.
    /// - An explicit loop runs until stopped.
    /// - `duration` ends a non-looping playback early.
    pub fn resolve(options: &PlayOptions, default_volume: f32, clip: Duration) -> Self {
        let volume = clamp_volume(options.volume.unwrap_or(default_volume));
        let explicit_loop = options.wants_loop();
        let non_zero = |d: Option<Duration>| d.filter(|d| !d.is_zero());

        let (looping, stop_at) = match options.operation_duration {
            Some(operation) if !explicit_loop => (operation > clip, Some(operation)),
            Some(_) => (true, None),
            None if explicit_loop => (true, None),
            None => (false, options.duration),
        };

        Self {
            volume,
            looping,
            fade_in: non_zero(options.fade_in),
            fade_out: non_zero(options.fade_out),
            stop_at,
            clip_end: (!looping).then_some(clip),
        }
    }

    /// The first end event and whether it was requested (true) or natural.
    fn first_end(&self) -> Option<(Duration, bool)> {
        match (self.stop_at, self.clip_end) {
            (Some(stop), Some(clip)) if clip < stop => Some((clip, false)),
            (Some(stop), _) => Some((stop, true)),
            (None, Some(clip)) => Some((clip, false)),
            (None, None) => None,
        }
    }
}

type StopHook = Box<dyn FnOnce() + Send>;

struct HandleInner {
    instance: u64,
    sound_id: String,
    looping: bool,
    fade: FadeSettings,
    voice: Mutex<Option<Box<dyn Voice>>>,
    volume: Mutex<f32>,
    fading_out: AtomicBool,
    /// Cancelled exactly once, on stop
    lifetime: CancellationToken,
    fade_in: Mutex<Option<CancellationToken>>,
    on_stop: Mutex<Option<StopHook>>,
}

impl Drop for HandleInner {
    fn drop(&mut self) {
        if let Some(voice) = self.voice.get_mut().take() {
            voice.stop();
        }
        self.lifetime.cancel();
    }
}

/// Control handle for one playing sound.
#[derive(Clone)]
pub struct SoundHandle {
    inner: Arc<HandleInner>,
}

impl fmt::Debug for SoundHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoundHandle")
            .field("instance", &self.inner.instance)
            .field("sound_id", &self.inner.sound_id)
            .field("looping", &self.inner.looping)
            .field("playing", &self.is_playing())
            .finish()
    }
}

impl SoundHandle {
    /// Creates a voice for `buffer`, starts it and schedules fades and stops
    /// from `plan`. Must run inside a runtime.
    pub fn start(
        sound_id: &str,
        output: &Arc<dyn AudioOutput>,
        buffer: Arc<PcmBuffer>,
        plan: &PlaybackPlan,
        fade: FadeSettings,
    ) -> Result<Self> {
        let initial_gain = if plan.fade_in.is_some() { 0.0 } else { plan.volume };
        let setup_failure = |reason: String| SfxError::PlaybackSetupFailure {
            sound: sound_id.to_string(),
            reason,
        };

        let voice = output
            .create_voice(
                buffer,
                VoiceParams {
                    gain: initial_gain,
                    looping: plan.looping,
                },
            )
            .map_err(|e| setup_failure(e.to_string()))?;

        if let Err(e) = voice.start() {
            voice.stop();
            return Err(setup_failure(e.to_string()));
        }

        let handle = Self {
            inner: Arc::new(HandleInner {
                instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
                sound_id: sound_id.to_string(),
                looping: plan.looping,
                fade,
                voice: Mutex::new(Some(voice)),
                volume: Mutex::new(plan.volume),
                fading_out: AtomicBool::new(false),
                lifetime: CancellationToken::new(),
                fade_in: Mutex::new(None),
                on_stop: Mutex::new(None),
            }),
        };

        debug!(
            sound = sound_id,
            instance = handle.inner.instance,
            volume = plan.volume,
            looping = plan.looping,
            stop_at_ms = plan.stop_at.map(|d| d.as_millis() as u64),
            "Playback started"
        );

        if let Some(fade_in) = plan.fade_in {
            handle.start_fade_in(fade_in, plan.volume);
        }

        if let Some((at, requested)) = plan.first_end() {
            let fade_out = if requested { plan.fade_out } else { None };
            handle.schedule_end(at, fade_out);
        }

        Ok(handle)
    }

    fn start_fade_in(&self, duration: Duration, target: f32) {
        let token = self.inner.lifetime.child_token();
        if let Some(previous) = self.inner.fade_in.lock().replace(token.clone()) {
            previous.cancel();
        }

        let inner = Arc::clone(&self.inner);
        core_async::spawn(async move {
            ramp(&inner, 0.0, target, duration, Curve::Linear, &token).await;
        });
    }

    fn schedule_end(&self, at: Duration, fade_out: Option<Duration>) {
        let handle = self.clone_weak();
        let token = self.inner.lifetime.clone();
        core_async::spawn(async move {
            if !sleep_unless_cancelled(at, &token).await {
                return;
            }
            let Some(handle) = handle.upgrade() else {
                return;
            };
            match fade_out {
                Some(fade) => handle.start_fade_out(fade),
                None => handle.stop(),
            }
        });
    }

    fn clone_weak(&self) -> WeakHandle {
        WeakHandle(Arc::downgrade(&self.inner))
    }

    /// Sets the gain immediately, clamped into `0.0..=1.0`.
    ///
    /// Cancels a running fade-in. Ignored once stopped or while fading out.
    pub fn set_volume(&self, volume: f32) {
        if !self.is_playing() || self.inner.fading_out.load(Ordering::Acquire) {
            return;
        }
        let volume = clamp_volume(volume);
        if let Some(ramp) = self.inner.fade_in.lock().take() {
            ramp.cancel();
        }
        *self.inner.volume.lock() = volume;
        if let Some(voice) = self.inner.voice.lock().as_ref() {
            voice.set_gain(volume);
        }
    }

    /// Starts a fade toward near-silence over `duration` and stops at its
    /// end. Returns immediately; a second call while fading is ignored.
    pub fn start_fade_out(&self, duration: Duration) {
        if !self.is_playing() || self.inner.fading_out.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(ramp) = self.inner.fade_in.lock().take() {
            ramp.cancel();
        }
        if duration.is_zero() {
            self.stop();
            return;
        }

        let from = self.current_gain();
        let floor = self.inner.fade.floor;
        let inner = Arc::clone(&self.inner);
        let token = self.inner.lifetime.clone();
        core_async::spawn(async move {
            let completed = if from > floor {
                ramp(&inner, from, floor, duration, Curve::Exponential, &token).await
            } else {
                sleep_unless_cancelled(duration, &token).await
            };
            if completed {
                SoundHandle { inner }.stop();
            }
        });
    }

    /// Fades out over `duration`, then stops. Resolves once stopped, also
    /// when [`stop`](Self::stop) cuts the fade short.
    pub async fn fade_out(&self, duration: Duration) {
        self.start_fade_out(duration);
        self.stopped().await;
    }

    /// Halts playback and releases the voice. Safe to call repeatedly.
    pub fn stop(&self) {
        if self.halt() {
            let hook = self.inner.on_stop.lock().take();
            if let Some(hook) = hook {
                hook();
            }
        }
    }

    /// Stops without running the stop hook. Returns `false` if already
    /// stopped.
    pub(crate) fn halt(&self) -> bool {
        let Some(voice) = self.inner.voice.lock().take() else {
            return false;
        };
        self.inner.lifetime.cancel();
        voice.stop();
        debug!(
            sound = %self.inner.sound_id,
            instance = self.inner.instance,
            "Playback stopped"
        );
        true
    }

    /// Runs `hook` once when the handle stops. Runs it right away when the
    /// handle has already stopped.
    pub(crate) fn on_stop(&self, hook: impl FnOnce() + Send + 'static) {
        if !self.is_playing() {
            hook();
            return;
        }
        *self.inner.on_stop.lock() = Some(Box::new(hook));
        // Stopped between the check and the store.
        if !self.is_playing() {
            let hook = self.inner.on_stop.lock().take();
            if let Some(hook) = hook {
                hook();
            }
        }
    }

    /// Resolves once the handle has stopped.
    pub async fn stopped(&self) {
        self.inner.lifetime.cancelled().await;
    }

    pub fn is_playing(&self) -> bool {
        !self.inner.lifetime.is_cancelled()
    }

    /// Target volume; the live gain differs while fading.
    pub fn volume(&self) -> f32 {
        *self.inner.volume.lock()
    }

    /// Gain currently applied to the voice; 0.0 once stopped.
    pub fn current_gain(&self) -> f32 {
        self.inner
            .voice
            .lock()
            .as_ref()
            .map(|voice| voice.gain())
            .unwrap_or(0.0)
    }

    pub fn is_looping(&self) -> bool {
        self.inner.looping
    }

    pub fn is_fading_out(&self) -> bool {
        self.inner.fading_out.load(Ordering::Acquire)
    }

    pub fn sound_id(&self) -> &str {
        &self.inner.sound_id
    }

    /// Process-unique instance number.
    pub fn instance_id(&self) -> u64 {
        self.inner.instance
    }

    pub fn same_instance(&self, other: &SoundHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

struct WeakHandle(std::sync::Weak<HandleInner>);

impl WeakHandle {
    fn upgrade(&self) -> Option<SoundHandle> {
        self.0.upgrade().map(|inner| SoundHandle { inner })
    }
}

#[derive(Debug, Clone, Copy)]
enum Curve {
    Linear,
    Exponential,
}

/// Steps the voice gain from `from` to `to` over `duration`.
///
/// Returns `true` when the ramp completed, `false` when cancelled.
async fn ramp(
    inner: &HandleInner,
    from: f32,
    to: f32,
    duration: Duration,
    curve: Curve,
    token: &CancellationToken,
) -> bool {
    let step = inner.fade.step.min(duration).max(Duration::from_millis(1));
    let steps = ((duration.as_secs_f64() / step.as_secs_f64()).ceil() as u32).max(1);

    for i in 1..=steps {
        if !sleep_unless_cancelled(step, token).await {
            return false;
        }
        let progress = i as f32 / steps as f32;
        let gain = match curve {
            Curve::Linear => from + (to - from) * progress,
            Curve::Exponential => from * (to / from).powf(progress),
        };
        match inner.voice.lock().as_ref() {
            Some(voice) => voice.set_gain(gain),
            None => return false,
        }
        trace!(sound = %inner.sound_id, gain, "Gain step");
    }
    true
}

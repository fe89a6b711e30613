//! # Buffer Loader
//!
//! Fetches and decodes sound assets into shared [`PcmBuffer`]s.
//!
//! ## Behaviour
//!
//! - A cached buffer is returned without any I/O.
//! - Concurrent requests for the same sound share one in-flight attempt.
//! - Candidates are tried in order; transport errors, non-2xx statuses,
//!   empty payloads and decode failures all move on to the next one.
//! - A sound that failed may be retried after a backoff window that grows
//!   with every attempt, up to a fixed ceiling. Past the ceiling it stays
//!   failed until [`BufferLoader::reset`].
//! - An attempt runs to completion and fills the cache even when every
//!   caller stopped waiting for it.

use crate::error::{Result, SfxError};
use bridge_traits::{HttpClient, HttpRequest, PcmBuffer, SampleDecoder};
use core_async::time::{timeout, Instant};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

type SharedLoad = Shared<BoxFuture<'static, Result<Arc<PcmBuffer>>>>;

/// Public view of a sound's load bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum LoadState {
    Unloaded,
    Loading,
    Loaded,
    Failed { attempts: u32, last_error: String },
}

/// Loader limits, taken from the engine tuning.
#[derive(Debug, Clone)]
pub struct LoaderSettings {
    pub fetch_timeout: Duration,
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            max_attempts: 3,
            backoff_base: Duration::from_secs(2),
        }
    }
}

impl LoaderSettings {
    /// Window that must elapse after `attempts` failed attempts.
    pub fn backoff_for(&self, attempts: u32) -> Duration {
        self.backoff_base.saturating_mul(attempts)
    }
}

impl From<&core_runtime::EngineTuning> for LoaderSettings {
    fn from(tuning: &core_runtime::EngineTuning) -> Self {
        Self {
            fetch_timeout: tuning.fetch_timeout(),
            max_attempts: tuning.max_attempts(),
            backoff_base: Duration::from_millis(tuning.backoff_base_ms),
        }
    }
}

enum Slot {
    Loading(SharedLoad),
    Loaded(Arc<PcmBuffer>),
    Failed { error: SfxError, retry_at: Instant },
}

enum Next {
    Ready(Arc<PcmBuffer>),
    Join(SharedLoad),
    Refuse(SfxError),
    Start(u32),
}

struct Entry {
    slot: Slot,
    /// Failed attempts so far; cleared on success
    attempts: u32,
    generation: u64,
}

pub struct BufferLoader {
    http: Arc<dyn HttpClient>,
    decoder: Arc<dyn SampleDecoder>,
    settings: LoaderSettings,
    entries: Mutex<HashMap<String, Entry>>,
    generations: AtomicU64,
}

impl BufferLoader {
    pub fn new(
        http: Arc<dyn HttpClient>,
        decoder: Arc<dyn SampleDecoder>,
        settings: LoaderSettings,
    ) -> Self {
        Self {
            http,
            decoder,
            settings,
            entries: Mutex::new(HashMap::new()),
            generations: AtomicU64::new(0),
        }
    }

    /// Returns the decoded buffer for `id`, fetching it if needed.
    pub async fn load(self: &Arc<Self>, id: &str, candidates: &[String]) -> Result<Arc<PcmBuffer>> {
        let pending = {
            let mut entries = self.entries.lock();
            let next = match entries.get(id) {
                None => Next::Start(0),
                Some(entry) => match &entry.slot {
                    Slot::Loaded(buffer) => Next::Ready(Arc::clone(buffer)),
                    Slot::Loading(pending) => Next::Join(pending.clone()),
                    Slot::Failed { error, retry_at } => {
                        let now = Instant::now();
                        if entry.attempts >= self.settings.max_attempts {
                            Next::Refuse(error.clone())
                        } else if now < *retry_at {
                            Next::Refuse(SfxError::Backoff {
                                sound: id.to_string(),
                                remaining: *retry_at - now,
                            })
                        } else {
                            Next::Start(entry.attempts)
                        }
                    }
                },
            };

            match next {
                Next::Ready(buffer) => return Ok(buffer),
                Next::Refuse(error) => return Err(error),
                Next::Join(pending) => {
                    debug!(sound = id, "Joining in-flight load");
                    pending
                }
                Next::Start(attempts) => self.start_attempt(&mut entries, id, candidates, attempts),
            }
        };

        pending.await
    }

    /// Registers a new attempt and spawns a task that drives it to the end.
    fn start_attempt(
        self: &Arc<Self>,
        entries: &mut HashMap<String, Entry>,
        id: &str,
        candidates: &[String],
        attempts: u32,
    ) -> SharedLoad {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let this = Arc::clone(self);
        let sound = id.to_string();
        let candidates = candidates.to_vec();

        let pending: SharedLoad = async move {
            let result = this.fetch_and_decode(&sound, &candidates).await;
            this.settle(&sound, generation, result)
        }
        .boxed()
        .shared();

        entries.insert(
            id.to_string(),
            Entry {
                slot: Slot::Loading(pending.clone()),
                attempts,
                generation,
            },
        );

        let driver = pending.clone();
        core_async::spawn(async move {
            let _ = driver.await;
        });

        pending
    }

    /// Records the outcome of an attempt. A reset during the attempt wins.
    fn settle(
        &self,
        id: &str,
        generation: u64,
        result: std::result::Result<Arc<PcmBuffer>, String>,
    ) -> Result<Arc<PcmBuffer>> {
        let mut entries = self.entries.lock();
        let current = entries
            .get(id)
            .filter(|entry| entry.generation == generation)
            .map(|entry| entry.attempts);

        match result {
            Ok(buffer) => {
                info!(
                    sound = id,
                    frames = buffer.frames(),
                    duration_ms = buffer.duration().as_millis() as u64,
                    "Sound loaded"
                );
                if current.is_some() {
                    entries.insert(
                        id.to_string(),
                        Entry {
                            slot: Slot::Loaded(Arc::clone(&buffer)),
                            attempts: 0,
                            generation,
                        },
                    );
                }
                Ok(buffer)
            }
            Err(reason) => {
                let attempt = current.unwrap_or(0) + 1;
                let error = SfxError::LoadFailure {
                    sound: id.to_string(),
                    attempt,
                    reason,
                };
                warn!(sound = id, attempt, error = %error, "Sound failed to load");

                if current.is_some() {
                    let retry_at = Instant::now() + self.settings.backoff_for(attempt);
                    entries.insert(
                        id.to_string(),
                        Entry {
                            slot: Slot::Failed {
                                error: error.clone(),
                                retry_at,
                            },
                            attempts: attempt,
                            generation,
                        },
                    );
                }
                Err(error)
            }
        }
    }

    #[instrument(skip(self, candidates), fields(candidates = candidates.len()))]
    async fn fetch_and_decode(
        &self,
        id: &str,
        candidates: &[String],
    ) -> std::result::Result<Arc<PcmBuffer>, String> {
        let mut last_error = None;

        for uri in candidates {
            match self.try_candidate(uri).await {
                Ok(buffer) => return Ok(Arc::new(buffer)),
                Err(reason) => {
                    debug!(
                        sound = id,
                        asset = %core_runtime::logging::asset_name(uri),
                        reason = %reason,
                        "Candidate failed"
                    );
                    last_error = Some(format!("{}: {}", uri, reason));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| "no candidate URIs".to_string()))
    }

    async fn try_candidate(&self, uri: &str) -> std::result::Result<PcmBuffer, String> {
        let request = HttpRequest::get(uri)
            .header("Accept", "audio/*")
            .timeout(self.settings.fetch_timeout);

        let response = timeout(self.settings.fetch_timeout, self.http.execute(request))
            .await
            .map_err(|_| format!("timed out after {:?}", self.settings.fetch_timeout))?
            .map_err(|e| e.to_string())?;

        if !response.is_success() {
            return Err(format!("HTTP {}", response.status));
        }

        if response.body.is_empty() {
            return Err("empty payload".to_string());
        }

        if let Some(content_type) = response.content_type() {
            if !content_type.starts_with("audio/") {
                warn!(
                    asset = %core_runtime::logging::asset_name(uri),
                    content_type,
                    "Unexpected content type for audio asset"
                );
            }
        }

        let hint = extension_of(uri);
        let buffer = self
            .decoder
            .decode(response.body, hint)
            .await
            .map_err(|e| format!("decode failed: {}", e))?;

        if buffer.is_empty() {
            return Err("decoded to zero frames".to_string());
        }

        Ok(buffer)
    }

    /// Cached buffer for `id`, without triggering a load.
    pub fn cached(&self, id: &str) -> Option<Arc<PcmBuffer>> {
        match self.entries.lock().get(id) {
            Some(Entry {
                slot: Slot::Loaded(buffer),
                ..
            }) => Some(Arc::clone(buffer)),
            _ => None,
        }
    }

    pub fn is_loaded(&self, id: &str) -> bool {
        self.cached(id).is_some()
    }

    pub fn loaded_count(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|entry| matches!(entry.slot, Slot::Loaded(_)))
            .count()
    }

    /// Failed attempts recorded for `id` since its last success or reset.
    pub fn retry_attempts(&self, id: &str) -> u32 {
        self.entries
            .lock()
            .get(id)
            .map(|entry| entry.attempts)
            .unwrap_or(0)
    }

    pub fn load_state(&self, id: &str) -> LoadState {
        match self.entries.lock().get(id) {
            None => LoadState::Unloaded,
            Some(entry) => match &entry.slot {
                Slot::Loading(_) => LoadState::Loading,
                Slot::Loaded(_) => LoadState::Loaded,
                Slot::Failed { error, .. } => LoadState::Failed {
                    attempts: entry.attempts,
                    last_error: error.to_string(),
                },
            },
        }
    }

    /// Forgets everything known about `id`, including a permanent failure.
    pub fn reset(&self, id: &str) {
        if self.entries.lock().remove(id).is_some() {
            debug!(sound = id, "Load state reset");
        }
    }

    pub fn reset_all(&self) {
        self.entries.lock().clear();
    }
}

/// File extension of a URI, ignoring query and fragment.
fn extension_of(uri: &str) -> Option<&str> {
    let path = uri.split(['?', '#']).next()?;
    let name = path.rsplit('/').next()?;
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("/audio/boot.mp3"), Some("mp3"));
        assert_eq!(extension_of("https://cdn.example/a/click.ogg?v=3"), Some("ogg"));
        assert_eq!(extension_of("/audio/noext"), None);
        assert_eq!(extension_of("/audio/.hidden"), None);
    }

    #[test]
    fn test_settings_from_tuning() {
        let tuning = core_runtime::EngineTuning::default();
        let settings = LoaderSettings::from(&tuning);
        assert_eq!(settings.fetch_timeout, Duration::from_secs(10));
        assert_eq!(settings.max_attempts, 3);
        assert_eq!(settings.backoff_base, Duration::from_secs(2));
    }

    #[test]
    fn test_backoff_grows_with_attempts() {
        let settings = LoaderSettings::from(&core_runtime::EngineTuning::default());
        assert_eq!(settings.backoff_for(1), Duration::from_secs(2));
        assert_eq!(settings.backoff_for(2), Duration::from_secs(4));
    }
}

//! Log forwarding abstractions.
//!
//! Lets a host mirror the engine's structured `tracing` events into its own
//! log pipeline (browser console, OS logger, test capture).

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One forwarded event.
///
/// Fields are kept sorted so rendered lines are stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    /// Emitting module, e.g. `core_sfx::loader`
    pub target: String,
    pub message: String,
    pub fields: BTreeMap<String, String>,
    /// Innermost span the event was recorded in
    pub span: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Utc::now(),
            target: target.into(),
            message: message.into(),
            fields: BTreeMap::new(),
            span: None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn in_span(mut self, span: impl Into<String>) -> Self {
        self.span = Some(span.into());
        self
    }

    /// The `sound` field most engine events carry.
    pub fn sound(&self) -> Option<&str> {
        self.fields.get("sound").map(String::as_str)
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:>5} {}",
            self.timestamp.format("%H:%M:%S%.3f"),
            self.level,
            self.target
        )?;
        if let Some(span) = &self.span {
            write!(f, ":{}", span)?;
        }
        write!(f, " {}", self.message)?;
        for (key, value) in &self.fields {
            write!(f, " {}={}", key, value)?;
        }
        Ok(())
    }
}

/// Receives every event that survives the subscriber's filter.
///
/// Implementations should be cheap: the engine logs from fade and stop
/// timers.
///
/// ```ignore
/// use bridge_traits::log::{LoggerSink, LogEntry, LogLevel};
///
/// async fn report_load_failure(logger: &dyn LoggerSink, sound: &str) {
///     let entry = LogEntry::new(LogLevel::Warn, "core_sfx::loader", "load failed")
///         .with_field("sound", sound);
///     logger.log(entry).await.ok();
/// }
/// ```
#[async_trait::async_trait]
pub trait LoggerSink: Send + Sync {
    async fn log(&self, entry: LogEntry) -> Result<()>;

    /// Entries below this level are dropped before they are built.
    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

/// Keeps the most recent entries in memory, for an in-app diagnostics
/// panel ("why is there no sound?").
#[derive(Debug)]
pub struct RecentLogs {
    capacity: usize,
    min_level: LogLevel,
    entries: Mutex<VecDeque<LogEntry>>,
}

impl RecentLogs {
    pub fn new(capacity: usize, min_level: LogLevel) -> Self {
        Self {
            capacity: capacity.max(1),
            min_level,
            entries: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
        }
    }

    /// Oldest first.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Entries mentioning `sound`, oldest first.
    pub fn for_sound(&self, sound: &str) -> Vec<LogEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|entry| entry.sound() == Some(sound))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Default for RecentLogs {
    fn default() -> Self {
        Self::new(200, LogLevel::Info)
    }
}

#[async_trait::async_trait]
impl LoggerSink for RecentLogs {
    async fn log(&self, entry: LogEntry) -> Result<()> {
        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        self.min_level
    }
}

//! # Logging
//!
//! `tracing` subscriber setup for hosts embedding the sound engine.
//!
//! Engine events carry a `sound` field (and `asset`, `attempt`, `state`
//! where relevant) so a single filter like `core_sfx=debug` is enough to
//! follow one clip from fetch to fade-out. Events can also be mirrored into
//! a host [`LoggerSink`], e.g. a browser console or an in-app log panel.
//!
//! ```ignore
//! use bridge_traits::log::{LogLevel, RecentLogs};
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//! use std::sync::Arc;
//!
//! init_logging(
//!     LoggingConfig::default()
//!         .with_format(LogFormat::Compact)
//!         .with_level(LogLevel::Debug)
//!         .with_logger_sink(Arc::new(RecentLogs::default())),
//! )?;
//! ```

use crate::error::{Error, Result};

use bridge_traits::log::{LogEntry, LogLevel, LoggerSink};
use core_async::runtime;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::{
    filter::EnvFilter,
    fmt::format::FmtSpan,
    layer::{Context, SubscriberExt},
    registry::{LookupSpan, Registry},
    util::SubscriberInitExt,
    Layer,
};

/// Workspace crates, logged at [`LoggingConfig::level`].
const ENGINE_TARGETS: &[&str] = &["retro_sfx", "core_sfx", "core_runtime", "bridge_desktop"];

/// Decoder, output and transport crates, held at `warn`.
const DEPENDENCY_TARGETS: &[&str] = &["symphonia", "rodio", "cpal", "reqwest", "hyper", "rustls"];

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Multi-line, for a developer terminal
    Pretty,
    /// One JSON object per line, for log shipping
    Json,
    /// One line per event
    #[default]
    Compact,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            other => Err(Error::Config(format!("Unknown log format: {other}"))),
        }
    }
}

#[derive(Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Level for the engine's own crates.
    pub level: LogLevel,
    /// Full `EnvFilter` directive string; replaces the level-based default.
    pub filter: Option<String>,
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
    /// Also log span open/close (`play_sound`, `preload_sounds`, `teardown`).
    pub span_events: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            filter: None,
            logger_sink: None,
            span_events: false,
        }
    }
}

impl fmt::Debug for LoggingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingConfig")
            .field("format", &self.format)
            .field("level", &self.level)
            .field("filter", &self.filter)
            .field("logger_sink", &self.logger_sink.is_some())
            .field("span_events", &self.span_events)
            .finish()
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_filter(mut self, directives: impl Into<String>) -> Self {
        self.filter = Some(directives.into());
        self
    }

    pub fn with_logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    /// The directives this config installs.
    pub fn directives(&self) -> String {
        self.filter
            .clone()
            .unwrap_or_else(|| engine_directives(self.level))
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_new(config.directives())
        .map_err(|e| Error::Config(format!("Invalid log filter: {e}")))?;

    tracing_subscriber::registry()
        .with(output_layer(&config))
        .with(filter)
        .with(SinkLayer {
            sink: config.logger_sink.clone(),
        })
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))
}

/// `"<level>,core_sfx=<level>,...,symphonia=warn,..."`
pub fn engine_directives(level: LogLevel) -> String {
    let level = level.as_str();
    std::iter::once(level.to_string())
        .chain(ENGINE_TARGETS.iter().map(|t| format!("{t}={level}")))
        .chain(DEPENDENCY_TARGETS.iter().map(|t| format!("{t}=warn")))
        .collect::<Vec<_>>()
        .join(",")
}

fn output_layer(config: &LoggingConfig) -> BoxedLayer {
    let spans = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    let base = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    match config.format {
        LogFormat::Pretty => base.pretty().with_span_events(spans).boxed(),
        LogFormat::Compact => base.compact().with_span_events(spans).boxed(),
        LogFormat::Json => base
            .json()
            .flatten_event(true)
            .with_current_span(config.span_events)
            .with_span_list(false)
            .boxed(),
    }
}

/// Mirrors events into a [`LoggerSink`].
struct SinkLayer {
    sink: Option<Arc<dyn LoggerSink>>,
}

impl<S> Layer<S> for SinkLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(sink) = &self.sink else {
            return;
        };
        let meta = event.metadata();
        let level = to_log_level(meta.level());
        if level < sink.min_level() {
            return;
        }

        let mut fields = FieldCollector::default();
        event.record(&mut fields);

        let message = fields.message.take().unwrap_or_else(|| meta.name().to_string());
        let mut entry = LogEntry::new(level, meta.target(), message);
        entry.fields = fields.values;
        if let Some(span) = ctx.event_span(event) {
            entry = entry.in_span(span.name());
        }

        deliver(Arc::clone(sink), entry);
    }
}

/// Detached when a runtime is available so fade and stop timers never wait
/// on the host.
fn deliver(sink: Arc<dyn LoggerSink>, entry: LogEntry) {
    let forward = async move {
        if let Err(err) = sink.log(entry).await {
            eprintln!("log sink rejected entry: {err}");
        }
    };
    match runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(forward);
        }
        Err(_) => runtime::block_on(forward),
    }
}

#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    values: BTreeMap<String, String>,
}

impl FieldCollector {
    fn put(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = Some(value),
            name => {
                self.values.insert(name.to_string(), value);
            }
        }
    }
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.put(field, value.to_string());
    }

    // Numbers and bools render the same through Debug.
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, format!("{value:?}"));
    }
}

fn to_log_level(level: &tracing::Level) -> LogLevel {
    match *level {
        tracing::Level::ERROR => LogLevel::Error,
        tracing::Level::WARN => LogLevel::Warn,
        tracing::Level::INFO => LogLevel::Info,
        tracing::Level::DEBUG => LogLevel::Debug,
        tracing::Level::TRACE => LogLevel::Trace,
    }
}

/// File name of an asset URI, for compact log fields.
///
/// `"https://host/audio/scan.ogg"` becomes `"scan.ogg"`.
pub fn asset_name(uri: &str) -> &str {
    uri.rsplit(['/', '\\']).next().unwrap_or(uri)
}

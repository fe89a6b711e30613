//! Global subscriber installation. Only one subscriber per process, so the
//! test that installs it is the only one in this binary touching globals.

use async_trait::async_trait;
use bridge_traits::error::Result as SinkResult;
use bridge_traits::log::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{engine_directives, init_logging, LogFormat, LoggingConfig};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Recorder {
    entries: Mutex<Vec<LogEntry>>,
}

#[async_trait]
impl LoggerSink for Recorder {
    async fn log(&self, entry: LogEntry) -> SinkResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Warn
    }
}

#[test]
fn test_config_defaults() {
    let config = LoggingConfig::default();
    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Info);
    assert!(config.logger_sink.is_none());
    assert_eq!(config.directives(), engine_directives(LogLevel::Info));
}

#[test]
fn test_engine_directives_quiet_dependencies() {
    let directives = engine_directives(LogLevel::Trace);
    assert!(directives.contains("retro_sfx=trace"));
    assert!(directives.contains("reqwest=warn"));
    assert!(directives.contains("rodio=warn"));
}

#[test]
fn test_invalid_filter_is_a_config_error() {
    let config = LoggingConfig::default().with_filter("core_sfx=[");
    let err = init_logging(config).unwrap_err();
    assert!(matches!(err, core_runtime::Error::Config(_)));
}

#[test]
fn test_install_once_and_mirror_to_sink() {
    let recorder = Arc::new(Recorder::default());
    let config = LoggingConfig::default()
        .with_level(LogLevel::Debug)
        .with_logger_sink(recorder.clone());

    init_logging(config.clone()).unwrap();

    // Outside a runtime the sink is driven inline.
    tracing::warn!(target: "core_sfx::engine", sound = "glitch", "Sound failed to play");
    tracing::info!(target: "core_sfx::engine", sound = "click", "below the sink level");

    {
        let entries = recorder.entries.lock().unwrap();
        let mirrored: Vec<_> = entries
            .iter()
            .filter(|e| e.target == "core_sfx::engine")
            .collect();
        assert_eq!(mirrored.len(), 1);
        assert_eq!(mirrored[0].sound(), Some("glitch"));
    }

    assert!(matches!(
        init_logging(config),
        Err(core_runtime::Error::Logging(_))
    ));
}

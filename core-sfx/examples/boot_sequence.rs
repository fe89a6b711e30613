//! # Boot Sequence Example
//!
//! Plays the retro desktop start-up: boot chime, ambient hum, a few UI
//! clicks, a scan that lasts as long as its operation, then shutdown.
//!
//! Run with: `cargo run --example boot_sequence --package core-sfx -- ./public`
//!
//! The directory must contain `audio/<sound>.{mp3,ogg,wav}`. Without the
//! `rodio-output` feature on `bridge-desktop` the engine runs silently and
//! the log shows why.

use anyhow::{Context, Result};
use bridge_desktop::{default_audio_host, LocalAssetClient};
use bridge_traits::LogLevel;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_runtime::EngineConfig;
use core_sfx::{PlayOptions, SoundCatalog, SoundEngine};
use std::sync::Arc;
use std::time::Duration;

#[core_async::main]
async fn main() -> Result<()> {
    init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Debug),
    )
    .context("initializing logging")?;

    let root = std::env::args().nth(1).unwrap_or_else(|| "./public".to_string());
    println!("Serving sounds from {}", root);

    let config = EngineConfig::builder()
        .http_client(Arc::new(LocalAssetClient::new(&root)))
        .audio_host(default_audio_host())
        .build()
        .context("building engine config")?;
    let engine = SoundEngine::new(config, SoundCatalog::default());

    if !engine.notify_user_interaction().await {
        println!("Audio unavailable: {:?}", engine.last_error());
    }

    engine.play_sound("boot", PlayOptions::new()).await;
    core_async::sleep(Duration::from_secs(2)).await;

    engine.play_ambient().await;

    for _ in 0..3 {
        engine.play_sound("click", PlayOptions::new()).await;
        core_async::sleep(Duration::from_millis(400)).await;
    }

    let scan = Duration::from_secs(4);
    engine
        .play_operation_sound("scan", scan, PlayOptions::new())
        .await;
    core_async::sleep(scan).await;

    engine.play_sound("success", PlayOptions::new()).await;
    core_async::sleep(Duration::from_millis(1_500)).await;

    engine.stop_ambient();
    if let Some(shutdown) = engine.play_sound("shutdown", PlayOptions::new()).await {
        shutdown.stopped().await;
    }

    let status = engine.status();
    println!("{}", serde_json::to_string_pretty(&status)?);

    engine.teardown().await;
    Ok(())
}

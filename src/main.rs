#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use guide_feedback::app::{device_event_channel, FeedbackService};
use guide_feedback::console::{ConsoleSpeech, ConsoleVibrator};
use guide_feedback::core::alerts::phrases::RandomPhrase;
use guide_feedback::core::config::ConfigManager;
use guide_feedback::core::devices::Devices;
use guide_feedback::core::error::Result;
use guide_feedback::core::labels::Language;
use guide_feedback::core::trace::{read_trace, PlaybackState, TraceReplay};

#[derive(Parser)]
#[command(name = "guide-feedback")]
#[command(about = "Replay a recorded detection trace through the feedback scheduler")]
struct Cli {
    /// JSON-lines detection trace
    #[arg(long)]
    trace: PathBuf,

    /// Directory holding settings.json
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    /// Playback speed multiplier
    #[arg(long, default_value = "1.0")]
    speed: f64,

    /// Override the configured language (en, zh)
    #[arg(long)]
    language: Option<String>,

    /// Seed phrase selection for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// How long to keep running after the last frame so queued speech drains
    #[arg(long, default_value = "3000")]
    drain_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut settings = ConfigManager::new(cli.config_dir).load();
    if let Some(code) = &cli.language {
        settings.language = code.parse::<Language>()?;
    }

    let mut replay = TraceReplay::new(read_trace(&cli.trace)?);
    replay.set_speed(cli.speed);
    log::info!(
        "Replaying {} frames ({:.1}s at x{})",
        replay.remaining(),
        replay.duration().as_secs_f64(),
        replay.speed()
    );

    let (events, receiver) = device_event_channel();
    let devices = Devices::new(
        Arc::new(ConsoleSpeech::new(events)),
        Arc::new(ConsoleVibrator),
    );
    let selector = match cli.seed {
        Some(seed) => RandomPhrase::seeded(seed),
        None => RandomPhrase::new(),
    };
    let service = FeedbackService::spawn(settings, devices, receiver, Box::new(selector));
    let handle = service.handle();

    replay.set_state(PlaybackState::Playing);
    let mut last = Instant::now();
    while !replay.is_finished() {
        tokio::time::sleep(Duration::from_millis(10)).await;
        let now = Instant::now();
        for frame in replay.advance(now - last) {
            handle.submit(frame)?;
        }
        last = now;
    }

    tokio::time::sleep(Duration::from_millis(cli.drain_ms)).await;
    service.shutdown().await
}

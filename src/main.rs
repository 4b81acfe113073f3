// The WASAPI backend is the one place unsafe is allowed
#![cfg_attr(not(target_os = "windows"), forbid(unsafe_code))]

mod audio;
mod config;
mod constants;
mod coordinator;
mod errors;
mod hotkeys;
mod persistence;

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn, Level as TraceLevel};
use tracing_subscriber::FmtSubscriber;

use audio::{apply, create_backend, DiffEvent, Snapshot};
use config::{Configuration, ProfileCollection};
use coordinator::{Coordinator, PresentationSink};
use persistence::PersistenceManager;

#[derive(Parser, Debug)]
#[command(name = "overmix", version, about = "Per-application volume mixer overlay engine")]
struct Args {
    /// Directory holding the configuration documents
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Refresh interval in milliseconds
    #[arg(long, default_value_t = constants::timing::REFRESH_INTERVAL_MS)]
    refresh_interval_ms: u64,

    /// Start with the overlay hidden (toggle hotkey shows it)
    #[arg(long)]
    hidden: bool,
}

/// Headless presentation sink: session changes maintain a mirror of the
/// coordinator's snapshot and go to the log. A GUI links against the same
/// `PresentationSink` boundary instead.
#[derive(Default)]
struct ConsoleSink {
    view: Snapshot,
}

impl PresentationSink for ConsoleSink {
    fn sessions_changed(&mut self, events: &[DiffEvent]) {
        for event in events {
            match event {
                DiffEvent::Added(session) => {
                    info!(
                        session = %session.id,
                        name = %session.display_name,
                        volume = session.volume,
                        muted = session.muted,
                        "session added"
                    );
                }
                DiffEvent::Removed(id) => info!(session = %id, "session removed"),
                DiffEvent::Updated {
                    id,
                    new_volume,
                    new_muted,
                    ..
                } => {
                    info!(
                        session = %id,
                        volume = new_volume,
                        muted = new_muted,
                        "session updated"
                    );
                }
            }
        }
        apply(&mut self.view, events);
        info!(sessions = self.view.len(), "session view updated");
    }

    fn configuration_changed(&mut self, config: &Configuration) {
        info!(
            width = config.overlay_width,
            height = config.overlay_height,
            opacity = config.overlay_opacity,
            "configuration changed"
        );
    }

    fn profiles_changed(&mut self, profiles: &ProfileCollection) {
        info!(
            active = %profiles.active_name(),
            profiles = profiles.len(),
            "profile list changed"
        );
    }

    fn overlay_visibility_changed(&mut self, visible: bool) {
        info!(visible, "overlay visibility changed");
    }

    fn settings_requested(&mut self) {
        info!("settings requested");
    }

    fn notice(&mut self, message: &str) {
        warn!("notice: {message}");
    }
}

fn main() -> Result<()> {
    // Parse log level from environment variable
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config_dir = args
        .config_dir
        .unwrap_or_else(PersistenceManager::default_dir);
    info!(config_dir = %config_dir.display(), "starting");

    let persistence = PersistenceManager::new(&config_dir);
    let mut coordinator = Coordinator::new(create_backend(), persistence, ConsoleSink::default());

    if !args.hidden {
        coordinator.show_overlay();
    }

    // Cooperative single-threaded loop: hotkey commands are drained each
    // cycle, so their latency is bounded by the refresh interval.
    let interval = Duration::from_millis(args.refresh_interval_ms);
    loop {
        coordinator.tick(Instant::now());
        if coordinator.quit_requested() {
            break;
        }
        thread::sleep(interval);
    }

    coordinator.shutdown();
    Ok(())
}

//! Zonetherm: main entry point.
//!
//! Hexagonal architecture with one async task per entity.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  stdin reader ──▶ Plant::deliver ──▶ TopicRouter               │
//! │  Outbox ─▶ ConsoleBoiler      Outbox ─▶ ConsoleEvents          │
//! │  WriteBehindStore ─▶ FileStore      (writer threads)           │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  Zones · Outside · ControlEngine (pure logic)          │    │
//! │  │  thermal model · aggregation · debounce · heartbeat    │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  runtime: edge-executor + async-io-mini timers                 │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context as _, Result, anyhow};
use clap::Parser;
use log::{info, warn};

use zonetherm::adapters::console::{ConsoleBoiler, ConsoleEvents, spawn_stdin_reader};
use zonetherm::adapters::outbox::{spawn_boiler, spawn_events};
use zonetherm::adapters::store::{FileStore, WriteBehindStore};
use zonetherm::app::ports::ConfigError;
use zonetherm::app::service::{ControlEngine, EngineSettings};
use zonetherm::config::{ControllerConfig, load_config};
use zonetherm::context::Context;
use zonetherm::plant::Plant;
use zonetherm::runtime;

#[derive(Parser)]
#[command(name = "zonetherm")]
#[command(about = "Multi-zone weather-compensated boiler controller", long_about = None)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,
    /// Override the configured log level (off, error, warn, info, debug, trace)
    #[arg(short, long)]
    log_level: Option<String>,
    /// Override the configured state directory
    #[arg(short, long)]
    storage: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── 1. Logging ────────────────────────────────────────────
    // stdout carries the outbound topics; logs go to stderr.
    tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::TRACE)
        .with_writer(std::io::stderr)
        .init();

    info!("Zonetherm v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Configuration ──────────────────────────────────────
    let mut config = match load_config(&cli.config) {
        Ok(cfg) => {
            info!("Config loaded from {}", cli.config.display());
            cfg
        }
        Err(ConfigError::NotFound) => {
            warn!("{} not found, using defaults", cli.config.display());
            ControllerConfig::default()
        }
        Err(e) => return Err(anyhow!("{}: {}", cli.config.display(), e)),
    };

    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    let level = config.log_level_filter().map_err(|e| anyhow!("{}", e))?;
    log::set_max_level(level);

    // ── 3. Persistence ────────────────────────────────────────
    let storage_dir = cli.storage.unwrap_or_else(|| PathBuf::from(&config.storage_dir));
    let store = FileStore::open(&storage_dir)
        .map_err(|e| anyhow!("{}", e))
        .with_context(|| format!("opening state directory {}", storage_dir.display()))?;
    let store = WriteBehindStore::spawn(Arc::new(store)).context("spawning store writer")?;
    let ctx = Context::new(Arc::new(store));

    // ── 4. Entities + engine ──────────────────────────────────
    let now = Instant::now();
    let plant = Arc::new(Plant::build(&config, &ctx, now));
    let engine = ControlEngine::new(
        plant.zones().to_vec(),
        EngineSettings::from_config(&config),
        ctx,
        now,
    );

    // ── 5. Adapters ───────────────────────────────────────────
    let boiler = spawn_boiler(ConsoleBoiler::new(&config.boiler, std::io::stdout()))
        .context("spawning boiler writer")?;
    let sink = spawn_events(ConsoleEvents::new(&config, std::io::stdout()))
        .context("spawning event writer")?;
    spawn_stdin_reader(plant.clone()).context("spawning stdin reader")?;

    info!("System ready. Entering event loop.");
    runtime::run(&plant, engine, boiler, sink);
    Ok(())
}

//! MargaNav - Waypoint sequencing daemon
//!
//! ## Sockets
//!
//! - **UDP (state_address, default 5601)**: vehicle state samples in
//! - **TCP (command_address, default 5600)**: waypoint list requests
//! - **TCP (publish_address, default 5602)**: latched target and relative pose out
//!
//! All list edits and arrival checks run on the dispatcher thread; the other
//! threads only move bytes.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;

use marga_nav::config::Config;
use marga_nav::dispatch::{DispatcherThread, create_event_channel};
use marga_nav::error::{Error, Result};
use marga_nav::publish::Topics;
use marga_nav::sequencer::WaypointSequencer;
use marga_nav::signal::{setup_ctrl_c_handler, wait_for_warmup};
use marga_nav::streaming::{CommandServer, TcpPublisher, UdpStateReceiver, create_serializer};

/// Waypoint sequencing daemon
#[derive(Parser, Debug)]
#[command(name = "marga-nav", version, about)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Configuration file (positional form)
    #[arg(conflicts_with = "config")]
    path: Option<String>,
}

const DEFAULT_CONFIG_PATH: &str = "marga-nav.toml";

fn main() -> Result<()> {
    let started = Instant::now();
    let args = Args::parse();

    let config_path = args
        .config
        .or(args.path)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("MargaNav v{} starting...", env!("CARGO_PKG_VERSION"));
    log::info!("Using config: {}", config_path);

    let sequencer_config = config.sequencer_config().inspect_err(|e| {
        log::error!("Invalid waypoint configuration: {}", e);
    })?;

    let running = setup_ctrl_c_handler()?;

    if !wait_for_warmup(started, Duration::from_millis(config.startup.warmup_ms), &running) {
        log::info!("Shutdown requested during warm-up");
        return Ok(());
    }

    let serializer = create_serializer(config.network.wire_format);
    log::info!("Wire format: {:?}", serializer.format());

    // Publisher subscribes before the sequencer publishes its initial target
    let topics = Arc::new(Topics::new());
    let publisher = TcpPublisher::start(
        &config.network.publish_address,
        serializer,
        Arc::clone(&topics),
    )?;

    let sequencer = WaypointSequencer::new(sequencer_config, Arc::clone(&topics))?;

    let (handle, events) = create_event_channel();

    let dispatcher = DispatcherThread::new(sequencer, events, Arc::clone(&running));
    let dispatcher_handle = thread::Builder::new()
        .name("dispatcher".to_string())
        .spawn(move || dispatcher.run())
        .map_err(|e| Error::Other(format!("Failed to spawn dispatcher: {}", e)))?;

    let intake = UdpStateReceiver::bind(
        &config.network.state_address,
        serializer,
        handle.clone(),
        Arc::clone(&running),
    )?;
    let intake_handle = thread::Builder::new()
        .name("udp-intake".to_string())
        .spawn(move || intake.run())
        .map_err(|e| Error::Other(format!("Failed to spawn UDP intake: {}", e)))?;

    let server = CommandServer::bind(
        &config.network.command_address,
        serializer,
        handle,
        Arc::clone(&running),
    )?;

    log::info!("MargaNav running. Press Ctrl-C to stop.");
    server.run();

    // Shutdown
    log::info!("Shutting down...");
    if intake_handle.join().is_err() {
        log::error!("UDP intake thread panicked");
    }
    match dispatcher_handle.join() {
        Ok(sequencer) => log::info!(
            "Final waypoint index {} of {}",
            sequencer.current_index(),
            sequencer.len()
        ),
        Err(_) => log::error!("Dispatcher thread panicked"),
    }
    drop(publisher);

    log::info!("MargaNav stopped");
    Ok(())
}

// Copyright (c) 2026 minewatch contributors
// Licensed under the MIT License. See LICENSE file in the project root.

//! minewatch - mining-site environmental monitoring
//!
//! Headless service: polls the sensor store, predicts landslide risk,
//! triggers evacuations automatically and accepts operator commands on
//! stdin (acknowledge, resolve, status, manual alert, ...).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use minewatch::core::{EventPayload, EventType};
use minewatch::evacuation::EvacuationState;
use minewatch::{Config, Engine, ManualAlerts, OperatorCommand, VERSION};

/// minewatch - mining-site monitoring and automatic evacuation
#[derive(Parser, Debug)]
#[command(name = "minewatch")]
#[command(version = VERSION)]
#[command(about = "Mining-site environmental monitoring with automatic evacuation")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// Demo mode with simulated sensors
    #[arg(long)]
    demo: bool,

    /// Sensor polling interval in seconds
    #[arg(long)]
    poll_interval: Option<u64>,

    /// Never trigger evacuations automatically
    #[arg(long)]
    no_auto_evacuation: bool,

    /// Sensor store base URL
    #[arg(long)]
    sensor_url: Option<String>,

    /// Sensor store API key
    #[arg(long)]
    sensor_key: Option<String>,

    /// Prediction model base URL
    #[arg(long)]
    model_url: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load or create configuration
    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;

    // Initialize logging; the CLI flags win over the configured level
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        config.tracing_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("minewatch v{} - mining-site monitoring", VERSION);

    // Override with command line args
    if args.demo {
        config.demo_mode = true;
    }
    if let Some(secs) = args.poll_interval {
        config.sensors.poll_interval_secs = secs;
    }
    if args.no_auto_evacuation {
        config.evacuation.auto_enabled = false;
    }
    if let Some(url) = args.sensor_url {
        config.sensors.store_url = Some(url);
        config.demo_mode = false;
    }
    if let Some(key) = args.sensor_key {
        config.sensors.api_key = Some(key);
    }
    if let Some(url) = args.model_url {
        config.prediction.model_api_url = Some(url);
    }

    info!("Configuration loaded from {:?}", config_path);
    info!("Site: {} | demo mode: {}", config.site_name, config.demo_mode);

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(run_headless(config));

    // The stdin reader sits on a blocking thread; don't wait for it
    rt.shutdown_timeout(Duration::from_secs(1));
    result
}

/// Run the monitoring loop until Ctrl+C
async fn run_headless(config: Config) -> Result<()> {
    let engine = Arc::new(Engine::from_config(config)?);
    let (shutdown_tx, _) = broadcast::channel::<()>(4);

    let coordinator = Arc::clone(engine.coordinator());
    coordinator.on_evacuation_triggered(|| {
        warn!("EVACUATION IN PROGRESS - all personnel proceed to muster points");
    });

    spawn_alert_logger(&engine, shutdown_tx.subscribe());
    let alerts = Arc::new(ManualAlerts::new(Arc::clone(engine.event_bus())));
    spawn_operator_console(Arc::clone(&coordinator), alerts, shutdown_tx.subscribe());

    let runner = tokio::spawn(Arc::clone(&engine).run(shutdown_tx.clone()));

    info!("minewatch running; type 'help' for operator commands");
    info!("   Press Ctrl+C to shutdown");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, cleaning up...");
    let _ = shutdown_tx.send(());

    runner.await??;

    let stats = coordinator.statistics();
    info!(
        "minewatch shutdown complete ({} evacuations, {} resolved)",
        stats.total, stats.resolved
    );
    Ok(())
}

/// Log alert banners and evacuation transitions from the event bus
fn spawn_alert_logger(engine: &Arc<Engine>, mut shutdown: broadcast::Receiver<()>) {
    let mut events = engine.event_bus().subscribe_events();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Ok(event) => match (event.event_type, event.payload) {
                        (EventType::Alert, EventPayload::Alert { level, message }) => {
                            warn!("[{}] {}", level.to_uppercase(), message);
                        }
                        (EventType::Evacuation, EventPayload::Evacuation(evac)) => match evac.state {
                            EvacuationState::Triggered => error!(
                                "ALERT: evacuation {} triggered ({})",
                                evac.id,
                                evac.source_prediction.contributing_factors.join(", ")
                            ),
                            EvacuationState::Acknowledged => info!("Evacuation {} acknowledged", evac.id),
                            EvacuationState::Resolved => info!("Evacuation {} resolved", evac.id),
                        },
                        _ => {}
                    },
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Alert logger lagged, skipped {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = shutdown.recv() => break,
            }
        }
    });
}

/// Read operator commands from stdin
fn spawn_operator_console(
    coordinator: Arc<minewatch::EvacuationCoordinator>,
    alerts: Arc<ManualAlerts>,
    mut shutdown: broadcast::Receiver<()>,
) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => match line.parse::<OperatorCommand>() {
                        Ok(command) => {
                            for out in command.execute(&coordinator, &alerts).lines() {
                                info!("{}", out);
                            }
                        }
                        Err(e) => warn!("{}", e),
                    },
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Operator console closed: {}", e);
                        break;
                    }
                },
                _ = shutdown.recv() => break,
            }
        }
    });
}

//! One-wire thermometer daemon.
//!
//! Usage:
//!   w1-thermometer            # watch the single attached sensor
//!   w1-thermometer read       # print one reading and exit
//!   w1-thermometer list       # list discovered sensors

use clap::{Parser, Subcommand};
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::signal;
use w1_thermometer::Result;
use w1_thermometer::config::{self, Config};
use w1_thermometer::discovery::{discover_single, discover_with};
use w1_thermometer::error::SensorError;
use w1_thermometer::sensors::{ChangeEvent, Unit, W1Sensor, Watch, Watcher};

#[derive(Parser)]
#[command(name = "w1-thermometer")]
#[command(about = "Watch a one-wire temperature sensor")]
struct Cli {
    /// Directory holding one-wire devices (overrides W1_DEVICES_DIR)
    #[arg(long)]
    devices_dir: Option<PathBuf>,

    /// Poll interval in milliseconds (overrides W1_POLL_INTERVAL_MS)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    interval_ms: Option<u64>,

    /// Output unit: celsius, fahrenheit or kelvin (overrides W1_UNIT)
    #[arg(long)]
    unit: Option<Unit>,

    /// Print readings as JSON lines on stdout
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Poll the sensor and report changes until interrupted
    Watch,
    /// Read the sensor once
    Read,
    /// List discovered sensors
    List,
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() -> ExitCode {
    // Before the runtime exists, since this may set environment variables
    let dotenv = config::load_dotenv();
    init_logger();
    if let Err(e) = dotenv {
        warn!("Ignoring unreadable .env: {}", e);
    }

    let cli = Cli::parse();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(dir) = cli.devices_dir.clone() {
        config.discovery.devices_dir = dir;
    }
    if let Some(ms) = cli.interval_ms {
        config.watch.interval_ms = ms;
    }
    if let Some(unit) = cli.unit {
        config.watch.unit = unit;
    }

    let result = match cli.command.unwrap_or(Commands::Watch) {
        Commands::Watch => watch(config, cli.json),
        Commands::Read => read(&config, cli.json),
        Commands::List => list(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn list(config: &Config) -> Result<()> {
    for handle in discover_with(&config.discovery)? {
        println!("{}", handle.path().display());
    }
    Ok(())
}

fn read(config: &Config, json: bool) -> Result<()> {
    let handle = discover_single(&config.discovery)?;
    let sensor = W1Sensor::with_unit(handle, config.watch.unit);
    let temperature = sensor.read()?;

    if json {
        println!("{}", serde_json::to_string(&temperature)?);
    } else {
        println!("{}", temperature);
    }
    Ok(())
}

#[tokio::main]
async fn watch(config: Config, json: bool) -> Result<()> {
    let handle = discover_single(&config.discovery)?;
    let sensor = W1Sensor::with_unit(handle, config.watch.unit);
    info!("Using sensor {}", sensor.handle().path().display());
    info!("  Interval: {:?}", config.watch.interval());
    info!("  Unit: {}", sensor.unit());

    let Watch {
        mut changes,
        mut errors,
        control,
    } = Watcher::new(sensor, config.watch.interval())
        .with_capacity(config.watch.channel_capacity)
        .spawn();

    info!("Press Ctrl+C to exit");

    let shutdown = signal::ctrl_c();
    tokio::pin!(shutdown);

    let result = loop {
        tokio::select! {
            res = &mut shutdown => {
                match res {
                    Ok(()) => info!("Received shutdown signal"),
                    Err(e) => error!("Failed to listen for shutdown signal: {}", e),
                }
                break Ok(());
            }
            Some(event) = changes.recv() => {
                if let Err(e) = report_change(&event, json) {
                    break Err(e);
                }
            }
            Some(failure) = errors.recv() => report_failure(&failure),
            else => break Ok(()),
        }
    };

    control.shutdown().await;
    result
}

fn report_change(event: &ChangeEvent, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
    } else {
        info!("Sensor reading: {}", event.temperature);
    }
    Ok(())
}

fn report_failure(failure: &SensorError) {
    match failure {
        SensorError::NotReady => debug!("Sensor failure: {}", failure),
        SensorError::Io { .. } => warn!("Sensor failure: {}", failure),
        SensorError::MalformedData(_) => error!("Sensor failure: {}", failure),
    }
}

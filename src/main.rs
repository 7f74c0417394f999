use anyhow::{Context, Result};
use clap::Parser;
use geofence_tracker::{
    storage::STORE_SIZE, utils::init_logging, ConnectivityManager, ConsoleTransport, DeviceConfig,
    FileStorage, PersistentConfigStore, PositionSource, ReplayGpsReceiver, TelemetryLoop,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "geofence-tracker")]
#[command(version, about = "GPS geofence telemetry with a console broker", long_about = None)]
struct Cli {
    /// Device configuration (JSON); defaults apply when omitted
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Recorded receiver states, one JSON object per line
    #[arg(short = 'r', long = "replay", value_name = "FILE")]
    replay: PathBuf,

    /// Non-volatile storage image
    #[arg(short = 's', long = "storage", value_name = "FILE", default_value = "geofence.img")]
    storage: PathBuf,

    /// Stop after this many ticks (default: until the replay ends)
    #[arg(short = 'n', long = "ticks")]
    ticks: Option<u64>,

    /// Override the transmission interval (milliseconds)
    #[arg(long = "interval-ms")]
    interval_ms: Option<u64>,

    /// Deliver a reconfiguration message ("lat,lon,radius") after connecting
    #[arg(long = "set-geofence", value_name = "LAT,LON,RADIUS")]
    set_geofence: Option<String>,

    /// Debug logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let mut config = match &cli.config {
        Some(path) => DeviceConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => DeviceConfig::default(),
    };
    if let Some(interval_ms) = cli.interval_ms {
        config.tx_interval_ms = interval_ms;
    }
    config.validate()?;

    info!(app = %config.app_name, device_id = %config.device_id, broker = %config.broker.url(), "Starting");

    let storage = FileStorage::open(&cli.storage, config.storage_base_offset + STORE_SIZE)
        .with_context(|| format!("opening storage image {}", cli.storage.display()))?;
    let store = PersistentConfigStore::open(storage, config.storage_base_offset)?;

    let receiver = ReplayGpsReceiver::from_file(&cli.replay)?;

    let mut transport = ConsoleTransport::stdout(config.broker.url());
    if let Some(command) = &cli.set_geofence {
        transport.inject(config.geofence_topic()?.as_str(), command.as_bytes());
    }
    let connectivity = ConnectivityManager::new(transport, config.connectivity_config());

    let mut telemetry = TelemetryLoop::new(&config, store, PositionSource::new(receiver), connectivity)?;

    let mut ticks = 0u64;
    loop {
        let started = std::time::Instant::now();
        telemetry.tick();
        ticks += 1;

        let replay_done = telemetry.position().receiver().is_exhausted();
        let limit_reached = cli.ticks.map_or(false, |limit| ticks >= limit);
        if replay_done || limit_reached {
            break;
        }
        telemetry.wait_next_tick(started);
    }

    let stats = serde_json::to_string(&telemetry.stats())?;
    info!(%stats, "Finished");
    Ok(())
}

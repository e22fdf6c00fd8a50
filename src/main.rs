use std::path::PathBuf;

use ads1115_sensor::{
    config::Config,
    externals::{
        discovery::services::{available_buses, scan},
        event_logging::EventLoggingModule,
        hardware::HardwareModule,
        host::task::{task_host_lifecycle, task_report_entity_state},
    },
    internals::registry::DeviceRegistry,
    system::setup_entries,
};
use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Poll ADS1115 converters as voltage sensors.")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Poll every configured sensor until interrupted.
    Run {
        #[arg(long, env = "ADS1115_CONFIG", default_value = "ads1115.toml")]
        config: PathBuf,
    },
    /// Read every configured sensor once and print it as JSON.
    Read {
        #[arg(long, env = "ADS1115_CONFIG", default_value = "ads1115.toml")]
        config: PathBuf,
    },
    /// Look for chips on the available I2C buses.
    Scan {
        #[arg(long, default_value = "/dev")]
        dev_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(false)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match Cli::parse().command {
        Command::Run { config } => run(config).await,
        Command::Read { config } => read(config).await,
        Command::Scan { dev_dir } => discover(dev_dir).await,
    }
}

async fn run(config_path: PathBuf) -> Result<()> {
    let config = Config::load(&config_path)?;
    let timing = config.polling.timing()?;
    let entries = config.entries()?;

    let HardwareModule { bus_port } = HardwareModule::initialize();
    let EventLoggingModule { host_adapter } = EventLoggingModule::initialize();
    let registry = DeviceRegistry::init_global(bus_port, host_adapter.clone(), timing)?;

    let entities = tokio::task::spawn_blocking(move || {
        setup_entries(registry, &entries, host_adapter.as_ref(), host_adapter.as_ref())
    })
    .await?;
    if entities.is_empty() {
        warn!("No sensor could be set up.");
    }

    let tracker = TaskTracker::new();
    let token = CancellationToken::new();

    for entity in entities {
        tracker.spawn(task_report_entity_state(token.clone(), entity));
    }
    tracker.spawn(task_host_lifecycle(token.clone(), registry));

    let token_clone = token.clone();
    tokio::select! {
        _ = token_clone.cancelled() => {}
        res = signal::ctrl_c() => {
            match res {
                Ok(_) => {
                    info!("Shutting down.");
                    token.cancel();
                },
                Err(e) => {
                    tracing::error!("Failed to listen for ctrl_c. Error: {}", e);
                    token.cancel();
                }
            };
        },
    }

    tracker.close();
    tracker.wait().await;

    Ok(())
}

async fn read(config_path: PathBuf) -> Result<()> {
    let config = Config::load(&config_path)?;
    let timing = config.polling.timing()?;
    let entries = config.entries()?;

    let HardwareModule { bus_port } = HardwareModule::initialize();
    let EventLoggingModule { host_adapter } = EventLoggingModule::initialize();
    let registry = DeviceRegistry::init_global(bus_port, host_adapter.clone(), timing)?;

    let entities = tokio::task::spawn_blocking(move || -> Result<_> {
        let entities =
            setup_entries(registry, &entries, host_adapter.as_ref(), host_adapter.as_ref());
        for device in registry.devices() {
            device.poll_once()?;
        }
        Ok(entities)
    })
    .await??;

    for entity in entities {
        println!("{}", serde_json::to_string(&entity.attributes())?);
    }
    Ok(())
}

async fn discover(dev_dir: PathBuf) -> Result<()> {
    let HardwareModule { bus_port } = HardwareModule::initialize();

    let found = tokio::task::spawn_blocking(move || -> Result<_> {
        let buses = available_buses(&dev_dir)?;
        Ok(scan(bus_port.as_ref(), &buses))
    })
    .await??;

    if found.is_empty() {
        println!("No device detected.");
    }
    for key in found {
        println!("{} 0x{:02x}", key.bus.path().display(), key.address);
    }
    Ok(())
}

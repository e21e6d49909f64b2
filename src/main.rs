//! Firewatch sensor hub - main entry point

use clap::{Parser, Subcommand};
use firewatch::classifier::PendingClassifier;
use firewatch::config::HubConfig;
use firewatch::hub::SensorHub;
use firewatch::observability::init_default_logging;
use firewatch::transport::MqttTransport;
use std::path::PathBuf;
use std::process;
use tracing::{error, info};

/// MQTT sensor hub for a fire-monitoring dashboard
#[derive(Parser)]
#[command(name = "firewatch")]
#[command(about = "MQTT sensor hub: live channel state, chart windows, and hazard status")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the hub until the link closes or an interrupt arrives
    Run,
    /// Validate configuration
    Config {
        /// Show the resolved configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_default_logging();

    info!("Starting firewatch v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_configuration(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run => run_hub(config).await,
        Commands::Config { show } => handle_config_command(config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }

    info!("Shutdown complete");
}

fn load_configuration(config_path: &Option<PathBuf>) -> Result<HubConfig, Box<dyn std::error::Error>> {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Ok(HubConfig::load_from_file(path)?)
        }
        None => {
            let default_paths = ["firewatch.toml", "config/firewatch.toml"];

            for path_str in default_paths {
                let path = PathBuf::from(path_str);
                if path.exists() {
                    info!("Loading configuration from: {}", path.display());
                    return Ok(HubConfig::load_from_file(&path)?);
                }
            }

            error!("No configuration file found. Provide one with -c/--config or create firewatch.toml");
            process::exit(1);
        }
    }
}

async fn run_hub(config: HubConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        hub_id = %config.hub.id,
        broker = %config.mqtt.broker_url,
        auto_subscribe = config.mqtt.auto_subscribe,
        "bringing up sensor hub"
    );

    let link = MqttTransport::new(&config.hub.id, config.mqtt.clone())?;
    let mut hub = SensorHub::new(&config, link, Box::new(PendingClassifier));

    hub.run().await?;

    let status = hub.current_status();
    let counters = serde_json::to_string(&firewatch::observability::metrics().snapshot())?;
    info!(status = %status.status, level = status.level, %counters, "hub stopped");
    Ok(())
}

fn handle_config_command(config: HubConfig, show: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("Configuration is valid");

    if show {
        let toml_output = toml::to_string_pretty(&config)?;
        println!("\n{toml_output}");
    }

    Ok(())
}

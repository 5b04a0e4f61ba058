//! hmrpc command line client
//!
//! Detects a Homematic CCU or Homegear gateway and runs single RPC
//! operations against it. Results are printed as JSON on stdout, logs go
//! to stderr.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use directories::ProjectDirs;
use hmrpc::{DeleteFlags, Gateway, GatewayConfig, RxMode};
use hmrpc_types::{Channel, Device, Interface, ParamsetType, Value};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Homematic gateway RPC client
#[derive(Parser)]
#[command(name = "hmrpc")]
#[command(about = "Query and control a Homematic CCU or Homegear gateway")]
#[command(version)]
#[command(after_help = "\
Examples:
  hmrpc --host 192.168.1.10 info           Detect the gateway
  hmrpc devices --metadata                 List devices with datapoints
  hmrpc values LEQ0123456 1                Read MASTER and VALUES of a channel
  hmrpc set LEQ0123456 1 STATE true        Switch an actor on
  hmrpc set -i HMIP 0001D3C99C6AB3 3 LEVEL 0.5
  hmrpc install-mode --enable --seconds 60 Start pairing
")]
struct Cli {
    /// Configuration file (default: <config dir>/hmrpc/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Gateway host, overrides the configuration file
    #[arg(long, global = true)]
    host: Option<String>,

    /// Identifier of this client towards the gateway
    #[arg(long, global = true, default_value = "hmrpc")]
    id: String,

    /// Log RPC traffic at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show gateway type, firmware and interfaces
    Info,

    /// List devices
    Devices {
        /// Only this interface
        #[arg(short, long)]
        interface: Option<Interface>,

        /// Also load datapoint descriptions
        #[arg(long)]
        metadata: bool,
    },

    /// Read all values of a channel
    Values {
        address: String,
        channel: i32,
        #[arg(short, long, default_value = "RF")]
        interface: Interface,
    },

    /// Read one VALUES datapoint
    Get {
        address: String,
        channel: i32,
        datapoint: String,
        #[arg(short, long, default_value = "RF")]
        interface: Interface,
    },

    /// Write one datapoint
    Set {
        address: String,
        channel: i32,
        datapoint: String,
        /// JSON value; anything that is not valid JSON is sent as a string
        value: String,
        #[arg(short, long, default_value = "RF")]
        interface: Interface,
        #[arg(short, long, default_value = "VALUES")]
        paramset: ParamsetType,
        /// Receive mode for battery devices (burst, wakeup)
        #[arg(long)]
        rx: Option<RxMode>,
    },

    /// Show or change the pairing mode
    #[command(name = "install-mode")]
    InstallMode {
        #[arg(long, conflicts_with = "disable")]
        enable: bool,
        #[arg(long)]
        disable: bool,
        #[arg(long, default_value_t = 60)]
        seconds: u32,
    },

    /// Show RSSI values of RF and CUxD devices
    Rssi,

    /// Delete a device from the gateway
    Delete {
        address: String,
        #[arg(short, long, default_value = "RF")]
        interface: Interface,
        /// Reset the device to factory defaults
        #[arg(long)]
        reset: bool,
        /// Delete even if the device is unreachable
        #[arg(long)]
        force: bool,
        /// Delete once the device is reachable again
        #[arg(long)]
        defer: bool,
    },

    /// List system variables
    Sysvars,

    /// Set a system variable
    #[command(name = "set-sysvar")]
    SetSysvar { name: String, value: String },

    /// List scripts
    Scripts,

    /// Run a script
    #[command(name = "run-script")]
    RunScript { name: String },

    /// Ask the gateway for a PONG event
    Ping,
}

fn setup_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("hmrpc={default_level}")));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(filter)
        .init();
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "hmrpc").map(|dirs| dirs.config_dir().join("config.json"))
}

fn load_config(cli: &Cli) -> Result<GatewayConfig> {
    let path = cli.config.clone().or_else(default_config_path);
    let mut config = match (&path, &cli.host) {
        (Some(path), _) if path.exists() => GatewayConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        (_, Some(host)) => GatewayConfig::new(host.clone()),
        _ => bail!("No gateway configured. Pass --host or create a config file"),
    };
    if let Some(host) = &cli.host {
        config.gateway_address.clone_from(host);
    }
    debug!(?path, host = %config.gateway_address, "Loaded configuration");
    Ok(config)
}

/// Parses a command line value as JSON, falling back to a plain string.
fn parse_value(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::from(text))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = load_config(&cli)?;
    let gateway = Gateway::connect(cli.id.clone(), config)
        .await
        .context("Failed to reach gateway")?;

    run(&gateway, cli.command).await
}

async fn run(gateway: &Gateway, command: Commands) -> Result<()> {
    match command {
        Commands::Info => print_json(gateway.info()),
        Commands::Devices {
            interface,
            metadata,
        } => {
            let devices = match (interface, metadata) {
                (Some(interface), false) => gateway.list_devices(interface).await?,
                (Some(interface), true) => {
                    let mut devices = gateway.list_devices(interface).await?;
                    for device in &mut devices {
                        gateway.load_device_metadata(device).await?;
                    }
                    devices
                }
                (None, false) => gateway.list_all_devices().await?,
                (None, true) => gateway.load_all_device_metadata().await?,
            };
            print_json(&devices)
        }
        Commands::Values {
            address,
            channel,
            interface,
        } => {
            let mut channel = Channel::new(address, interface, channel, "");
            gateway.add_channel_datapoints(&mut channel, ParamsetType::Master).await?;
            gateway.add_channel_datapoints(&mut channel, ParamsetType::Values).await?;
            gateway.load_channel_values(&mut channel).await?;
            print_json(&channel.datapoints)
        }
        Commands::Get {
            address,
            channel,
            datapoint,
            interface,
        } => {
            let mut channel = Channel::new(address, interface, channel, "");
            gateway.add_channel_datapoints(&mut channel, ParamsetType::Values).await?;
            print_json(&gateway.get_datapoint_value(&mut channel, &datapoint).await?)
        }
        Commands::Set {
            address,
            channel,
            datapoint,
            value,
            interface,
            paramset,
            rx,
        } => {
            let mut channel = Channel::new(address, interface, channel, "");
            gateway.add_channel_datapoints(&mut channel, paramset).await?;
            gateway
                .send_datapoint(&mut channel, paramset, &datapoint, parse_value(&value), rx)
                .await?;
            print_json(&channel.datapoint(paramset, &datapoint))
        }
        Commands::InstallMode {
            enable,
            disable,
            seconds,
        } => {
            if enable || disable {
                gateway.set_install_mode(enable, seconds).await?;
            }
            print_json(&gateway.get_install_mode().await?)
        }
        Commands::Rssi => print_json(&gateway.load_rssi_values().await?),
        Commands::Delete {
            address,
            interface,
            reset,
            force,
            defer,
        } => {
            let device = Device::new(address, interface, "");
            let flags = DeleteFlags {
                reset,
                force,
                defer,
            };
            gateway.delete_device(&device, flags).await?;
            Ok(())
        }
        Commands::Sysvars => print_json(&gateway.get_all_system_variables().await?),
        Commands::SetSysvar { name, value } => {
            gateway.set_system_variable(&name, parse_value(&value)).await?;
            Ok(())
        }
        Commands::Scripts => print_json(&gateway.get_all_scripts().await?),
        Commands::RunScript { name } => print_json(&gateway.run_script(&name).await?),
        Commands::Ping => {
            gateway.ping().await?;
            Ok(())
        }
    }
}

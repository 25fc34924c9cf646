//! hw-bridge link
//!
//! Connects to the local hardware-bridge daemon, holds the requested port
//! outputs and logs watched inputs until interrupted.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hb_core::config::{self, HbConfig};
use hb_core::DeviceRegistry;
use hb_link::{Hardware, TracingCollaborator};
use hb_protocol::PortId;

#[derive(Parser)]
#[command(name = "hb-link")]
#[command(author, version, about = "Session manager for the local hardware bridge")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Run in foreground with verbose output
    #[arg(short, long, global = true)]
    foreground: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the daemon and drive the attached device
    Run {
        /// Hold an output value, e.g. `13=1` or `leftWheel=30`
        #[arg(long = "set", value_name = "PORT=VALUE", value_parser = parse_assignment)]
        set: Vec<(PortId, Value)>,

        /// Log this digital port's reading once per second
        #[arg(long = "watch", value_name = "PORT")]
        watch: Vec<String>,

        /// Only open the WebSocket transport
        #[arg(long, conflicts_with = "fallback_only")]
        primary_only: bool,

        /// Only open the Socket.IO transport
        #[arg(long)]
        fallback_only: bool,
    },

    /// List the devices the session can identify
    Devices,

    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.foreground {
        "debug"
    } else {
        &cli.log_level
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Run {
            set,
            watch,
            primary_only,
            fallback_only,
        } => {
            let mut config = config;
            if primary_only {
                config.fallback.enabled = false;
            }
            if fallback_only {
                config.primary.enabled = false;
            }
            run(config, set, watch).await
        }
        Commands::Devices => {
            print_devices();
            Ok(())
        }
        Commands::Config => {
            let toml = toml::to_string_pretty(&config).context("Failed to serialize config")?;
            print!("{}", toml);
            Ok(())
        }
    }
}

/// Load the config file, falling back to defaults when it is absent
fn load_config(path: Option<&PathBuf>) -> Result<HbConfig> {
    let config_path = path.cloned().unwrap_or_else(config::default_config_path);

    if config_path.exists() {
        config::load_config(&config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))
    } else {
        if path.is_some() {
            tracing::warn!("Config file {:?} not found, using defaults", config_path);
        }
        Ok(HbConfig::default())
    }
}

async fn run(config: HbConfig, set: Vec<(PortId, Value)>, watch: Vec<String>) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    tracing::info!("hw-bridge link starting...");
    if config.primary.enabled {
        tracing::info!("Primary transport: {}", config.primary.url);
    }
    if config.fallback.enabled {
        tracing::info!("Fallback transport: {}", config.fallback.url);
    }

    let hardware = Hardware::spawn(&config, Arc::new(TracingCollaborator))
        .context("Failed to start hardware session")?;

    for (port, value) in set {
        hardware.set_digital_port_value(port, value).await;
    }
    hardware.connect().await;

    let mut report = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                tracing::info!("Interrupted, stopping device");
                break;
            }
            _ = report.tick() => {
                if !hardware.is_connected().await {
                    tracing::debug!("Waiting for hardware bridge ({})", hardware.status().await);
                    continue;
                }
                for port in &watch {
                    let value = hardware.get_digital_port_value(port.as_str()).await;
                    tracing::info!("{} = {}", port, value);
                }
            }
        }
    }

    hardware.stop().await;
    hardware.close().await;
    hardware.shutdown().await;

    tracing::info!("hw-bridge link stopped");
    Ok(())
}

fn print_devices() {
    println!("{:<6} {:<14} {:<14} {:?}", "KEY", "NAME", "DISPLAY", "MONITOR");
    for profile in DeviceRegistry::global().profiles() {
        println!(
            "{:<6} {:<14} {:<14} {:?}",
            profile.key, profile.name, profile.display_name, profile.monitor_layout
        );
    }
}

/// Parse `PORT=VALUE`; numbers and booleans keep their JSON type
fn parse_assignment(s: &str) -> Result<(PortId, Value), String> {
    let (port, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected PORT=VALUE, got '{}'", s))?;
    if port.is_empty() {
        return Err(format!("missing port in '{}'", s));
    }

    let value = serde_json::from_str::<Value>(value)
        .ok()
        .filter(|v| v.is_number() || v.is_boolean())
        .unwrap_or_else(|| Value::String(value.to_string()));

    Ok((PortId::from(port), value))
}

//! MidiCtrl - standalone runner
//!
//! Opens the configured MIDI controllers and drives the dispatcher from a
//! fixed tick, executing mapped actions against the console host.

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use midictrl::config::AppConfig;
use midictrl::device::{open_all, Device};
use midictrl::paths::{ensure_dir, AppPaths};
use midictrl::{midi, ConsoleHost, Dispatcher};

/// MidiCtrl - map MIDI controller input to simulator commands
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "MIDICTRL_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Directory for the rolling log file
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Log to stderr only
    #[arg(long)]
    no_log_file: bool,

    /// List available MIDI ports
    #[arg(long)]
    list_ports: bool,

    /// Load the configuration, report accepted and rejected mappings, and exit
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let paths = AppPaths::detect();

    let log_dir = select_log_dir(&args, &paths);
    if let Some(dir) = &log_dir {
        ensure_dir(dir)?;
    }
    let _log_guard = init_logging(&args.log_level, log_dir.as_deref())?;

    info!("Starting MidiCtrl v{}...", env!("CARGO_PKG_VERSION"));

    if args.list_ports {
        let listing = midi::list_ports()?;
        midi::print_ports(&listing);
        return Ok(());
    }

    let config_path = args.config.clone().unwrap_or_else(|| paths.config.clone());
    info!("Configuration file: {}", config_path.display());
    let config = AppConfig::load(&config_path).await?;

    if args.check_config {
        print_config_report(&config);
        return Ok(());
    }

    run_app(config, shutdown_signal()).await?;

    info!("MidiCtrl shutdown complete");
    Ok(())
}

async fn run_app(config: AppConfig, shutdown: impl std::future::Future<Output = ()>) -> Result<()> {
    let host = Arc::new(ConsoleHost::new());
    let dispatcher = Dispatcher::new(host.clone());

    let mut devices: Vec<Device> = config
        .devices
        .iter()
        .map(|device_config| {
            let (table, rejected) = device_config.build_table();
            if !rejected.is_empty() {
                warn!(
                    "Device '{}': {} mapping(s) rejected",
                    device_config.name,
                    rejected.len()
                );
            }
            Device::new(
                device_config.name.clone(),
                device_config.port_in,
                device_config.port_out,
                table,
                dispatcher.sender(),
            )
        })
        .collect();

    let open = open_all(&mut devices);
    if open == 0 {
        warn!("No device could be opened, waiting for shutdown");
    } else {
        info!("{} of {} device(s) ready", open, devices.len());
    }

    let mut ticker = tokio::time::interval(Duration::from_millis(config.general.tick_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                dispatcher.drain();
            }

            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping tick loop");
                break;
            }
        }
    }

    // Cleanup: stop callbacks first, then dispatch what they already queued
    info!("Shutting down...");
    for device in devices.iter_mut() {
        device.close();
    }
    let stats = dispatcher.drain();
    info!(
        "Final drain: {} dispatched, {} skipped ({} host calls total)",
        stats.dispatched,
        stats.skipped,
        host.execution_count()
    );

    Ok(())
}

/// Directory for the rolling log file, if this invocation writes one
///
/// `--list-ports` and `--check-config` log to stderr only.
fn select_log_dir(args: &Args, paths: &AppPaths) -> Option<PathBuf> {
    if args.no_log_file || args.list_ports || args.check_config {
        None
    } else {
        Some(args.log_dir.clone().unwrap_or_else(|| paths.logs_dir.clone()))
    }
}

fn init_logging(level: &str, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "midictrl.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_thread_ids(true)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
    info!("Shutdown signal received");
}

fn print_config_report(config: &AppConfig) {
    use colored::*;

    println!("\n{}", "=== Configuration Check ===".bold().cyan());
    println!("  Tick: {} ms", config.general.tick_ms.to_string().green());

    for device in &config.devices {
        let (table, rejected) = device.build_table();

        println!(
            "\n  {} (in {}, out {})",
            device.name.bright_white().bold(),
            device.port_in.to_string().yellow(),
            device.port_out.to_string().yellow()
        );
        println!(
            "    Accepted: {}  Rejected: {}",
            table.len().to_string().green(),
            if rejected.is_empty() {
                "0".green()
            } else {
                rejected.len().to_string().red()
            }
        );

        for control_id in table.control_ids() {
            for mapping in table.lookup(control_id) {
                println!("    {} {}", "✓".green(), mapping);
            }
        }
        for error in &rejected {
            println!("    {} {}", "✗".red(), error);
        }
    }

    println!("\n{}", "✅ Configuration check complete!".green().bold());
}

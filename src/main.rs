//! Synth Host - control panel for software MIDI synthesizers
//!
//! Sends notes, presets and controller changes to a synth and mirrors a
//! hardware controller's state into the panel.

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use synth_host::cli::{self, Flow};
use synth_host::config::AppConfig;
use synth_host::device::{discovery, InputSelection, OutputDevice};
use synth_host::host::Host;
use synth_host::paths;
use synth_host::synth::{self, Sink};

/// Synth Host - drive a software MIDI synthesizer from the terminal
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// List available MIDI ports
    #[arg(long)]
    list_ports: bool,

    /// Log messages to the console instead of opening the synth's port
    #[arg(long)]
    dry_run: bool,

    /// Input device pattern (overrides midi.input_port)
    #[arg(short, long)]
    input: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level)?;

    if args.list_ports {
        discovery::print_ports();
        return Ok(());
    }

    info!("Starting Synth Host v{}...", env!("CARGO_PKG_VERSION"));

    let config_path = paths::resolve_config(&args.config);
    info!("Configuration file: {}", config_path.display());
    let config = AppConfig::load(&config_path).await?;

    run_app(config, args).await?;

    info!("Synth Host shutdown complete");
    Ok(())
}

async fn run_app(config: AppConfig, args: Args) -> Result<()> {
    let catalog = config.catalog()?;
    let synth = synth::from_config(&config.synth, catalog, args.dry_run);

    let passthrough: Option<Box<dyn Sink>> = match (&config.midi.passthrough_port, args.dry_run) {
        (Some(pattern), false) => match OutputDevice::open(pattern) {
            Ok(device) => Some(Box::new(device)),
            Err(e) => {
                warn!("⚠️ Passthrough disabled: {}", e);
                None
            }
        },
        _ => None,
    };

    let mut host = Host::new(synth, passthrough).context("Failed to start the synth host")?;

    // Device bytes arrive on the midir callback thread; one queue keeps them in order
    let (midi_tx, mut midi_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let mut inputs = InputSelection::new(midi_tx);

    if let Some(pattern) = args.input.as_deref().or(config.midi.input_port.as_deref()) {
        if let Err(e) = inputs.select(Some(pattern)) {
            println!("{} {}", "error:".red().bold(), e);
        }
    }

    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    cli::spawn_repl(line_tx)?;

    cli::print_view(&host.view()?);
    println!("{}", "Type 'help' for commands.".dimmed());

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(line) = line_rx.recv() => {
                if cli::handle_line(&mut host, &mut inputs, &line) == Flow::Quit {
                    break;
                }
            }

            Some(raw) = midi_rx.recv() => {
                if host.handle_incoming(&raw).is_some() {
                    cli::print_view(&host.view()?);
                }
            }

            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping event loop");
                break;
            }

            else => break,
        }
    }

    info!("Shutting down...");
    if let Err(e) = inputs.select(None) {
        warn!("Input device not closed cleanly: {}", e);
    }
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Invalid log level")?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install CTRL+C handler: {}", e);
        std::future::pending::<()>().await;
    }
}

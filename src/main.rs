//! Locsync - Translation Catalog Synchronization
//!
//! This is the main entry point for the Locsync application, which keeps
//! per-language translation catalogs synchronized by detecting changed keys
//! from content fingerprints and translating them through ollama.

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::{non_blocking, rolling};

use locsync::cli::{Args, Commands};
use locsync::config::{Config, GatewayMode};
use locsync::error::LocsyncError;
use locsync::sync::{FileStatus, Synchronizer};
use locsync::translate::check_ollama_availability;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    info!("Starting Locsync - Translation Catalog Synchronization");

    // Load configuration
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            // Try to load locsync.toml from current directory first
            if std::path::Path::new("locsync.toml").exists() {
                info!("Found locsync.toml in current directory, loading...");
                Config::from_file("locsync.toml")?
            } else {
                Config::default()
            }
        }
    };

    // Execute command
    match args.command {
        Commands::Sync { dir, source, targets, gateway } => {
            // Apply command line overrides
            if let Some(dir) = dir {
                config.catalog.dir = dir;
            }
            if let Some(source) = source {
                config.catalog.source_language = source;
            }
            if let Some(targets) = targets {
                config.catalog.target_languages = targets
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect();
            }
            config.translate.mode = parse_gateway_mode(&gateway)?;

            info!("Synchronizing catalogs in {}", config.catalog.dir.display());

            // Make sure the gateway is usable before touching any file
            if matches!(config.translate.mode, GatewayMode::Ollama) {
                check_ollama_availability(&config.translate.endpoint, &config.translate.model)
                    .await?;
            }

            let mut synchronizer = Synchronizer::new(config).await?;
            let report = synchronizer.sweep().await?;

            println!(
                "Synced {} catalog(s), recorded {} direct edit(s), {} unchanged, {} failed",
                report.synced, report.recorded, report.unchanged, report.failed
            );
        }
        Commands::Status { dir } => {
            if let Some(dir) = dir {
                config.catalog.dir = dir;
            }

            let synchronizer = Synchronizer::new(config).await?;
            let rows = synchronizer.status().await?;

            if rows.is_empty() {
                println!("No catalog files found.");
            } else {
                println!("\nCatalog Status:");
                println!("{:<24} {:<12}", "File", "Status");
                println!("{}", "-".repeat(36));

                for (filename, status) in rows {
                    let label = match status {
                        FileStatus::Unchanged => "unchanged",
                        FileStatus::Changed => "changed",
                        FileStatus::Untracked => "untracked",
                    };
                    println!("{:<24} {:<12}", filename, label);
                }
            }
        }
        Commands::Check => {
            info!("Checking translation gateway availability...");
            check_ollama_availability(&config.translate.endpoint, &config.translate.model).await?;
            println!(
                "Ollama model '{}' is available at {}",
                config.translate.model, config.translate.endpoint
            );
        }
    }

    info!("Locsync completed successfully");
    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let locsync_dir = std::env::current_dir()?.join(".locsync");
    let log_dir = locsync_dir.join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "locsync.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    // Determine log level
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Create console layer
    let console_layer = fmt::layer()
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    // Create file layer
    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    // Setup layered subscriber
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer);

    // Initialize the subscriber
    subscriber.try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Parse gateway mode from string
fn parse_gateway_mode(mode: &str) -> Result<GatewayMode> {
    match mode.to_lowercase().as_str() {
        "ollama" => Ok(GatewayMode::Ollama),
        "passthrough" => Ok(GatewayMode::Passthrough),
        _ => Err(LocsyncError::Config(format!(
            "Invalid gateway mode '{}'. Valid modes: ollama, passthrough",
            mode
        )).into()),
    }
}

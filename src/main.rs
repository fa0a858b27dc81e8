//! Media Transfer Tool - CLI Entry Point
//!
//! Copies photos and videos out of a media library folder into a destination
//! folder, optionally deleting the originals once everything is copied.
//!
//! This binary is a thin wrapper around the library, handling argument parsing,
//! logging setup, and command dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Builder;
use log::{info, LevelFilter};
use media_transfer_tool::cli::{self, Args, DualWriter};
use media_transfer_tool::core::config::Config;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(ref config_path) = args.config {
        match Config::load(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("Warning: Failed to load config file: {}", e);
                Config::default()
            }
        }
    } else {
        Config::load_default().unwrap_or_default()
    };

    if let Some(ref level) = args.log_level {
        config.logging.level = level.clone();
    }

    // Ctrl+C stops the transfer before the next item
    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let shutdown_flag_clone = shutdown_flag.clone();

    ctrlc::set_handler(move || {
        if shutdown_flag_clone.load(Ordering::SeqCst) {
            eprintln!("\nForce shutdown requested. Exiting immediately...");
            std::process::exit(1);
        } else {
            shutdown_flag_clone.store(true, Ordering::SeqCst);
            eprintln!("\nCancelling after the current file... (Press Ctrl+C again to force quit)");
        }
    })
    .context("Failed to set Ctrl+C handler")?;

    // Initialize logger
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };

    if config.logging.log_to_file {
        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.logging.log_file)
            .with_context(|| {
                format!(
                    "Failed to open log file '{}'",
                    config.logging.log_file.display()
                )
            })?;

        Builder::new()
            .filter_level(log_level)
            .format(|buf, record| {
                writeln!(
                    buf,
                    "[{} {} {}] {}",
                    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                    record.level(),
                    record.target(),
                    record.args()
                )
            })
            .target(env_logger::Target::Pipe(Box::new(DualWriter {
                console: std::io::stderr(),
                file: log_file,
            })))
            .init();

        info!("Logging to file: {}", config.logging.log_file.display());
    } else {
        Builder::new().filter_level(log_level).parse_default_env().init();
    }

    info!(
        "{} v{}",
        media_transfer_tool::NAME,
        media_transfer_tool::VERSION
    );

    cli::run_command(&args, &config, shutdown_flag)?;

    Ok(())
}

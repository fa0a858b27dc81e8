//! Command handler implementations
//!
//! This module contains the implementation of all CLI commands.

use crate::cli::progress::{
    format_bytes, print_error, print_header, print_info, print_success, print_warning,
    TransferProgress,
};
use crate::cli::{Args, Commands};
use crate::core::access::DestinationAccess;
use crate::core::config::{get_config_path, init_config, Config};
use crate::core::engine::{
    TransferCallbacks, TransferEngine, TransferOutcome, TransferRequest, CANCELLED_DETAIL,
};
use crate::dispatch::ChannelDispatcher;
use crate::library::{FolderLibrary, MediaKind, StdFileSystem};
use anyhow::{anyhow, bail, Context, Result};
use dialoguer::Confirm;
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Options for the `transfer` command after merging CLI flags and config
#[derive(Debug, Clone)]
pub struct TransferOptions {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub create_destination: bool,
    pub delete: bool,
    pub skip_confirmation: bool,
    pub json: bool,
}

/// Run the appropriate command based on CLI arguments
pub fn run_command(args: &Args, config: &Config, shutdown_flag: Arc<AtomicBool>) -> Result<()> {
    match &args.command {
        Commands::Transfer {
            source,
            dest,
            create_dest,
            delete,
            yes,
            photos_only,
            videos_only,
            timeout,
            json,
        } => {
            let mut config = config.clone();
            if *photos_only {
                config.library.include_videos = false;
            }
            if *videos_only {
                config.library.include_photos = false;
            }
            if let Some(secs) = timeout {
                config.transfer.resolve_timeout_secs = *secs;
            }

            let options = TransferOptions {
                source: pick_path(source, &config.library.directory, "--source")?,
                destination: pick_path(dest, &config.output.directory, "--dest")?,
                create_destination: *create_dest || config.output.create_if_missing,
                delete: *delete || config.transfer.delete_after_transfer,
                skip_confirmation: *yes || !config.transfer.confirm_delete,
                json: *json,
            };
            transfer(&config, options, shutdown_flag)?;
        }
        Commands::List { source, json } => {
            let source = pick_path(source, &config.library.directory, "--source")?;
            list_items(config, source, *json)?;
        }
        Commands::Config { path, reset } => {
            handle_config_command(*path, *reset)?;
        }
        Commands::GenerateConfig { output } => {
            generate_config_file(output.clone())?;
        }
        Commands::ShowConfig => {
            show_config(config);
        }
    }

    Ok(())
}

/// Prefer the command-line path, then the configured one
fn pick_path(cli: &Option<PathBuf>, configured: &Path, flag: &str) -> Result<PathBuf> {
    match cli {
        Some(path) => Ok(path.clone()),
        None if !configured.as_os_str().is_empty() => Ok(configured.to_path_buf()),
        None => bail!("No folder given: pass {} or set it in the config file", flag),
    }
}

/// Copy every media item in the library folder into the destination
pub fn transfer(
    config: &Config,
    options: TransferOptions,
    shutdown_flag: Arc<AtomicBool>,
) -> Result<()> {
    let library = Arc::new(FolderLibrary::new(&options.source));
    let items = library
        .scan(&config.library.scan_filter())
        .with_context(|| format!("Failed to read library '{}'", options.source.display()))?;

    // Destination access is checked up front and reported on its own
    let access = if options.create_destination {
        DestinationAccess::acquire_or_create(&options.destination)
    } else {
        DestinationAccess::acquire(&options.destination)
    };
    let access = match access {
        Ok(access) => access,
        Err(e) => {
            print_error(&e.to_string());
            return Err(e.into());
        }
    };

    if items.is_empty() {
        warn!("No media found in {}", options.source.display());
        if !options.json {
            print_warning("Nothing to transfer");
        }
        return Ok(());
    }

    let mut delete = options.delete;
    if delete && !options.skip_confirmation {
        delete = Confirm::new()
            .with_prompt(format!(
                "Delete {} original(s) from '{}' after they are copied?",
                items.len(),
                options.source.display()
            ))
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
        if !delete {
            info!("Originals will be kept");
        }
    }

    if !options.json {
        print_header("MEDIA TRANSFER");
        print_info(&format!("Source:      {}", options.source.display()));
        print_info(&format!("Destination: {}", access.path().display()));
        print_info(&format!(
            "Items:       {} ({} photo(s), {} video(s))",
            items.len(),
            items.iter().filter(|i| i.kind() == MediaKind::Photo).count(),
            items.iter().filter(|i| i.kind() == MediaKind::Video).count()
        ));
        if delete {
            print_warning("Originals will be deleted after a successful transfer");
        }
        println!();
    }

    // Ctrl+C during the scan or the prompt must still stop the transfer
    if shutdown_flag.load(Ordering::SeqCst) {
        warn!("Cancellation requested before the transfer started");
        bail!(CANCELLED_DETAIL);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start transfer runtime")?;

    let engine = Arc::new(
        TransferEngine::with_config(
            library.clone(),
            library,
            Arc::new(StdFileSystem),
            config.transfer.engine_config(),
        )
        .with_cancel_flag(shutdown_flag),
    );

    let progress = Arc::new(if options.json {
        TransferProgress::hidden(items.len())
    } else {
        TransferProgress::new(items.len())
    });
    let completion: Arc<Mutex<Option<(bool, Option<String>)>>> = Arc::new(Mutex::new(None));

    let callbacks = {
        let progress = Arc::clone(&progress);
        let finished = Arc::clone(&progress);
        let completion = Arc::clone(&completion);
        TransferCallbacks::new(
            move |fraction| progress.set_fraction(fraction),
            move |success, detail| {
                if success {
                    finished.finish("Transfer complete!");
                } else {
                    finished.abandon("Transfer stopped");
                }
                if let Ok(mut slot) = completion.lock() {
                    *slot = Some((success, detail));
                }
            },
        )
    };

    let request = TransferRequest::new(items, access).delete_source_after_transfer(delete);
    let (dispatcher, queue) = ChannelDispatcher::new();
    let handle = engine.execute(runtime.handle(), request, Arc::new(dispatcher), callbacks)?;

    // Callbacks run here, on the main thread, until the engine lets go
    let delivered = queue.run_until_closed();
    debug!("Delivered {} callback(s)", delivered);

    let outcome = runtime
        .block_on(handle)
        .map_err(|e| anyhow!("Transfer task failed: {}", e))?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }

    let reported = completion.lock().ok().and_then(|mut slot| slot.take());
    match reported {
        Some((true, _)) => Ok(()),
        Some((false, detail)) => Err(anyhow!(
            detail.unwrap_or_else(|| "Transfer failed".to_string())
        )),
        None => Err(anyhow!("Transfer ended without reporting completion")),
    }
}

/// Print a human-readable summary of a finished transfer
fn print_outcome(outcome: &TransferOutcome) {
    println!();
    match outcome {
        TransferOutcome::Completed {
            stats,
            skipped,
            deleted,
            deletion_error,
            ..
        } => {
            print_success(&format!(
                "Copied {} file(s), {}",
                stats.files_copied,
                format_bytes(stats.total_bytes)
            ));
            if !skipped.is_empty() {
                print_warning(&format!(
                    "{} item(s) could not be read and were skipped:",
                    skipped.len()
                ));
                for item in skipped {
                    print_info(item.id());
                }
            }
            match deletion_error {
                Some(e) => print_warning(&format!("Originals were not all deleted: {}", e)),
                None if !deleted.is_empty() => {
                    print_success(&format!("Deleted {} original(s)", deleted.len()))
                }
                None => {}
            }
        }
        TransferOutcome::Failed {
            item_id,
            detail,
            stats,
            ..
        } => {
            print_error(&format!("Failed on '{}': {}", item_id, detail));
            print_info(&format!(
                "{} file(s) copied before the failure were kept",
                stats.files_copied
            ));
        }
        TransferOutcome::Cancelled { completed, .. } => {
            print_warning(&format!("Cancelled after {} file(s)", completed));
        }
    }
}

/// List media items in a library folder
pub fn list_items(config: &Config, source: PathBuf, json: bool) -> Result<()> {
    let library = FolderLibrary::new(&source);
    let items = library
        .scan(&config.library.scan_filter())
        .with_context(|| format!("Failed to read library '{}'", source.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    print_header(&format!("MEDIA IN {}", source.display()));
    for item in &items {
        let size = fs::metadata(library.path_for(item))
            .map(|m| format_bytes(m.len()))
            .unwrap_or_else(|_| "?".to_string());
        println!("  {:<6} {:>12}  {}", item.kind(), size, item.id());
    }
    println!();
    print_info(&format!("{} item(s)", items.len()));

    Ok(())
}

/// Create or reset the config file, or print its path
pub fn handle_config_command(show_path: bool, reset: bool) -> Result<()> {
    if show_path {
        let path = Config::get_active_config_path();
        println!("{}", path.display());
        if path.exists() {
            info!("Config file exists at: {}", path.display());
        } else {
            info!("Config file would be created at: {}", path.display());
        }
        return Ok(());
    }

    let path = init_config(reset)?;
    if reset {
        info!("Reset config file to defaults: {}", path.display());
    } else {
        info!("Config file: {}", path.display());
    }
    println!("{}", path.display());

    Ok(())
}

/// Generate a configuration file at the specified or default location
pub fn generate_config_file(output: Option<PathBuf>) -> Result<()> {
    let output_path = match output {
        Some(path) => {
            fs::write(&path, Config::generate_default_config())
                .with_context(|| format!("Failed to write '{}'", path.display()))?;
            path
        }
        None => init_config(false)?,
    };

    info!("Configuration file: {}", output_path.display());
    info!("Edit this file to customize the transfer settings.");

    Ok(())
}

/// Show the current configuration settings
pub fn show_config(config: &Config) {
    let config_path = Config::get_active_config_path();
    println!("Configuration file: {}", config_path.display());
    if !config_path.exists() {
        println!("(Using default settings - no config file found)");
        if let Some(standard) = get_config_path() {
            println!("Run 'media-transfer config' to create {}", standard.display());
        }
    }
    println!();
    println!("{}", config);
}

//! Command-line argument definitions
//!
//! This module defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Copy photos and videos out of a media library into a folder
#[derive(Parser, Debug)]
#[command(name = "media-transfer")]
#[command(author = "Vihaan Reddy M")]
#[command(version)]
#[command(about = "Copy photos and videos into a folder, optionally deleting the originals", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level: error, warn, info, debug, trace (overrides config)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Copy every media item in the library folder to the destination
    Transfer {
        /// Library folder to copy from (overrides config)
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Destination folder (overrides config)
        #[arg(short, long)]
        dest: Option<PathBuf>,

        /// Create the destination folder if it does not exist
        #[arg(long)]
        create_dest: bool,

        /// Delete originals after every file has been copied
        #[arg(long)]
        delete: bool,

        /// Do not ask for confirmation before deleting originals
        #[arg(short, long)]
        yes: bool,

        /// Only transfer photos
        #[arg(long, conflicts_with = "videos_only")]
        photos_only: bool,

        /// Only transfer videos
        #[arg(long)]
        videos_only: bool,

        /// Seconds to wait for each item to resolve (overrides config)
        #[arg(short, long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Print the outcome as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// List media items in the library folder
    List {
        /// Library folder (overrides config)
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create the configuration file in the standard location
    ///
    /// The config file is stored in the platform configuration directory
    /// under `media_transfer_tool/config.toml`.
    Config {
        /// Show the config file path without creating it
        #[arg(long)]
        path: bool,

        /// Reset config to defaults (overwrites the existing file)
        #[arg(long)]
        reset: bool,
    },

    /// Generate a configuration file at a specific location
    GenerateConfig {
        /// Output path for the config file (defaults to standard location)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show current configuration
    ShowConfig,
}

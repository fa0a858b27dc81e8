//! Configuration module for the media transfer tool
//!
//! Supports loading configuration from a TOML file.
//! Configuration is stored in the platform configuration directory:
//! - Windows: %APPDATA%\media_transfer_tool\config.toml
//! - macOS: ~/Library/Application Support/media_transfer_tool/config.toml
//! - Linux: ~/.config/media_transfer_tool/config.toml

use crate::core::engine::{EngineConfig, DEFAULT_RESOLVE_TIMEOUT};
use crate::library::folder::ScanFilter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Application name used for config directory
const APP_NAME: &str = "media_transfer_tool";

/// Default config file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Config files checked in the working directory before the standard location
const LOCAL_CONFIG_FILES: &[&str] = &["./config.toml", "./media_transfer.toml"];

/// Get the standard configuration directory for the application.
pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME))
}

/// Get the standard configuration file path.
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Initialize the configuration file if it doesn't exist.
///
/// With `reset`, an existing file is replaced by the default template.
/// Returns the path to the config file.
pub fn init_config(reset: bool) -> Result<PathBuf, ConfigError> {
    let config_dir = get_config_dir().ok_or(ConfigError::ConfigDirNotFound)?;
    fs::create_dir_all(&config_dir)
        .map_err(|e| ConfigError::WriteError(config_dir.clone(), e.to_string()))?;

    let config_path = config_dir.join(CONFIG_FILE_NAME);
    if reset || !config_path.exists() {
        fs::write(&config_path, Config::generate_default_config())
            .map_err(|e| ConfigError::WriteError(config_path.clone(), e.to_string()))?;
    }

    Ok(config_path)
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Destination settings
    pub output: OutputConfig,

    /// Source library settings
    pub library: LibraryConfig,

    /// Transfer settings
    pub transfer: TransferConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Destination folder configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Folder media is copied into (empty = must be given on the command line)
    pub directory: PathBuf,

    /// Create the destination folder if it does not exist
    pub create_if_missing: bool,
}

/// Source library configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Library folder (empty = must be given on the command line)
    pub directory: PathBuf,

    /// Include photos
    pub include_photos: bool,

    /// Include videos
    pub include_videos: bool,

    /// Scan subfolders
    pub recursive: bool,
}

/// Transfer behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Seconds to wait for each item to resolve before skipping it
    pub resolve_timeout_secs: u64,

    /// Delete originals from the library after a successful transfer
    pub delete_after_transfer: bool,

    /// Ask before deleting originals
    pub confirm_delete: bool,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Also write log lines to `log_file`
    pub log_to_file: bool,

    /// Log file path
    pub log_file: PathBuf,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::new(),
            include_photos: true,
            include_videos: true,
            recursive: true,
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            resolve_timeout_secs: DEFAULT_RESOLVE_TIMEOUT.as_secs(),
            delete_after_transfer: false,
            confirm_delete: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_to_file: false,
            log_file: PathBuf::from("./media_transfer.log"),
        }
    }
}

impl LibraryConfig {
    /// Scan filter matching these settings
    pub fn scan_filter(&self) -> ScanFilter {
        ScanFilter {
            include_photos: self.include_photos,
            include_videos: self.include_videos,
            recursive: self.recursive,
        }
    }
}

impl TransferConfig {
    /// Engine settings matching these settings. A zero timeout falls back
    /// to the default.
    pub fn engine_config(&self) -> EngineConfig {
        let resolve_timeout = if self.resolve_timeout_secs == 0 {
            DEFAULT_RESOLVE_TIMEOUT
        } else {
            Duration::from_secs(self.resolve_timeout_secs)
        };
        EngineConfig { resolve_timeout }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e.to_string()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))
    }

    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./config.toml
    /// 2. ./media_transfer.toml
    /// 3. The standard config location
    ///
    /// If no config file is found, returns default configuration.
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::find_config_file() {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Path of the config file in use, or the standard location if none exists
    pub fn get_active_config_path() -> PathBuf {
        Self::find_config_file()
            .or_else(get_config_path)
            .unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG_FILES[0]))
    }

    fn find_config_file() -> Option<PathBuf> {
        LOCAL_CONFIG_FILES
            .iter()
            .map(PathBuf::from)
            .chain(get_config_path())
            .find(|p| p.exists())
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(path.as_ref(), content)
            .map_err(|e| ConfigError::WriteError(path.as_ref().to_path_buf(), e.to_string()))
    }

    /// Default config file with comments
    pub fn generate_default_config() -> String {
        include_str!("../../config.example.toml").to_string()
    }
}

impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn or_unset(path: &Path) -> String {
            if path.as_os_str().is_empty() {
                "(not set)".to_string()
            } else {
                path.display().to_string()
            }
        }

        writeln!(f, "[output]")?;
        writeln!(f, "  directory          = {}", or_unset(&self.output.directory))?;
        writeln!(f, "  create_if_missing  = {}", self.output.create_if_missing)?;
        writeln!(f, "[library]")?;
        writeln!(f, "  directory          = {}", or_unset(&self.library.directory))?;
        writeln!(f, "  include_photos     = {}", self.library.include_photos)?;
        writeln!(f, "  include_videos     = {}", self.library.include_videos)?;
        writeln!(f, "  recursive          = {}", self.library.recursive)?;
        writeln!(f, "[transfer]")?;
        writeln!(f, "  resolve_timeout    = {}s", self.transfer.resolve_timeout_secs)?;
        writeln!(f, "  delete_after       = {}", self.transfer.delete_after_transfer)?;
        writeln!(f, "  confirm_delete     = {}", self.transfer.confirm_delete)?;
        writeln!(f, "[logging]")?;
        writeln!(f, "  level              = {}", self.logging.level)?;
        writeln!(f, "  log_to_file        = {}", self.logging.log_to_file)?;
        write!(f, "  log_file           = {}", self.logging.log_file.display())
    }
}

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to read config file '{}': {1}", .0.display())]
    ReadError(PathBuf, String),

    #[error("Failed to parse config file '{}': {1}", .0.display())]
    ParseError(PathBuf, String),

    #[error("Failed to serialize configuration: {0}")]
    SerializeError(String),

    #[error("Failed to write config file '{}': {1}", .0.display())]
    WriteError(PathBuf, String),

    #[error("Could not determine configuration directory")]
    ConfigDirNotFound,
}

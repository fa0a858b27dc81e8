//! CLI module for the media transfer tool
//!
//! This module contains all command-line interface related code including
//! argument parsing, command definitions, and command handlers.
//!
//! # Submodules
//!
//! - `args` - Command-line argument definitions using clap
//! - `commands` - Command handler implementations
//! - `progress` - Progress bars and CLI output utilities

pub mod args;
pub mod commands;
pub mod progress;

// Re-export commonly used types for convenience
pub use args::{Args, Commands};
pub use commands::run_command;
pub use progress::DualWriter;

//! Core functionality module
//!
//! This module contains the core business logic for the media transfer tool,
//! including configuration management, error handling, destination access and
//! the transfer engine itself.
//!
//! # Submodules
//!
//! - `access` - Destination access tokens
//! - `config` - Configuration loading, saving, and management
//! - `engine` - The batch transfer engine
//! - `error` - Error types and result aliases
//! - `naming` - Collision-free destination names

pub mod access;
pub mod config;
pub mod engine;
pub mod error;
pub mod naming;

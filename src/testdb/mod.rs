//! Test Database Module
//!
//! Scriptable stand-ins for the capabilities the transfer engine consumes,
//! so every failure path can be exercised without a real media library.
//!
//! - [`MockMediaLibrary`] - items that resolve, never resolve, resolve late,
//!   or resolve to a file that has vanished; records deletion batches and can
//!   be told to fail them
//! - [`FaultyFileSystem`] - fails copies of chosen files with a given error

pub mod mock_library;

pub use mock_library::{FaultyFileSystem, MockMediaLibrary, MockResolution};

//! Media Transfer Tool Library
//!
//! Copies photos and videos out of a media library into a destination
//! folder, one item at a time, and optionally deletes the originals once the
//! whole batch has been copied.
//!
//! # Architecture
//!
//! - [`core`] - Transfer engine, unique naming, destination access,
//!   configuration, and error types
//! - [`library`] - Media library traits and the folder-backed library
//! - [`dispatch`] - Delivery of progress and completion callbacks
//! - [`cli`] - Command-line interface (only used by the binary)
//! - [`testdb`] - Scriptable mock library for testing without real media
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use media_transfer_tool::core::access::DestinationAccess;
//! use media_transfer_tool::core::engine::{TransferCallbacks, TransferEngine, TransferRequest};
//! use media_transfer_tool::dispatch::InlineDispatcher;
//! use media_transfer_tool::library::{FolderLibrary, ScanFilter, StdFileSystem};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let library = Arc::new(FolderLibrary::new("/media/library"));
//!     let items = library.scan(&ScanFilter::default())?;
//!     let destination = DestinationAccess::acquire("/backup/photos")?;
//!
//!     let engine = TransferEngine::new(library.clone(), library, Arc::new(StdFileSystem));
//!     let request = TransferRequest::new(items, destination).delete_source_after_transfer(true);
//!     let callbacks = TransferCallbacks::new(
//!         |fraction| println!("{:.0}%", fraction * 100.0),
//!         |success, detail| println!("done: {} {:?}", success, detail),
//!     );
//!
//!     let outcome = engine
//!         .run(request, Arc::new(InlineDispatcher), callbacks)
//!         .await?;
//!     println!("{}", outcome.stats());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod core;
pub mod dispatch;
pub mod library;
pub mod testdb;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

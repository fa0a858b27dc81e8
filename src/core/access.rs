//! Destination access tokens
//!
//! A [`DestinationAccess`] is proof that the destination folder existed and
//! accepted a write when the token was acquired. Requests carry the token
//! instead of a bare path, so the access check always happens before the
//! engine starts and its failure is reported separately from transfer
//! failures.

use crate::core::error::{Result, TransferError};
use log::debug;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Prefix of the short-lived file used to probe write access
const PROBE_FILE_PREFIX: &str = ".media_transfer_access_probe";

/// Probe names tried before giving up on leftover files
const PROBE_ATTEMPTS: u32 = 16;

/// Verified write access to a destination folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationAccess {
    path: PathBuf,
}

impl DestinationAccess {
    /// Check that `path` is an existing, writable directory.
    pub fn acquire<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let metadata = fs::metadata(path).map_err(|e| TransferError::DestinationAccess {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if !metadata.is_dir() {
            return Err(TransferError::DestinationAccess {
                path: path.to_path_buf(),
                reason: "not a directory".to_string(),
            });
        }

        let probe = create_probe(path).map_err(|e| TransferError::DestinationAccess {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let _ = fs::remove_file(&probe);

        debug!("Write access confirmed for {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Create the directory if needed, then acquire access to it.
    pub fn acquire_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        fs::create_dir_all(path).map_err(|e| TransferError::DestinationAccess {
            path: path.to_path_buf(),
            reason: format!("failed to create directory: {}", e),
        })?;
        Self::acquire(path)
    }

    /// The destination folder
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Create a fresh probe file in `dir`, skipping names already taken
fn create_probe(dir: &Path) -> io::Result<PathBuf> {
    let pid = std::process::id();
    let mut last_err = None;

    for attempt in 0..PROBE_ATTEMPTS {
        let probe = dir.join(format!("{}-{}-{}", PROBE_FILE_PREFIX, pid, attempt));
        match OpenOptions::new().write(true).create_new(true).open(&probe) {
            Ok(_) => return Ok(probe),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => last_err = Some(e),
            Err(e) => return Err(e),
        }
    }

    Err(last_err
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::AlreadyExists, "no free probe name")))
}

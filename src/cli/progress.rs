//! Progress bar utilities for CLI output
//!
//! The engine reports fractions; [`TransferProgress`] maps them onto an
//! indicatif bar counted in items.

use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::time::Duration;

// ============================================================================
// Styles
// ============================================================================

/// Get the progress bar style for transfers
fn progress_bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/dim}] {pos}/{len} ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━━╾─")
}

// ============================================================================
// Console output helpers
// ============================================================================

/// Print a header section with a box
pub fn print_header(title: &str) {
    let width = 68;
    let title_padded = format!("{:^width$}", title, width = width - 2);
    println!();
    println!("╔{}╗", "═".repeat(width - 2));
    println!("║{}║", title_padded);
    println!("╚{}╝", "═".repeat(width - 2));
    println!();
}

/// Print a success message with checkmark
pub fn print_success(msg: &str) {
    println!("  ✓ {}", msg);
}

/// Print an info message with bullet
pub fn print_info(msg: &str) {
    println!("  • {}", msg);
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("  ⚠ {}", msg);
}

/// Print an error message
pub fn print_error(msg: &str) {
    println!("  ✗ {}", msg);
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

// ============================================================================
// Transfer progress
// ============================================================================

/// Item-count progress bar driven by completion fractions
pub struct TransferProgress {
    bar: ProgressBar,
    total: u64,
}

impl TransferProgress {
    /// Create a bar for `total` items
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(progress_bar_style());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_message("Transferring...");
        Self {
            bar,
            total: total as u64,
        }
    }

    /// A bar that draws nothing (for `--json` output)
    pub fn hidden(total: usize) -> Self {
        Self {
            bar: ProgressBar::hidden(),
            total: total as u64,
        }
    }

    /// Apply a `completed / total` fraction from the engine
    pub fn set_fraction(&self, fraction: f64) {
        self.bar.set_position(items_for_fraction(fraction, self.total));
    }

    pub fn finish(&self, msg: &str) {
        self.bar.finish_with_message(msg.to_string());
    }

    pub fn abandon(&self, msg: &str) {
        self.bar.abandon_with_message(msg.to_string());
    }
}

/// Convert a fraction back to a whole item count
fn items_for_fraction(fraction: f64, total: u64) -> u64 {
    let clamped = fraction.clamp(0.0, 1.0);
    ((clamped * total as f64).round() as u64).min(total)
}

// ============================================================================
// Log writer
// ============================================================================

/// Writer that sends log output to both stderr and a file
pub struct DualWriter {
    pub console: std::io::Stderr,
    pub file: std::fs::File,
}

impl Write for DualWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let _ = self.console.write(buf);
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let _ = self.console.flush();
        self.file.flush()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 bytes");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
        assert_eq!(format_bytes(1073741824), "1.00 GB");
    }

    #[test]
    fn test_items_for_fraction() {
        assert_eq!(items_for_fraction(0.0, 3), 0);
        assert_eq!(items_for_fraction(1.0 / 3.0, 3), 1);
        assert_eq!(items_for_fraction(2.0 / 3.0, 3), 2);
        assert_eq!(items_for_fraction(1.0, 3), 3);
        assert_eq!(items_for_fraction(1.5, 3), 3);
        assert_eq!(items_for_fraction(0.5, 0), 0);
    }

    #[test]
    fn test_hidden_progress_accepts_updates() {
        let progress = TransferProgress::hidden(4);
        progress.set_fraction(0.25);
        progress.set_fraction(1.0);
        progress.finish("done");
    }
}

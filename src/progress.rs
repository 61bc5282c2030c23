//! Progress reporting for the indexer
//!
//! Spinner for the running batch plus the header and per-batch summary
//! printed by the binary.

use crate::pipeline::{BatchReport, IndexProgress};
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Spinner showing the status of the running batch
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        let spinner = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        bar.set_style(spinner);
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update the progress display
    pub fn update(&self, progress: &IndexProgress) {
        let msg = format!(
            "Indexed: {} | Failed: {} | Read: {} | Rate: {:.1}/s | Queue: {}",
            format_number(progress.processed),
            format_number(progress.failed),
            format_size(progress.staged_bytes, BINARY),
            progress.images_per_second(),
            progress.queue_depth,
        );

        self.bar.set_message(msg);
    }

    /// Finish and clear the progress display
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| {
            chunk
                .iter()
                .rev()
                .map(|&b| b as char)
                .collect::<String>()
        })
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a summary of one batch
pub fn print_summary(collection: &str, report: &BatchReport, artifact: &Path) {
    let duration_secs = report.duration.as_secs_f64();
    let rate = if duration_secs > 0.0 {
        report.processed as f64 / duration_secs
    } else {
        0.0
    };

    println!();
    println!(
        "{} {}",
        style("Batch Complete:").green().bold(),
        style(collection).cyan()
    );
    println!("{}", style("─".repeat(50)).dim());
    println!(
        "  {} {}",
        style("Indexed:").bold(),
        format_number(report.processed)
    );
    println!(
        "  {} {}",
        style("Read:").bold(),
        format_size(report.staged_bytes, BINARY)
    );
    if report.deleted > 0 {
        println!(
            "  {} {}",
            style("Replaced:").bold(),
            format_number(report.deleted as u64)
        );
    }
    println!(
        "  {} {:.1}s ({:.1} images/sec)",
        style("Duration:").bold(),
        duration_secs,
        rate
    );
    if report.dropped() > 0 {
        println!(
            "  {} {}",
            style("Dropped:").yellow().bold(),
            format_number(report.dropped())
        );
    }
    println!(
        "  {} {} ({})",
        style("Artifact:").bold(),
        artifact.display(),
        format_size(report.bytes_written, BINARY)
    );
    println!();
}

/// Print a header at the start of the run
pub fn print_header(root: &Path, batches: usize, workers: usize, features: &[&str]) {
    println!();
    println!(
        "{} {}",
        style("solr-image-indexer").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Dataset:").bold(), root.display());
    println!("  {} {}", style("Batches:").bold(), batches);
    println!("  {} {}", style("Workers:").bold(), workers);
    println!("  {} {}", style("Features:").bold(), features.join(", "));
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_number(1234567890), "1,234,567,890");
    }
}

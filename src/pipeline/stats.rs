//! Pipeline counters
//!
//! Relaxed atomics read by the monitor and the final report. Nothing in the
//! pipeline makes a control decision from these values.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters shared by the producer, consumers, and monitor
#[derive(Debug, Default)]
pub struct PipelineStats {
    /// Images read and queued
    pub staged: AtomicU64,

    /// Bytes read and queued
    pub staged_bytes: AtomicU64,

    /// Images that could not be read
    pub read_failures: AtomicU64,

    /// Images whose document reached the sink
    pub processed: AtomicU64,

    /// Images dropped during decode, extraction, or write
    pub failed: AtomicU64,
}

impl PipelineStats {
    pub(crate) fn record_staged(&self, bytes: usize) {
        self.staged.fetch_add(1, Ordering::Relaxed);
        self.staged_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_read_failure(&self) {
        self.read_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Point-in-time view for display
    pub fn snapshot(&self, queue_depth: usize, elapsed: Duration) -> IndexProgress {
        IndexProgress {
            staged: self.staged.load(Ordering::Relaxed),
            staged_bytes: self.staged_bytes.load(Ordering::Relaxed),
            processed: self.processed(),
            failed: self.failed() + self.read_failures.load(Ordering::Relaxed),
            queue_depth,
            elapsed,
        }
    }
}

/// Progress information for display
#[derive(Debug, Clone, Default)]
pub struct IndexProgress {
    /// Images queued so far
    pub staged: u64,

    /// Bytes queued so far
    pub staged_bytes: u64,

    /// Images indexed
    pub processed: u64,

    /// Images dropped (read or processing failures)
    pub failed: u64,

    /// Items currently in the queue
    pub queue_depth: usize,

    /// Time since the batch started
    pub elapsed: Duration,
}

impl IndexProgress {
    /// Indexed images per second
    pub fn images_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.processed as f64 / secs
        } else {
            0.0
        }
    }

    /// Wall time per indexed image, `None` before the first one
    pub fn average_latency(&self) -> Option<Duration> {
        if self.processed == 0 {
            None
        } else {
            Some(Duration::from_secs_f64(
                self.elapsed.as_secs_f64() / self.processed as f64,
            ))
        }
    }
}

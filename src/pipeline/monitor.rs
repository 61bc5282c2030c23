//! Monitor thread: periodic throughput logging
//!
//! Waits one interval, then logs processed count, elapsed time, average
//! latency and queue depth once per interval until the producer's
//! completion signal fires. It only reads counters.

use crate::error::WorkerError;
use crate::pipeline::queue::WorkQueueSender;
use crate::pipeline::stats::PipelineStats;
use crate::progress::ProgressReporter;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::info;

/// The monitor thread
pub struct Monitor {
    handle: Option<JoinHandle<u32>>,
}

impl Monitor {
    /// Spawn the monitor
    ///
    /// `queue` is only used to read the queue depth. `done` disconnects
    /// when the producer has queued its last sentinel.
    pub fn spawn(
        interval: Duration,
        stats: Arc<PipelineStats>,
        queue: WorkQueueSender,
        done: Receiver<()>,
        progress: Option<Arc<ProgressReporter>>,
    ) -> Result<Self, WorkerError> {
        let handle = thread::Builder::new()
            .name("monitor".into())
            .spawn(move || monitor_loop(interval, &stats, &queue, &done, progress.as_deref()))
            .map_err(|e| WorkerError::SpawnFailed {
                name: "monitor".into(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            handle: Some(handle),
        })
    }

    /// Wait for the monitor to stop; returns the number of reports it logged
    pub fn join(mut self) -> Result<u32, WorkerError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| WorkerError::Panicked {
                name: "monitor".into(),
            }),
            None => Ok(0),
        }
    }
}

fn monitor_loop(
    interval: Duration,
    stats: &PipelineStats,
    queue: &WorkQueueSender,
    done: &Receiver<()>,
    progress: Option<&ProgressReporter>,
) -> u32 {
    let start = Instant::now();
    let mut reports = 0;

    while let Err(RecvTimeoutError::Timeout) = done.recv_timeout(interval) {
        let snapshot = stats.snapshot(queue.len(), start.elapsed());
        let latency_ms = snapshot
            .average_latency()
            .map(|d| d.as_millis().to_string())
            .unwrap_or_else(|| "n/a".to_string());

        info!(
            processed = snapshot.processed,
            elapsed_secs = snapshot.elapsed.as_secs(),
            avg_ms = %latency_ms,
            queue = snapshot.queue_depth,
            "Indexing progress"
        );
        if let Some(progress) = progress {
            progress.update(&snapshot);
        }
        reports += 1;
    }

    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::queue::WorkQueue;

    #[test]
    fn test_monitor_stops_on_done_signal() {
        let queue = WorkQueue::new(4);
        let stats = Arc::new(PipelineStats::default());
        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(1);

        let monitor = Monitor::spawn(
            Duration::from_millis(20),
            Arc::clone(&stats),
            queue.sender(),
            done_rx,
            None,
        )
        .unwrap();

        thread::sleep(Duration::from_millis(110));
        drop(done_tx);

        let reports = monitor.join().unwrap();
        assert!(reports >= 2, "expected periodic reports, got {}", reports);
        assert_eq!(stats.processed(), 0);
    }

    #[test]
    fn test_no_report_when_done_before_first_interval() {
        let queue = WorkQueue::new(4);
        let stats = Arc::new(PipelineStats::default());
        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(1);
        drop(done_tx);

        let monitor =
            Monitor::spawn(Duration::from_secs(60), stats, queue.sender(), done_rx, None).unwrap();
        assert_eq!(monitor.join().unwrap(), 0);
    }
}

//! Indexing coordinator - runs one batch through the pipeline
//!
//! The coordinator is responsible for:
//! - Opening the batch (delete section, add section) before any thread starts
//! - Spawning the producer, the consumer pool, and the monitor
//! - Joining consumers, then the producer, then the monitor
//! - Closing the batch once no consumer can write anymore

use crate::error::{IndexerError, Result, WorkerError};
use crate::features::FeatureRegistry;
use crate::hashing::HashEncoders;
use crate::imaging::NormalizeOptions;
use crate::output::batch::{ADD_CLOSE, FILE_BUFFER_SIZE};
use crate::output::BatchWriter;
use crate::pipeline::monitor::Monitor;
use crate::pipeline::producer::Producer;
use crate::pipeline::queue::{WorkQueue, DEFAULT_QUEUE_CAPACITY};
use crate::pipeline::stats::PipelineStats;
use crate::pipeline::worker::{Consumer, ConsumerContext};
use crate::progress::ProgressReporter;
use crate::source::ImageSource;
use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default number of consumer threads
pub const DEFAULT_WORKERS: usize = 8;

/// Default monitor reporting interval
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(10);

/// Pipeline settings for one batch
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of consumer threads
    pub workers: usize,

    /// Work queue capacity
    pub queue_capacity: usize,

    /// Image normalization
    pub normalize: NormalizeOptions,

    /// Monitor reporting interval
    pub monitor_interval: Duration,

    /// Show a spinner while the batch runs
    pub show_progress: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            normalize: NormalizeOptions::default(),
            monitor_interval: DEFAULT_MONITOR_INTERVAL,
            show_progress: false,
        }
    }
}

/// Result of a completed batch
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// When the batch started
    pub started_at: DateTime<Utc>,

    /// Wall time from open to close
    pub duration: Duration,

    /// Images read and queued
    pub staged: u64,

    /// Bytes read and queued
    pub staged_bytes: u64,

    /// Images that could not be read
    pub read_failures: u64,

    /// Documents written
    pub processed: u64,

    /// Images dropped during processing
    pub failed: u64,

    /// Ids in the delete section
    pub deleted: usize,

    /// Artifact size in bytes
    pub bytes_written: u64,
}

impl BatchReport {
    /// Images that did not make it into the artifact
    pub fn dropped(&self) -> u64 {
        self.read_failures + self.failed
    }
}

/// Runs batches through the producer / consumer / monitor pipeline
pub struct IndexingPipeline {
    config: PipelineConfig,
    context: Arc<ConsumerContext>,
}

impl IndexingPipeline {
    /// Create a pipeline; registry and encoders are shared by every batch
    pub fn new(config: PipelineConfig, registry: FeatureRegistry, encoders: HashEncoders) -> Self {
        let context = Arc::new(ConsumerContext {
            registry,
            encoders,
            normalize: config.normalize,
        });
        Self { config, context }
    }

    /// Get the configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one batch into a new artifact file
    pub fn run_to_file(&self, source: Box<dyn ImageSource>, path: &Path) -> Result<BatchReport> {
        let file = File::create(path)?;
        let sink = BufWriter::with_capacity(FILE_BUFFER_SIZE, file);
        let (report, _sink) = self.run(source, sink)?;
        Ok(report)
    }

    /// Run one batch into `sink` and hand the sink back
    pub fn run<W: Write + Send + 'static>(
        &self,
        source: Box<dyn ImageSource>,
        sink: W,
    ) -> Result<(BatchReport, W)> {
        let start = Instant::now();
        let started_at = Utc::now();
        let workers = self.config.workers.max(1);

        let delete_ids = source.previous_ids();
        let writer = Arc::new(BatchWriter::begin(sink, &delete_ids)?);
        debug!(deleted = delete_ids.len(), "Batch opened");

        info!(
            workers,
            queue = self.config.queue_capacity,
            started = %started_at.to_rfc3339(),
            "Starting batch"
        );

        let queue = WorkQueue::new(self.config.queue_capacity);
        let stats = Arc::new(PipelineStats::default());
        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(0);

        let progress = self
            .config
            .show_progress
            .then(|| Arc::new(ProgressReporter::new()));

        let producer = Producer::spawn(
            source.into_images(),
            queue.sender(),
            workers,
            Arc::clone(&stats),
            done_tx,
        )?;

        let mut consumers = Vec::with_capacity(workers);
        for id in 0..workers {
            match Consumer::spawn(
                id,
                Arc::clone(&self.context),
                queue.receiver(),
                Arc::clone(&writer),
                Arc::clone(&stats),
            ) {
                Ok(consumer) => consumers.push(consumer),
                Err(e) => {
                    abandon_batch(queue, consumers, producer);
                    return Err(e.into());
                }
            }
        }
        info!(count = consumers.len(), "Consumers spawned");

        let monitor = match Monitor::spawn(
            self.config.monitor_interval,
            Arc::clone(&stats),
            queue.sender(),
            done_rx,
            progress.clone(),
        ) {
            Ok(monitor) => monitor,
            Err(e) => {
                abandon_batch(queue, consumers, producer);
                return Err(e.into());
            }
        };

        // only the threads hold queue ends from here on
        drop(queue);

        join_consumers(consumers);
        if let Err(e) = producer.join() {
            warn!(error = %e, "Producer failed to join cleanly");
        }
        if let Err(e) = monitor.join() {
            warn!(error = %e, "Monitor failed to join cleanly");
        }
        if let Some(progress) = progress {
            progress.finish();
        }

        let writer = Arc::try_unwrap(writer)
            .map_err(|_| IndexerError::Worker(WorkerError::SinkStillShared))?;
        let documents = writer.documents();
        let bytes_written_before_close = writer.bytes_written();
        let sink = writer.finish()?;

        let report = BatchReport {
            started_at,
            duration: start.elapsed(),
            staged: stats.staged.load(Ordering::Relaxed),
            staged_bytes: stats.staged_bytes.load(Ordering::Relaxed),
            read_failures: stats.read_failures.load(Ordering::Relaxed),
            processed: stats.processed(),
            failed: stats.failed(),
            deleted: delete_ids.len(),
            bytes_written: bytes_written_before_close + ADD_CLOSE.len() as u64,
        };

        info!(
            processed = report.processed,
            failed = report.failed,
            read_failures = report.read_failures,
            documents,
            duration_secs = report.duration.as_secs(),
            "Batch completed"
        );

        Ok((report, sink))
    }
}

/// Wind down the threads started so far after a spawn failure
///
/// The queue goes first: a producer blocked on a queue nobody drains would
/// never return. Consumers then see a disconnected queue and exit.
fn abandon_batch(queue: WorkQueue, consumers: Vec<Consumer>, producer: Producer) {
    drop(queue);
    join_consumers(consumers);
    if let Err(e) = producer.join() {
        warn!(error = %e, "Producer failed to join cleanly");
    }
}

fn join_consumers(consumers: Vec<Consumer>) {
    for consumer in consumers {
        let id = consumer.id();
        if let Err(e) = consumer.join() {
            warn!(worker = id, error = %e, "Consumer failed to join cleanly");
        }
    }
}

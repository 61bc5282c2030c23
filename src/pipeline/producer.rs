//! Producer thread: stages raw image bytes into the work queue
//!
//! The producer is the only I/O-bound role. It pulls images from the source
//! one at a time (the source reads each file fully), puts them into the
//! bounded queue, and blocks whenever the queue is full. Read failures are
//! logged and skipped. Once the source is exhausted it puts one sentinel
//! per consumer and then drops the completion sender, which is the signal
//! the monitor waits for.

use crate::error::WorkerError;
use crate::pipeline::queue::{StagedImage, WorkItem, WorkQueueSender};
use crate::pipeline::stats::PipelineStats;
use crate::source::SourceIter;
use crossbeam_channel::Sender;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// The producer thread
pub struct Producer {
    handle: Option<JoinHandle<()>>,
}

impl Producer {
    /// Spawn the producer
    ///
    /// `done` is never sent on; it is dropped once every sentinel is queued.
    pub fn spawn(
        images: SourceIter,
        queue_tx: WorkQueueSender,
        consumers: usize,
        stats: Arc<PipelineStats>,
        done: Sender<()>,
    ) -> Result<Self, WorkerError> {
        let handle = thread::Builder::new()
            .name("producer".into())
            .spawn(move || {
                produce(images, &queue_tx, consumers, &stats);
                drop(done);
            })
            .map_err(|e| WorkerError::SpawnFailed {
                name: "producer".into(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            handle: Some(handle),
        })
    }

    /// Wait for the producer to finish
    pub fn join(mut self) -> Result<(), WorkerError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| WorkerError::Panicked {
                name: "producer".into(),
            }),
            None => Ok(()),
        }
    }
}

/// Stage every image, then put the sentinels
pub fn produce(
    images: SourceIter,
    queue_tx: &WorkQueueSender,
    consumers: usize,
    stats: &PipelineStats,
) {
    for image in images {
        let bytes = match image.bytes {
            Ok(bytes) => bytes,
            Err(e) => {
                stats.record_read_failure();
                warn!(id = %image.id, error = %e, "Could not read image");
                continue;
            }
        };

        let size = bytes.len();
        let item = WorkItem::Image(StagedImage {
            id: image.id,
            title: image.title,
            fields: image.fields,
            bytes,
        });

        if queue_tx.put(item).is_err() {
            error!("Work queue closed before all images were staged");
            return;
        }
        stats.record_staged(size);
    }

    debug!(consumers, "Source exhausted, sending sentinels");
    if queue_tx.put_sentinels(consumers).is_err() {
        error!("Work queue closed before all sentinels were sent");
        return;
    }

    info!(
        staged = stats.staged.load(Ordering::Relaxed),
        "Producer finished"
    );
}

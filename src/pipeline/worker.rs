//! Consumer threads: decode, normalize, extract, serialize, append
//!
//! Each consumer:
//! - Owns private instances of every configured feature extractor
//! - Takes items from the work queue until it takes a sentinel
//! - Builds one document per image and appends it to the batch whole
//! - Isolates failures (including panics) to the item that caused them

use crate::error::{ItemOutcome, ProcessError, WorkerError};
use crate::features::{FeatureDescriptor, FeatureExtractor, FeatureRegistry};
use crate::hashing::HashEncoders;
use crate::imaging::{self, NormalizeOptions};
use crate::output::{BatchWriter, DocumentFragment};
use crate::pipeline::queue::{StagedImage, WorkItem, WorkQueueReceiver};
use crate::pipeline::stats::PipelineStats;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, trace, warn};

/// Read-only state shared by every consumer of a run
#[derive(Debug)]
pub struct ConsumerContext {
    /// Features to extract, in output order
    pub registry: FeatureRegistry,

    /// Enabled hash encoders
    pub encoders: HashEncoders,

    /// Normalization settings
    pub normalize: NormalizeOptions,
}

/// Per-consumer extractor set
pub type Extractors = Vec<(FeatureDescriptor, Box<dyn FeatureExtractor>)>;

/// A consumer thread
pub struct Consumer {
    /// Consumer ID
    id: usize,

    /// Thread handle, yields the number of documents written
    handle: Option<JoinHandle<u64>>,
}

impl Consumer {
    /// Spawn a new consumer thread
    pub fn spawn<W: Write + Send + 'static>(
        id: usize,
        context: Arc<ConsumerContext>,
        queue_rx: WorkQueueReceiver,
        writer: Arc<BatchWriter<W>>,
        stats: Arc<PipelineStats>,
    ) -> Result<Self, WorkerError> {
        let name = format!("consumer-{}", id);
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || consumer_loop(id, &context, &queue_rx, &writer, &stats))
            .map_err(|e| WorkerError::SpawnFailed {
                name,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
        })
    }

    /// Get consumer ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Wait for the consumer to finish; returns the documents it wrote
    pub fn join(mut self) -> Result<u64, WorkerError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| WorkerError::Panicked {
                name: format!("consumer-{}", self.id),
            }),
            None => Ok(0),
        }
    }
}

/// Main consumer loop
fn consumer_loop<W: Write + Send>(
    id: usize,
    context: &ConsumerContext,
    queue_rx: &WorkQueueReceiver,
    writer: &BatchWriter<W>,
    stats: &PipelineStats,
) -> u64 {
    let mut extractors = context.registry.instantiate();
    let mut written = 0u64;
    debug!(worker = id, features = extractors.len(), "Consumer starting");

    loop {
        let staged = match queue_rx.take() {
            Some(WorkItem::Image(staged)) => staged,
            Some(WorkItem::Sentinel) => break,
            None => {
                warn!(worker = id, "Work queue closed without a sentinel");
                break;
            }
        };

        match process_item(staged, context, &mut extractors, writer) {
            ItemOutcome::Indexed { id: item, fields } => {
                written += 1;
                stats.record_processed();
                trace!(worker = id, id = %item, fields, "Image indexed");
            }
            ItemOutcome::Failed { id: item, error } => {
                stats.record_failed();
                warn!(worker = id, id = %item, error = %error, "Error processing image");
            }
        }
    }

    info!(worker = id, documents = written, "Consumer finished");
    written
}

/// Build and append the document for one image
pub fn process_item<W: Write + Send>(
    staged: StagedImage,
    context: &ConsumerContext,
    extractors: &mut Extractors,
    writer: &BatchWriter<W>,
) -> ItemOutcome {
    let built = panic::catch_unwind(AssertUnwindSafe(|| {
        build_document(&staged, extractors, &context.encoders, &context.normalize)
    }));

    let result = match built {
        Ok(Ok(fragment)) => writer
            .append(&fragment)
            .map(|()| fragment.len())
            .map_err(ProcessError::from),
        Ok(Err(e)) => Err(e),
        Err(payload) => Err(ProcessError::Panicked(panic_message(payload.as_ref()))),
    };

    match result {
        Ok(fields) => ItemOutcome::Indexed {
            id: staged.id,
            fields,
        },
        Err(error) => ItemOutcome::Failed {
            id: staged.id,
            error,
        },
    }
}

/// Decode, normalize, and describe one image
pub fn build_document(
    staged: &StagedImage,
    extractors: &mut Extractors,
    encoders: &HashEncoders,
    normalize: &NormalizeOptions,
) -> Result<DocumentFragment, ProcessError> {
    let image = imaging::decode(&staged.bytes)?;
    let image = imaging::normalize(image, normalize);

    let mut fragment = DocumentFragment::new(&staged.id, &staged.title);
    for (name, value) in &staged.fields {
        fragment.push(name.as_str(), value.as_str());
    }

    for (descriptor, extractor) in extractors.iter_mut() {
        let code = extractor.code();
        extractor
            .extract(&image)
            .map_err(|source| ProcessError::Extract { code, source })?;

        fragment.push(
            descriptor.histogram_field.as_str(),
            BASE64.encode(extractor.serialized_bytes()),
        );

        if let Some(bit_sampling) = &encoders.bit_sampling {
            let tokens = bit_sampling.encode(code, extractor.to_vector());
            fragment.push(descriptor.hash_field.as_str(), tokens.join(" "));
        }

        if let Some(metric_spaces) = &encoders.metric_spaces {
            if metric_spaces.supports(code) {
                let tokens = metric_spaces.encode(code, extractor.to_vector());
                fragment.push(descriptor.metric_space_field.as_str(), tokens.join(" "));
            }
        }
    }

    Ok(fragment)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

//! Producer / consumer indexing pipeline
//!
//! # Architecture
//!
//! ```text
//!                    ┌──────────────────────┐
//!   ImageSource ───► │   Producer thread    │  reads bytes, one at a time
//!                    └──────────┬───────────┘
//!                               │ put (blocks when full)
//!                    ┌──────────▼───────────┐
//!                    │  Bounded work queue  │ ◄── Monitor (depth only)
//!                    └──────────┬───────────┘
//!              take             │             take
//!        ┌──────────────┬───────┴──────┬──────────────┐
//!        ▼              ▼              ▼              ▼
//!   consumer-0     consumer-1     consumer-2  ...  consumer-N
//!        │              │              │              │
//!        └──────────────┴──────┬───────┴──────────────┘
//!                              ▼
//!                    BatchWriter (one lock, one write per document)
//! ```
//!
//! After the source is exhausted the producer queues one sentinel per
//! consumer, so every consumer stops exactly once, and then fires the
//! completion signal that stops the monitor.

pub mod coordinator;
pub mod monitor;
pub mod producer;
pub mod queue;
pub mod stats;
pub mod worker;

pub use coordinator::{BatchReport, IndexingPipeline, PipelineConfig, DEFAULT_WORKERS};
pub use queue::{StagedImage, WorkItem, WorkQueue, DEFAULT_QUEUE_CAPACITY};
pub use stats::{IndexProgress, PipelineStats};
pub use worker::{build_document, ConsumerContext};

//! solr-image-indexer - Parallel Image Indexer for Solr
//!
//! Turns large collections of product images into Solr update batches of
//! visual descriptors and ships them to a Solr collection. Designed to run
//! multi-hour batches where one bad image never aborts the run.
//!
//! # Features
//!
//! - **Bounded Staging**: A single producer reads image bytes into a bounded
//!   queue, so memory stays flat no matter how large the dataset is.
//!
//! - **Parallel Extraction**: A fixed pool of consumer threads decodes,
//!   normalizes, and describes images with private extractor instances.
//!
//! - **Deterministic Shutdown**: One sentinel per consumer ends the pool
//!   exactly once, with no polling and no shared "done" flag.
//!
//! - **Hash Fields**: Bit sampling and metric space tokens make the
//!   descriptors searchable with plain text queries.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────┐
//! │  Dataset / catalog    │
//! └───────────┬───────────┘
//!             │ read bytes
//!             ▼
//! ┌───────────────────────┐      ┌──────────────────┐
//! │  Producer thread      │─────►│  Work queue      │◄── Monitor
//! └───────────────────────┘      │ (crossbeam       │
//!                                │  bounded)        │
//!                                └────────┬─────────┘
//!                     ┌───────────────────┼───────────────────┐
//!                     ▼                   ▼                   ▼
//!               ┌──────────┐        ┌──────────┐        ┌──────────┐
//!               │consumer-0│        │consumer-1│  ...   │consumer-N│
//!               │ decode   │        │ decode   │        │ decode   │
//!               │ extract  │        │ extract  │        │ extract  │
//!               └────┬─────┘        └────┬─────┘        └────┬─────┘
//!                    └───────────────────┼───────────────────┘
//!                                        ▼
//!                          ┌──────────────────────────┐
//!                          │  Batch writer            │
//!                          │  <delete> + <add> XML    │
//!                          └────────────┬─────────────┘
//!                                       ▼
//!                          ┌──────────────────────────┐
//!                          │  Solr /update + commit   │
//!                          └──────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```bash
//! # Every collection of the dataset
//! solr-image-indexer /data/fashion all all
//!
//! # One gender, two categories, artifacts only
//! solr-image-indexer /data/fashion mujer faldas,vestidos --no-publish -o out/
//! ```

pub mod config;
pub mod error;
pub mod features;
pub mod hashing;
pub mod imaging;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod publish;
pub mod source;

pub use config::{BatchPlan, CliArgs, IndexerConfig};
pub use error::{IndexerError, ItemOutcome, Result};
pub use pipeline::{BatchReport, IndexingPipeline, PipelineConfig};
pub use publish::{IndexPublisher, SolrPublisher};
pub use source::{ImageSource, SourceImage};

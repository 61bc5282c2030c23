//! Error types for solr-image-indexer
//!
//! This module defines the error hierarchy for:
//! - Configuration and CLI errors (fatal, reported before any thread starts)
//! - Image source errors (per-item reads, catalog loading)
//! - Per-item processing errors (decode, extraction, sink writes)
//! - Index publishing errors (recoverable at the batch level)
//! - Worker thread errors
//!
//! Library code uses thiserror; the binary wraps everything in anyhow.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the indexer
#[derive(Error, Debug)]
pub enum IndexerError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Image source errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Worker/concurrency errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// Publishing errors
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    /// I/O errors on the batch artifact
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Invalid queue size
    #[error("Invalid queue size {size}: must be at least {min}")]
    InvalidQueueSize { size: usize, min: usize },

    /// Monitor interval of zero
    #[error("Invalid monitor interval: must be at least one second")]
    InvalidMonitorInterval,

    /// Filter value outside the fixed enumeration
    #[error("Invalid {kind} '{value}': expected 'all' or one of {allowed}")]
    InvalidFilter {
        kind: &'static str,
        value: String,
        allowed: String,
    },

    /// Filter expanded to nothing
    #[error("No {kind} selected")]
    EmptyFilter { kind: &'static str },

    /// Feature code not in the registry
    #[error("Unknown feature '{code}': available features are {available}")]
    UnknownFeature { code: String, available: String },

    /// No feature selected
    #[error("At least one feature must be selected")]
    NoFeatures,

    /// Dataset root or batch input missing
    #[error("Input not found: '{path}'")]
    InputNotFound { path: PathBuf },

    /// Output path error
    #[error("Invalid output path '{path}': {reason}")]
    InvalidOutputPath { path: PathBuf, reason: String },

    /// Reference point file could not be loaded
    #[error("Invalid reference points '{path}': {reason}")]
    InvalidReferencePoints { path: PathBuf, reason: String },
}

/// Image source errors
#[derive(Error, Debug)]
pub enum SourceError {
    /// Reading an image file failed
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Listing an input directory failed
    #[error("Failed to list '{path}': {source}")]
    List {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Catalog file is malformed
    #[error("Invalid catalog '{path}': {reason}")]
    Catalog { path: PathBuf, reason: String },
}

/// Feature extraction errors
#[derive(Error, Debug, Clone)]
pub enum ExtractError {
    /// Image has no pixels to describe
    #[error("Image is empty")]
    EmptyImage,

    /// Extractor-specific failure
    #[error("{0}")]
    Failed(String),
}

/// Failure while turning one staged image into a document
#[derive(Error, Debug)]
pub enum ProcessError {
    /// Image bytes could not be decoded
    #[error("Decode failed: {0}")]
    Decode(#[from] image::ImageError),

    /// A feature extractor failed
    #[error("Feature '{code}' failed: {source}")]
    Extract {
        code: &'static str,
        #[source]
        source: ExtractError,
    },

    /// Writing the fragment to the shared sink failed
    #[error("Sink write failed: {0}")]
    Sink(#[from] std::io::Error),

    /// Decode or extraction panicked
    #[error("Processing panicked: {0}")]
    Panicked(String),
}

/// Index publishing errors
#[derive(Error, Debug)]
pub enum PublishError {
    /// Reading the artifact failed
    #[error("Failed to read artifact '{path}': {source}")]
    ReadArtifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Building the HTTP runtime failed
    #[error("Failed to start HTTP runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// Transport-level failure (connect, timeout, ...)
    #[error("Request to '{url}' failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Remote index answered with a non-success status
    #[error("Request to '{url}' returned {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Thread panicked outside per-item isolation
    #[error("Thread '{name}' panicked")]
    Panicked { name: String },

    /// Thread could not be spawned
    #[error("Failed to spawn thread '{name}': {reason}")]
    SpawnFailed { name: String, reason: String },

    /// Batch writer still referenced after all consumers joined
    #[error("Batch writer is still shared after consumers finished")]
    SinkStillShared,
}

/// Result type alias for IndexerError
pub type Result<T> = std::result::Result<T, IndexerError>;

/// Result type alias for PublishError
pub type PublishResult<T> = std::result::Result<T, PublishError>;

/// Represents the outcome of processing a single image
#[derive(Debug)]
pub enum ItemOutcome {
    /// Document appended to the batch
    Indexed { id: String, fields: usize },

    /// Item dropped; nothing written for it
    Failed { id: String, error: ProcessError },
}

impl ItemOutcome {
    /// Returns true if this outcome represents success
    pub fn is_indexed(&self) -> bool {
        matches!(self, ItemOutcome::Indexed { .. })
    }

    /// Returns the id associated with this outcome
    pub fn id(&self) -> &str {
        match self {
            ItemOutcome::Indexed { id, .. } => id,
            ItemOutcome::Failed { id, .. } => id,
        }
    }
}

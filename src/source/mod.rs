//! Image sources feeding the producer
//!
//! A source is an opaque, lazily evaluated sequence of
//! `(identifier, raw bytes)` pairs plus an optional list of ids from a
//! previous batch that this run replaces. Bytes are read when the producer
//! pulls the next item, so only queued images are resident.

pub mod catalog;
pub mod file_list;

pub use catalog::CatalogSource;
pub use file_list::FileListSource;

use crate::error::SourceError;
use std::collections::BTreeMap;

/// One image as yielded by a source
#[derive(Debug)]
pub struct SourceImage {
    /// Document id
    pub id: String,

    /// Document title
    pub title: String,

    /// Extra document fields
    pub fields: BTreeMap<String, String>,

    /// Raw bytes, or the read failure for this item
    pub bytes: Result<Vec<u8>, SourceError>,
}

/// Lazy iterator over source images
pub type SourceIter = Box<dyn Iterator<Item = SourceImage> + Send>;

/// Enumerable input for one batch
pub trait ImageSource: Send {
    /// Ids of previously indexed documents to delete before adding
    fn previous_ids(&self) -> Vec<String> {
        Vec::new()
    }

    /// Consume the source into a lazy iterator of images
    fn into_images(self: Box<Self>) -> SourceIter;
}

/// In-memory source, mostly useful for tests and embedding
#[derive(Debug, Default)]
pub struct MemorySource {
    previous: Vec<String>,
    images: Vec<SourceImage>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an image with the given bytes
    pub fn with_image(mut self, id: impl Into<String>, bytes: Vec<u8>) -> Self {
        let id = id.into();
        self.images.push(SourceImage {
            title: id.clone(),
            id,
            fields: BTreeMap::new(),
            bytes: Ok(bytes),
        });
        self
    }

    /// Add an item whose read fails
    pub fn with_failure(mut self, id: impl Into<String>, error: SourceError) -> Self {
        let id = id.into();
        self.images.push(SourceImage {
            title: id.clone(),
            id,
            fields: BTreeMap::new(),
            bytes: Err(error),
        });
        self
    }

    /// Set ids to delete before adding
    pub fn with_previous_ids(mut self, ids: Vec<String>) -> Self {
        self.previous = ids;
        self
    }
}

impl ImageSource for MemorySource {
    fn previous_ids(&self) -> Vec<String> {
        self.previous.clone()
    }

    fn into_images(self: Box<Self>) -> SourceIter {
        Box::new(self.images.into_iter())
    }
}

//! Flat file list source
//!
//! Either an explicit list of paths or every regular file of a directory.
//! The document id and title are the canonical path of each file.

use crate::error::SourceError;
use crate::source::{ImageSource, SourceImage, SourceIter};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Source over a list of image files
#[derive(Debug, Clone)]
pub struct FileListSource {
    paths: Vec<PathBuf>,
}

impl FileListSource {
    /// Use an explicit list of files
    pub fn from_paths(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    /// Use every regular file in `dir`, sorted by name
    pub fn from_directory(dir: &Path) -> Result<Self, SourceError> {
        let list_err = |source| SourceError::List {
            path: dir.to_path_buf(),
            source,
        };

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(list_err)? {
            let entry = entry.map_err(list_err)?;
            if entry.file_type().map_err(list_err)?.is_file() {
                paths.push(entry.path());
            }
        }
        paths.sort();

        debug!(dir = %dir.display(), files = paths.len(), "Listed input directory");
        Ok(Self { paths })
    }

    /// Number of files in the list
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check if the list is empty
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl ImageSource for FileListSource {
    fn into_images(self: Box<Self>) -> SourceIter {
        Box::new(self.paths.into_iter().map(|path| {
            let id = fs::canonicalize(&path)
                .unwrap_or_else(|_| path.clone())
                .display()
                .to_string();
            let bytes = fs::read(&path).map_err(|source| SourceError::Read {
                path: path.clone(),
                source,
            });
            SourceImage {
                title: id.clone(),
                id,
                fields: BTreeMap::new(),
                bytes,
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_from_directory_lists_files_sorted() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.jpg"), b"bbb").unwrap();
        fs::write(dir.path().join("a.jpg"), b"a").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        let source = FileListSource::from_directory(dir.path()).unwrap();
        assert_eq!(source.len(), 2);

        let images: Vec<_> = Box::new(source).into_images().collect();
        assert!(images[0].id.ends_with("a.jpg"));
        assert!(images[1].id.ends_with("b.jpg"));
        assert_eq!(images[1].bytes.as_ref().unwrap(), b"bbb");
        assert_eq!(images[0].title, images[0].id);
    }

    #[test]
    fn test_missing_file_yields_read_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.jpg");

        let source = FileListSource::from_paths(vec![missing.clone()]);
        let images: Vec<_> = Box::new(source).into_images().collect();

        assert_eq!(images.len(), 1);
        assert!(matches!(images[0].bytes, Err(SourceError::Read { .. })));
        assert_eq!(images[0].id, missing.display().to_string());
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempdir().unwrap();
        let result = FileListSource::from_directory(&dir.path().join("nope"));
        assert!(matches!(result, Err(SourceError::List { .. })));
    }
}

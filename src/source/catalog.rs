//! JSON catalog source
//!
//! A catalog lists the images of one batch with their ids and, optionally,
//! the ids of the previous batch that must be deleted first:
//!
//! ```json
//! {
//!   "delete": ["A", "B"],
//!   "images": [
//!     { "id": "C", "path": "c.jpg", "title": "Blue coat", "fields": { "brand": "x" } }
//!   ]
//! }
//! ```
//!
//! Relative paths resolve against the catalog's directory. Extra `fields`
//! may not reuse `id`, `title`, or the feature field suffixes.

use crate::error::SourceError;
use crate::source::{ImageSource, SourceImage, SourceIter};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Field names every document already carries
const RESERVED_FIELDS: &[&str] = &["id", "title"];

/// Suffixes of the per-feature histogram and hash fields
const RESERVED_SUFFIXES: &[&str] = &["_hi", "_ha", "_ms"];

fn is_reserved_field(name: &str) -> bool {
    RESERVED_FIELDS.contains(&name) || RESERVED_SUFFIXES.iter().any(|s| name.ends_with(s))
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    delete: Vec<String>,
    images: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogEntry {
    id: String,
    path: PathBuf,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    fields: BTreeMap<String, String>,
}

/// Source backed by a JSON catalog file
#[derive(Debug, Clone)]
pub struct CatalogSource {
    base_dir: PathBuf,
    delete: Vec<String>,
    entries: Vec<CatalogEntry>,
}

impl CatalogSource {
    /// Load and parse a catalog file
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let text = fs::read_to_string(path).map_err(|source| SourceError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self::parse(&text, base_dir).map_err(|reason| SourceError::Catalog {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Parse catalog JSON, resolving relative paths against `base_dir`
    pub fn parse(json: &str, base_dir: PathBuf) -> Result<Self, String> {
        let file: CatalogFile = serde_json::from_str(json).map_err(|e| e.to_string())?;

        if let Some(entry) = file.images.iter().find(|e| e.id.trim().is_empty()) {
            return Err(format!("image '{}' has an empty id", entry.path.display()));
        }

        for entry in &file.images {
            if let Some(name) = entry.fields.keys().find(|name| is_reserved_field(name)) {
                return Err(format!(
                    "image '{}' sets reserved field '{}'",
                    entry.id, name
                ));
            }
        }

        debug!(
            images = file.images.len(),
            deletes = file.delete.len(),
            "Parsed catalog"
        );

        Ok(Self {
            base_dir,
            delete: file.delete,
            entries: file.images,
        })
    }

    /// Number of images in the catalog
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the catalog has no images
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ImageSource for CatalogSource {
    fn previous_ids(&self) -> Vec<String> {
        self.delete.clone()
    }

    fn into_images(self: Box<Self>) -> SourceIter {
        let base_dir = self.base_dir;
        Box::new(self.entries.into_iter().map(move |entry| {
            let path = if entry.path.is_absolute() {
                entry.path
            } else {
                base_dir.join(entry.path)
            };
            let bytes = fs::read(&path).map_err(|source| SourceError::Read { path, source });
            SourceImage {
                title: entry.title.unwrap_or_else(|| entry.id.clone()),
                id: entry.id,
                fields: entry.fields,
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
    fn test_parse_catalog() {
        let json = r#"{
            "delete": ["A", "B"],
            "images": [
                { "id": "C", "path": "c.jpg", "title": "Coat", "fields": { "brand": "acme" } },
                { "id": "D", "path": "/abs/d.jpg" }
            ]
        }"#;

        let catalog = CatalogSource::parse(json, PathBuf::from("/data")).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.previous_ids(), vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_delete_is_optional() {
        let json = r#"{ "images": [] }"#;
        let catalog = CatalogSource::parse(json, PathBuf::new()).unwrap();
        assert!(catalog.previous_ids().is_empty());
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_rejects_malformed_catalog() {
        assert!(CatalogSource::parse("{ \"images\": 3 }", PathBuf::new()).is_err());
        assert!(CatalogSource::parse(
            r#"{ "images": [{ "id": " ", "path": "x.jpg" }] }"#,
            PathBuf::new()
        )
        .is_err());
    }

    #[test]
    fn test_rejects_reserved_extra_fields() {
        for name in ["id", "title", "ch_hi", "eh_ha", "ll_ms"] {
            let json = format!(
                r#"{{ "images": [{{ "id": "C", "path": "c.jpg", "fields": {{ "{}": "EVIL" }} }}] }}"#,
                name
            );
            let err = CatalogSource::parse(&json, PathBuf::new()).unwrap_err();
            assert!(err.contains(name), "{}", err);
        }

        let json = r#"{ "images": [{ "id": "C", "path": "c.jpg", "fields": { "idx": "1", "brand": "b" } }] }"#;
        assert!(CatalogSource::parse(json, PathBuf::new()).is_ok());
    }

    #[test]
    fn test_open_reports_reserved_field_as_catalog_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(
            &path,
            r#"{ "images": [{ "id": "C", "path": "c.jpg", "fields": { "id": "EVIL", "title": "T2" } }] }"#,
        )
        .unwrap();

        let err = CatalogSource::open(&path).unwrap_err();
        assert!(matches!(err, SourceError::Catalog { .. }));
    }

    #[test]
    fn test_open_resolves_relative_paths() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("c.jpg"), b"jpeg").unwrap();
        fs::write(
            dir.path().join("catalog.json"),
            r#"{ "images": [
                { "id": "C", "path": "c.jpg", "fields": { "brand": "acme" } },
                { "id": "E", "path": "missing.jpg", "title": "Gone" }
            ] }"#,
        )
        .unwrap();

        let source = CatalogSource::open(&dir.path().join("catalog.json")).unwrap();
        let images: Vec<_> = Box::new(source).into_images().collect();

        assert_eq!(images[0].id, "C");
        assert_eq!(images[0].title, "C");
        assert_eq!(images[0].fields.get("brand").map(String::as_str), Some("acme"));
        assert_eq!(images[0].bytes.as_ref().unwrap(), b"jpeg");

        assert_eq!(images[1].title, "Gone");
        assert!(images[1].bytes.is_err());
    }
}

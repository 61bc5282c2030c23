//! Feature extractors and the registry that maps feature codes to them
//!
//! The registry is a capability table: each entry pairs a
//! [`FeatureDescriptor`] (the index field names for a feature code) with a
//! factory. Every consumer calls [`FeatureRegistry::instantiate`] once to
//! get private extractor instances; extractors keep per-call state and are
//! never shared between threads.

pub mod histogram;
pub mod layout;

pub use histogram::{ColorHistogram, OpponentHistogram};
pub use layout::{EdgeHistogram, LuminanceLayout};

use crate::error::{ConfigError, ExtractError};
use image::RgbImage;

/// Computes one descriptor from a normalized image
pub trait FeatureExtractor: Send {
    /// Registry code of this feature
    fn code(&self) -> &'static str;

    /// Compute the descriptor, replacing any previous result
    fn extract(&mut self, image: &RgbImage) -> Result<(), ExtractError>;

    /// Compact byte form of the last descriptor, stored in the index
    fn serialized_bytes(&self) -> Vec<u8>;

    /// Last descriptor as a vector, fed to the hash encoders
    fn to_vector(&self) -> &[f32];
}

/// Index field names for one feature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureDescriptor {
    pub code: &'static str,
    pub histogram_field: String,
    pub hash_field: String,
    pub metric_space_field: String,
}

impl FeatureDescriptor {
    /// Descriptor using the `<code>_hi`, `<code>_ha`, `<code>_ms` field convention
    pub fn for_code(code: &'static str) -> Self {
        Self {
            code,
            histogram_field: format!("{}_hi", code),
            hash_field: format!("{}_ha", code),
            metric_space_field: format!("{}_ms", code),
        }
    }
}

/// Factory producing a fresh extractor
pub type ExtractorFactory = fn() -> Box<dyn FeatureExtractor>;

/// A feature known to the registry
#[derive(Debug, Clone)]
pub struct FeatureRegistration {
    /// Field names
    pub descriptor: FeatureDescriptor,

    /// Length of the vector returned by `to_vector`
    pub dimension: usize,

    /// Creates one extractor instance
    pub factory: ExtractorFactory,
}

/// Lookup table from feature code to descriptor and factory
#[derive(Debug, Clone, Default)]
pub struct FeatureRegistry {
    entries: Vec<FeatureRegistration>,
}

impl FeatureRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in feature
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(ColorHistogram::CODE, ColorHistogram::DIMENSION, || {
            Box::new(ColorHistogram::new())
        });
        registry.register(OpponentHistogram::CODE, OpponentHistogram::DIMENSION, || {
            Box::new(OpponentHistogram::new())
        });
        registry.register(LuminanceLayout::CODE, LuminanceLayout::DIMENSION, || {
            Box::new(LuminanceLayout::new())
        });
        registry.register(EdgeHistogram::CODE, EdgeHistogram::DIMENSION, || {
            Box::new(EdgeHistogram::new())
        });
        registry
    }

    /// Add or replace a feature
    pub fn register(&mut self, code: &'static str, dimension: usize, factory: ExtractorFactory) {
        self.entries.retain(|e| e.descriptor.code != code);
        self.entries.push(FeatureRegistration {
            descriptor: FeatureDescriptor::for_code(code),
            dimension,
            factory,
        });
    }

    /// Look up a feature by code
    pub fn get(&self, code: &str) -> Option<&FeatureRegistration> {
        self.entries.iter().find(|e| e.descriptor.code == code)
    }

    /// All registered codes, in registration order
    pub fn codes(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.descriptor.code).collect()
    }

    /// All registrations, in registration order
    pub fn registrations(&self) -> &[FeatureRegistration] {
        &self.entries
    }

    pub fn code_to_histogram_field(&self, code: &str) -> Option<&str> {
        self.get(code).map(|e| e.descriptor.histogram_field.as_str())
    }

    pub fn code_to_hash_field(&self, code: &str) -> Option<&str> {
        self.get(code).map(|e| e.descriptor.hash_field.as_str())
    }

    pub fn code_to_metric_space_field(&self, code: &str) -> Option<&str> {
        self.get(code).map(|e| e.descriptor.metric_space_field.as_str())
    }

    /// Keep only the given codes, in the given order
    ///
    /// An empty selection keeps everything.
    pub fn select(&self, codes: &[String]) -> Result<Self, ConfigError> {
        if codes.is_empty() {
            if self.entries.is_empty() {
                return Err(ConfigError::NoFeatures);
            }
            return Ok(self.clone());
        }

        let mut entries = Vec::with_capacity(codes.len());
        for code in codes {
            let entry = self.get(code).ok_or_else(|| ConfigError::UnknownFeature {
                code: code.clone(),
                available: self.codes().join(", "),
            })?;
            if !entries
                .iter()
                .any(|e: &FeatureRegistration| e.descriptor.code == entry.descriptor.code)
            {
                entries.push(entry.clone());
            }
        }
        Ok(Self { entries })
    }

    /// Fresh extractors for one consumer, paired with their descriptors
    pub fn instantiate(&self) -> Vec<(FeatureDescriptor, Box<dyn FeatureExtractor>)> {
        self.entries
            .iter()
            .map(|e| (e.descriptor.clone(), (e.factory)()))
            .collect()
    }
}

/// Scale a histogram so its bins sum to one
pub(crate) fn normalize_l1(values: &mut [f32]) {
    let sum: f32 = values.iter().sum();
    if sum > 0.0 {
        values.iter_mut().for_each(|v| *v /= sum);
    }
}

/// Quantize a vector to bytes relative to its largest component
pub(crate) fn quantize(values: &[f32]) -> Vec<u8> {
    let max = values.iter().cloned().fold(0.0f32, f32::max);
    if max <= 0.0 {
        return vec![0; values.len()];
    }
    values
        .iter()
        .map(|v| ((v / max) * 255.0).round().clamp(0.0, 255.0) as u8)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_field_names() {
        let registry = FeatureRegistry::builtin();
        assert_eq!(registry.code_to_histogram_field("ch"), Some("ch_hi"));
        assert_eq!(registry.code_to_hash_field("oh"), Some("oh_ha"));
        assert_eq!(registry.code_to_metric_space_field("ll"), Some("ll_ms"));
        assert_eq!(registry.code_to_histogram_field("zz"), None);
    }

    #[test]
    fn test_select_keeps_order_and_rejects_unknown() {
        let registry = FeatureRegistry::builtin();

        let selected = registry
            .select(&["ll".to_string(), "ch".to_string(), "ll".to_string()])
            .unwrap();
        assert_eq!(selected.codes(), vec!["ll", "ch"]);

        let all = registry.select(&[]).unwrap();
        assert_eq!(all.codes(), vec!["ch", "oh", "ll", "eh"]);

        let err = registry.select(&["cedd".to_string()]).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownFeature { .. }));
    }

    #[test]
    fn test_instantiate_gives_private_extractors() {
        let registry = FeatureRegistry::builtin();
        let mut first = registry.instantiate();
        let second = registry.instantiate();

        let image = RgbImage::from_pixel(16, 16, Rgb([255, 0, 0]));
        for (_, extractor) in first.iter_mut() {
            extractor.extract(&image).unwrap();
        }

        // the second set never saw the image
        assert!(second.iter().all(|(_, e)| e.to_vector().iter().all(|v| *v == 0.0)));
        assert!(first.iter().any(|(_, e)| e.to_vector().iter().any(|v| *v > 0.0)));
    }

    #[test]
    fn test_dimensions_match_vectors() {
        let registry = FeatureRegistry::builtin();
        let image = RgbImage::from_fn(40, 30, |x, y| Rgb([(x * 6) as u8, (y * 8) as u8, 90]));
        for entry in registry.registrations() {
            let mut extractor = (entry.factory)();
            extractor.extract(&image).unwrap();
            assert_eq!(extractor.to_vector().len(), entry.dimension, "{}", entry.descriptor.code);
            assert_eq!(extractor.serialized_bytes().len(), entry.dimension);
        }
    }

    #[test]
    fn test_quantize() {
        assert_eq!(quantize(&[0.0, 0.5, 1.0]), vec![0, 128, 255]);
        assert_eq!(quantize(&[0.0, 0.0]), vec![0, 0]);
    }
}

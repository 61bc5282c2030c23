//! Metric space indexing with reference points
//!
//! Each supported feature has a set of reference vectors. A document is
//! described by its `query_length` nearest references, written as
//! `R<index>` tokens; closer references are repeated more often so term
//! frequency carries the rank.

use crate::error::ConfigError;
use crate::features::FeatureRegistry;
use crate::hashing::HashEncoder;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::info;

pub const DEFAULT_REFERENCE_POINTS: usize = 256;
pub const DEFAULT_QUERY_LENGTH: usize = 10;
pub const DEFAULT_SEED: u64 = 0x4d53_5043;

/// Reference point tables keyed by feature code
#[derive(Debug, Clone)]
pub struct MetricSpaces {
    references: HashMap<String, Vec<Vec<f32>>>,
    query_length: usize,
}

impl MetricSpaces {
    /// Build from explicit reference tables
    pub fn new(references: HashMap<String, Vec<Vec<f32>>>, query_length: usize) -> Self {
        Self {
            references,
            query_length: query_length.max(1),
        }
    }

    /// Random reference points for every feature in the registry
    ///
    /// Points are drawn uniformly from [0, 1) and scaled to sum to one,
    /// matching the range of normalized histograms.
    pub fn generated(registry: &FeatureRegistry, count: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let references = registry
            .registrations()
            .iter()
            .map(|entry| {
                let points = (0..count)
                    .map(|_| {
                        let mut point: Vec<f32> =
                            (0..entry.dimension).map(|_| rng.gen::<f32>()).collect();
                        let sum: f32 = point.iter().sum();
                        if sum > 0.0 {
                            point.iter_mut().for_each(|v| *v /= sum);
                        }
                        point
                    })
                    .collect();
                (entry.descriptor.code.to_string(), points)
            })
            .collect();
        Self::new(references, DEFAULT_QUERY_LENGTH)
    }

    /// Load reference tables from a JSON object `{ "<code>": [[f32, ...], ...] }`
    pub fn from_json_file(path: &Path, query_length: usize) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidReferencePoints {
            path: path.to_path_buf(),
            reason,
        };

        let text = fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let references: HashMap<String, Vec<Vec<f32>>> =
            serde_json::from_str(&text).map_err(|e| invalid(e.to_string()))?;

        for (code, points) in &references {
            if points.is_empty() {
                return Err(invalid(format!("feature '{}' has no reference points", code)));
            }
            let dimension = points[0].len();
            if points.iter().any(|p| p.len() != dimension) {
                return Err(invalid(format!(
                    "feature '{}' mixes reference point dimensions",
                    code
                )));
            }
        }

        info!(
            path = %path.display(),
            features = references.len(),
            "Loaded metric space reference points"
        );
        Ok(Self::new(references, query_length))
    }

    /// Indexes of the nearest reference points, closest first
    pub fn nearest(&self, code: &str, vector: &[f32]) -> Vec<usize> {
        let Some(points) = self.references.get(code) else {
            return Vec::new();
        };

        let mut distances: Vec<(usize, f32)> = points
            .iter()
            .enumerate()
            .map(|(i, p)| (i, l2_distance(p, vector)))
            .collect();
        distances.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        distances
            .into_iter()
            .take(self.query_length)
            .map(|(i, _)| i)
            .collect()
    }
}

impl HashEncoder for MetricSpaces {
    fn supports(&self, code: &str) -> bool {
        self.references.contains_key(code)
    }

    fn encode(&self, code: &str, vector: &[f32]) -> Vec<String> {
        let nearest = self.nearest(code, vector);
        let k = nearest.len();
        let mut tokens = Vec::with_capacity(k * (k + 1) / 2);
        for (rank, index) in nearest.into_iter().enumerate() {
            let token = format!("R{:04}", index);
            for _ in 0..(k - rank) {
                tokens.push(token.clone());
            }
        }
        tokens
    }
}

/// Euclidean distance over the shared prefix; missing components count as zero
fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            let d = a.get(i).copied().unwrap_or(0.0) - b.get(i).copied().unwrap_or(0.0);
            d * d
        })
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn two_points() -> MetricSpaces {
        let mut references = HashMap::new();
        references.insert("ch".to_string(), vec![vec![0.0, 0.0], vec![1.0, 1.0]]);
        MetricSpaces::new(references, 2)
    }

    #[test]
    fn test_supports_only_known_features() {
        let ms = two_points();
        assert!(ms.supports("ch"));
        assert!(!ms.supports("eh"));
    }

    #[test]
    fn test_tokens_weighted_by_rank() {
        let ms = two_points();
        let tokens = ms.encode("ch", &[0.9, 0.9]);
        assert_eq!(tokens, vec!["R0001", "R0001", "R0000"]);
    }

    #[test]
    fn test_unknown_feature_has_no_tokens() {
        assert!(two_points().encode("oh", &[0.1, 0.2]).is_empty());
    }

    #[test]
    fn test_generated_covers_registry() {
        let registry = FeatureRegistry::builtin();
        let ms = MetricSpaces::generated(&registry, 16, 5);
        for code in registry.codes() {
            assert!(ms.supports(code));
        }
        let tokens = ms.encode("ch", &vec![1.0 / 64.0; 64]);
        assert_eq!(tokens.len(), 10 * 11 / 2);
    }

    #[test]
    fn test_load_from_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("refs.json");
        fs::write(&path, r#"{ "ll": [[0.0, 1.0], [1.0, 0.0]] }"#).unwrap();

        let ms = MetricSpaces::from_json_file(&path, 1).unwrap();
        assert!(ms.supports("ll"));
        assert_eq!(ms.encode("ll", &[0.9, 0.1]), vec!["R0001"]);

        fs::write(&path, r#"{ "ll": [[0.0, 1.0], [1.0]] }"#).unwrap();
        assert!(matches!(
            MetricSpaces::from_json_file(&path, 1),
            Err(ConfigError::InvalidReferencePoints { .. })
        ));
    }
}

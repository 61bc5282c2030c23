//! Bit sampling hashes over random hyperplanes
//!
//! Each of `bundles` hash functions draws `bits` Gaussian hyperplanes; a bit
//! is set when the vector lies on the positive side. The bundle index is
//! packed above the bits so tokens from different bundles never collide.
//! Vectors longer than `dimensions` are truncated.

use crate::hashing::HashEncoder;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

pub const DEFAULT_BUNDLES: usize = 100;
pub const DEFAULT_BITS: usize = 12;
pub const DEFAULT_DIMENSIONS: usize = 640;
pub const DEFAULT_SEED: u64 = 0x4c49_5245;

/// Random hyperplane hash functions
#[derive(Debug, Clone)]
pub struct BitSampling {
    bundles: usize,
    bits: usize,
    dimensions: usize,
    /// `bundles * bits` hyperplanes of `dimensions` components, row major
    planes: Vec<f32>,
}

impl BitSampling {
    /// Hash functions with default sizes and seed
    pub fn new() -> Self {
        Self::with_params(DEFAULT_BUNDLES, DEFAULT_BITS, DEFAULT_DIMENSIONS, DEFAULT_SEED)
    }

    /// Hash functions with explicit sizes; the same seed yields the same hashes
    pub fn with_params(bundles: usize, bits: usize, dimensions: usize, seed: u64) -> Self {
        let bits = bits.min(32);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let planes = (0..bundles * bits * dimensions)
            .map(|_| rng.sample::<f32, _>(StandardNormal))
            .collect();
        Self {
            bundles,
            bits,
            dimensions,
            planes,
        }
    }

    /// Raw hash values, one per bundle
    pub fn generate_hashes(&self, vector: &[f32]) -> Vec<u64> {
        let len = vector.len().min(self.dimensions);
        let vector = &vector[..len];

        (0..self.bundles)
            .map(|bundle| {
                let mut code = 0u64;
                for bit in 0..self.bits {
                    let start = (bundle * self.bits + bit) * self.dimensions;
                    let plane = &self.planes[start..start + len];
                    let dot: f32 = plane.iter().zip(vector).map(|(p, v)| p * v).sum();
                    if dot > 0.0 {
                        code |= 1 << bit;
                    }
                }
                ((bundle as u64) << self.bits) | code
            })
            .collect()
    }
}

impl Default for BitSampling {
    fn default() -> Self {
        Self::new()
    }
}

impl HashEncoder for BitSampling {
    fn encode(&self, _code: &str, vector: &[f32]) -> Vec<String> {
        self.generate_hashes(vector)
            .into_iter()
            .map(|h| format!("{:x}", h))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_token_per_bundle() {
        let hashing = BitSampling::with_params(10, 8, 16, 7);
        let tokens = hashing.encode("ch", &[0.5; 16]);
        assert_eq!(tokens.len(), 10);
    }

    #[test]
    fn test_deterministic_for_seed() {
        let a = BitSampling::with_params(5, 8, 32, 42);
        let b = BitSampling::with_params(5, 8, 32, 42);
        let v: Vec<f32> = (0..32).map(|i| (i as f32).sin()).collect();
        assert_eq!(a.generate_hashes(&v), b.generate_hashes(&v));
    }

    #[test]
    fn test_bundle_in_high_bits() {
        let hashing = BitSampling::with_params(4, 8, 8, 1);
        let hashes = hashing.generate_hashes(&[1.0; 8]);
        for (bundle, hash) in hashes.iter().enumerate() {
            assert_eq!(hash >> 8, bundle as u64);
        }
    }

    #[test]
    fn test_zero_vector_sets_no_bits() {
        let hashing = BitSampling::with_params(3, 12, 8, 1);
        assert_eq!(
            hashing.encode("ch", &[0.0; 8]),
            vec!["0".to_string(), "1000".to_string(), "2000".to_string()]
        );
    }

    #[test]
    fn test_bits_clamped_before_planes() {
        let hashing = BitSampling::with_params(2, 40, 4, 5);
        assert_eq!(hashing.bits, 32);
        assert_eq!(hashing.planes.len(), 2 * 32 * 4);

        let hashes = hashing.generate_hashes(&[1.0, -1.0, 0.5, 0.25]);
        assert_eq!(hashes[1] >> 32, 1);
    }

    #[test]
    fn test_long_vector_is_truncated() {
        let hashing = BitSampling::with_params(2, 4, 4, 3);
        let short = hashing.generate_hashes(&[0.1, 0.2, 0.3, 0.4]);
        let long = hashing.generate_hashes(&[0.1, 0.2, 0.3, 0.4, 9.0, 9.0]);
        assert_eq!(short, long);
    }
}

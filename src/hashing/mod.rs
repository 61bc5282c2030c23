//! Hash encoders turning feature vectors into index tokens
//!
//! Two independent modes, each toggled by its own flag:
//! - bit sampling: locality sensitive hashing with random hyperplanes
//! - metric spaces: ids of the nearest reference points
//!
//! Encoders are immutable after construction and shared by all consumers.

pub mod bit_sampling;
pub mod metric_spaces;

pub use bit_sampling::BitSampling;
pub use metric_spaces::MetricSpaces;

/// Encodes a feature vector as a sequence of index tokens
pub trait HashEncoder: Send + Sync {
    /// Whether this encoder can handle vectors of the given feature
    fn supports(&self, _code: &str) -> bool {
        true
    }

    /// Tokens for one vector
    fn encode(&self, code: &str, vector: &[f32]) -> Vec<String>;
}

/// Which hashing modes are enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingConfig {
    pub bit_sampling: bool,
    pub metric_spaces: bool,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            bit_sampling: true,
            metric_spaces: false,
        }
    }
}

/// The encoders a run uses; `None` means the mode is off
#[derive(Default)]
pub struct HashEncoders {
    pub bit_sampling: Option<Box<dyn HashEncoder>>,
    pub metric_spaces: Option<Box<dyn HashEncoder>>,
}

impl HashEncoders {
    /// No hashing at all
    pub fn none() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for HashEncoders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashEncoders")
            .field("bit_sampling", &self.bit_sampling.is_some())
            .field("metric_spaces", &self.metric_spaces.is_some())
            .finish()
    }
}

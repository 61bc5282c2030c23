//! Configuration types for solr-image-indexer
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation
//! - Expansion of the gender / category filters into batch plans

use crate::error::{ConfigError, SourceError};
use crate::features::FeatureRegistry;
use crate::hashing::metric_spaces::{
    DEFAULT_QUERY_LENGTH, DEFAULT_REFERENCE_POINTS, DEFAULT_SEED as REFERENCE_SEED,
};
use crate::hashing::{BitSampling, HashEncoders, HashingConfig, MetricSpaces};
use crate::imaging::NormalizeOptions;
use crate::pipeline::PipelineConfig;
use crate::source::{CatalogSource, FileListSource, ImageSource};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Maximum reasonable worker count
const MAX_WORKERS: usize = 256;

/// Minimum queue size
const MIN_QUEUE_SIZE: usize = 1;

/// Gender filter values
pub const GENDERS: &[&str] = &["mujer", "hombre"];

/// Category filter values
pub const CATEGORIES: &[&str] = &[
    "abrigos_chaquetas",
    "camisas_blusas",
    "camisetas_tops_bodies",
    "faldas",
    "monos",
    "pantalones_cortos",
    "pantalones_largos",
    "punto",
    "sudaderas_jerseis",
    "vestidos",
];

/// Filter value selecting every allowed value
pub const ALL: &str = "all";

/// Directory holding the cropped product images of one batch
pub const IMAGE_DIR: &str = "CROPPED";

/// Catalog file name of one batch
pub const CATALOG_FILE: &str = "catalog.json";

/// Parallel image indexer producing Solr update batches
#[derive(Parser, Debug, Clone)]
#[command(
    name = "solr-image-indexer",
    version,
    about = "Parallel image indexer producing Solr update batches",
    long_about = "Extracts visual features from a product image dataset and writes one Solr \
                  update batch per gender/category collection.\n\n\
                  Images are read from <DATASET_ROOT>/<gender>/<category>/CROPPED, or from \
                  catalog.json files with --catalog. Each batch is written to \
                  <OUTPUT_DIR>/<gender>_<category>.xml and then posted to Solr.",
    after_help = "EXAMPLES:\n    \
        solr-image-indexer /data/fashion all all\n    \
        solr-image-indexer /data/fashion mujer faldas,vestidos -w 16\n    \
        solr-image-indexer /data/fashion hombre all --metric-spaces --no-publish -o out/"
)]
pub struct CliArgs {
    /// Dataset root directory
    #[arg(value_name = "DATASET_ROOT")]
    pub root: PathBuf,

    /// Gender filter ('all' or comma-separated values)
    #[arg(value_name = "GENDER")]
    pub gender: String,

    /// Category filter ('all' or comma-separated values)
    #[arg(value_name = "CATEGORY")]
    pub category: String,

    /// Number of consumer threads
    #[arg(short = 'w', long, default_value = "8", value_name = "NUM")]
    pub workers: usize,

    /// Work queue size (bounds the images held in memory)
    #[arg(long, default_value = "250", value_name = "NUM")]
    pub queue_size: usize,

    /// Longest image side after normalization (50 or less disables downscaling)
    #[arg(short = 'm', long, default_value = "512", value_name = "PIXELS")]
    pub max_side_length: u32,

    /// Keep the white border around the subject
    #[arg(long)]
    pub no_trim: bool,

    /// Features to extract (comma-separated codes, default all)
    #[arg(long, value_name = "CODES", value_delimiter = ',')]
    pub features: Vec<String>,

    /// Disable bit sampling hashes
    #[arg(long)]
    pub no_bit_sampling: bool,

    /// Enable metric space hashes
    #[arg(long)]
    pub metric_spaces: bool,

    /// Reference points for metric space hashing (JSON)
    #[arg(long, value_name = "FILE")]
    pub reference_points: Option<PathBuf>,

    /// Read catalog.json files instead of listing image directories
    #[arg(long)]
    pub catalog: bool,

    /// Directory for batch artifacts
    #[arg(short = 'o', long, default_value = ".", value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Overwrite existing artifacts
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Solr base URL
    #[arg(long, default_value = crate::publish::DEFAULT_SOLR_URL, value_name = "URL")]
    pub solr_url: String,

    /// Write artifacts only, do not post them
    #[arg(long)]
    pub no_publish: bool,

    /// Publish request timeout in seconds
    #[arg(long, default_value = "60", value_name = "SECS")]
    pub timeout: u64,

    /// Seconds between progress log lines
    #[arg(long, default_value = "10", value_name = "SECS")]
    pub monitor_interval: u64,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Where a batch reads its images from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchInput {
    /// Every file in a directory
    Directory(PathBuf),

    /// A catalog file
    Catalog(PathBuf),
}

impl BatchInput {
    pub fn path(&self) -> &Path {
        match self {
            Self::Directory(path) | Self::Catalog(path) => path,
        }
    }

    /// Open the image source for this input
    pub fn open(&self) -> Result<Box<dyn ImageSource>, SourceError> {
        Ok(match self {
            Self::Directory(dir) => Box::new(FileListSource::from_directory(dir)?),
            Self::Catalog(path) => Box::new(CatalogSource::open(path)?),
        })
    }
}

/// One (gender, category) batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    /// Target collection, `<gender>_<category>`
    pub collection: String,

    /// Image input
    pub input: BatchInput,

    /// Artifact file
    pub artifact: PathBuf,
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Dataset root
    pub root: PathBuf,

    /// Batches to run, in order
    pub batches: Vec<BatchPlan>,

    /// Pipeline settings
    pub pipeline: PipelineConfig,

    /// Selected feature codes, in output order
    pub features: Vec<String>,

    /// Enabled hashing modes
    pub hashing: HashingConfig,

    /// Reference point file for metric spaces
    pub reference_points: Option<PathBuf>,

    /// Solr base URL, `None` when publishing is disabled
    pub solr_url: Option<String>,

    /// Publish request timeout
    pub timeout: Duration,

    /// Verbose logging
    pub verbose: bool,
}

impl IndexerConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        // Validate worker count
        if args.workers == 0 || args.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: args.workers,
                max: MAX_WORKERS,
            });
        }

        // Validate queue size
        if args.queue_size < MIN_QUEUE_SIZE {
            return Err(ConfigError::InvalidQueueSize {
                size: args.queue_size,
                min: MIN_QUEUE_SIZE,
            });
        }

        if args.monitor_interval == 0 {
            return Err(ConfigError::InvalidMonitorInterval);
        }

        // Fail on unknown feature codes before touching the filesystem
        let registry = FeatureRegistry::builtin().select(&args.features)?;
        let features = registry.codes().iter().map(|c| c.to_string()).collect();

        let hashing = HashingConfig {
            bit_sampling: !args.no_bit_sampling,
            metric_spaces: args.metric_spaces,
        };

        let genders = expand_filter("gender", &args.gender, GENDERS)?;
        let categories = expand_filter("category", &args.category, CATEGORIES)?;

        if !args.root.is_dir() {
            return Err(ConfigError::InputNotFound { path: args.root });
        }

        if !args.output_dir.is_dir() {
            return Err(ConfigError::InvalidOutputPath {
                path: args.output_dir.clone(),
                reason: "Output directory does not exist".to_string(),
            });
        }

        if let Some(ref points) = args.reference_points {
            if !points.is_file() {
                return Err(ConfigError::InvalidReferencePoints {
                    path: points.clone(),
                    reason: "File does not exist".to_string(),
                });
            }
        }

        let mut batches = Vec::with_capacity(genders.len() * categories.len());
        for gender in &genders {
            for category in &categories {
                let plan = plan_batch(&args, gender, category);
                if !plan.input.path().exists() {
                    return Err(ConfigError::InputNotFound {
                        path: plan.input.path().to_path_buf(),
                    });
                }
                if plan.artifact.exists() && !args.force {
                    return Err(ConfigError::InvalidOutputPath {
                        path: plan.artifact.clone(),
                        reason: "Artifact already exists (use --force to overwrite)".to_string(),
                    });
                }
                batches.push(plan);
            }
        }

        let pipeline = PipelineConfig {
            workers: args.workers,
            queue_capacity: args.queue_size,
            normalize: NormalizeOptions {
                trim_whitespace: !args.no_trim,
                max_side_length: args.max_side_length,
            },
            monitor_interval: Duration::from_secs(args.monitor_interval),
            show_progress: !args.quiet,
        };

        Ok(Self {
            root: args.root,
            batches,
            pipeline,
            features,
            hashing,
            reference_points: args.reference_points,
            solr_url: (!args.no_publish).then_some(args.solr_url),
            timeout: Duration::from_secs(args.timeout),
            verbose: args.verbose,
        })
    }

    /// Registry restricted to the selected features
    pub fn registry(&self) -> Result<FeatureRegistry, ConfigError> {
        FeatureRegistry::builtin().select(&self.features)
    }

    /// Build the enabled hash encoders for `registry`
    pub fn encoders(&self, registry: &FeatureRegistry) -> Result<HashEncoders, ConfigError> {
        let mut encoders = HashEncoders::none();

        if self.hashing.bit_sampling {
            encoders.bit_sampling = Some(Box::new(BitSampling::new()));
        }

        if self.hashing.metric_spaces {
            let metric_spaces = match &self.reference_points {
                Some(path) => MetricSpaces::from_json_file(path, DEFAULT_QUERY_LENGTH)?,
                None => MetricSpaces::generated(registry, DEFAULT_REFERENCE_POINTS, REFERENCE_SEED),
            };
            encoders.metric_spaces = Some(Box::new(metric_spaces));
        }

        Ok(encoders)
    }
}

/// Expand `all` or a comma-separated list against the allowed values
///
/// The result keeps the order of `allowed` and holds no duplicates.
pub fn expand_filter(
    kind: &'static str,
    value: &str,
    allowed: &[&'static str],
) -> Result<Vec<&'static str>, ConfigError> {
    let value = value.trim();
    if value.eq_ignore_ascii_case(ALL) {
        return Ok(allowed.to_vec());
    }

    let mut wanted = Vec::new();
    for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let part = part.to_ascii_lowercase();
        match allowed.iter().find(|a| **a == part) {
            Some(found) => wanted.push(*found),
            None => {
                return Err(ConfigError::InvalidFilter {
                    kind,
                    value: part,
                    allowed: allowed.join(", "),
                })
            }
        }
    }

    let selected: Vec<&'static str> = allowed
        .iter()
        .copied()
        .filter(|a| wanted.contains(a))
        .collect();

    if selected.is_empty() {
        return Err(ConfigError::EmptyFilter { kind });
    }
    Ok(selected)
}

fn plan_batch(args: &CliArgs, gender: &str, category: &str) -> BatchPlan {
    let collection = format!("{}_{}", gender, category);
    let base = args.root.join(gender).join(category);
    let input = if args.catalog {
        BatchInput::Catalog(base.join(CATALOG_FILE))
    } else {
        BatchInput::Directory(base.join(IMAGE_DIR))
    };
    let artifact = args.output_dir.join(format!("{}.xml", collection));

    BatchPlan {
        collection,
        input,
        artifact,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn args(root: &Path, output: &Path, extra: &[&str]) -> CliArgs {
        let mut argv = vec![
            "solr-image-indexer".to_string(),
            root.display().to_string(),
            "mujer".to_string(),
            "faldas".to_string(),
            "-o".to_string(),
            output.display().to_string(),
        ];
        argv.extend(extra.iter().map(|s| s.to_string()));
        CliArgs::parse_from(argv)
    }

    fn dataset() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("mujer/faldas/CROPPED")).unwrap();
        dir
    }

    #[test]
    fn test_expand_all() {
        assert_eq!(expand_filter("gender", "all", GENDERS).unwrap(), GENDERS);
        assert_eq!(
            expand_filter("category", "ALL", CATEGORIES).unwrap().len(),
            10
        );
    }

    #[test]
    fn test_expand_list_keeps_canonical_order() {
        let got = expand_filter("category", "vestidos, faldas,faldas", CATEGORIES).unwrap();
        assert_eq!(got, vec!["faldas", "vestidos"]);
    }

    #[test]
    fn test_expand_rejects_unknown_value() {
        let err = expand_filter("gender", "nino", GENDERS).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFilter { kind: "gender", .. }));
    }

    #[test]
    fn test_expand_empty_is_error() {
        let err = expand_filter("category", " , ", CATEGORIES).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyFilter { kind: "category" }));
    }

    #[test]
    fn test_defaults() {
        let data = dataset();
        let out = TempDir::new().unwrap();
        let config = IndexerConfig::from_args(args(data.path(), out.path(), &[])).unwrap();

        assert_eq!(config.pipeline.workers, 8);
        assert_eq!(config.pipeline.queue_capacity, 250);
        assert_eq!(config.pipeline.normalize, NormalizeOptions::default());
        assert_eq!(config.features, vec!["ch", "oh", "ll", "eh"]);
        assert_eq!(config.hashing, HashingConfig::default());
        assert_eq!(config.solr_url.as_deref(), Some("http://localhost:8983/solr"));
        assert_eq!(config.batches.len(), 1);

        let plan = &config.batches[0];
        assert_eq!(plan.collection, "mujer_faldas");
        assert_eq!(
            plan.input,
            BatchInput::Directory(data.path().join("mujer/faldas/CROPPED"))
        );
        assert_eq!(plan.artifact, out.path().join("mujer_faldas.xml"));
    }

    #[test]
    fn test_invalid_worker_count() {
        let data = dataset();
        let out = TempDir::new().unwrap();
        let err = IndexerConfig::from_args(args(data.path(), out.path(), &["-w", "0"])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidWorkerCount { count: 0, .. }));
    }

    #[test]
    fn test_unknown_feature() {
        let data = dataset();
        let out = TempDir::new().unwrap();
        let err = IndexerConfig::from_args(args(data.path(), out.path(), &["--features", "ch,zz"]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownFeature { .. }));
    }

    #[test]
    fn test_missing_batch_input() {
        let data = dataset();
        let out = TempDir::new().unwrap();
        let err =
            IndexerConfig::from_args(args(data.path(), out.path(), &["--catalog"])).unwrap_err();
        match err {
            ConfigError::InputNotFound { path } => assert!(path.ends_with("catalog.json")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_existing_artifact_requires_force() {
        let data = dataset();
        let out = TempDir::new().unwrap();
        fs::write(out.path().join("mujer_faldas.xml"), "<add>\n</add>\n").unwrap();

        let err = IndexerConfig::from_args(args(data.path(), out.path(), &[])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOutputPath { .. }));

        let config = IndexerConfig::from_args(args(data.path(), out.path(), &["--force"])).unwrap();
        assert_eq!(config.batches.len(), 1);
    }

    #[test]
    fn test_hashing_flags() {
        let data = dataset();
        let out = TempDir::new().unwrap();
        let config = IndexerConfig::from_args(args(
            data.path(),
            out.path(),
            &["--no-bit-sampling", "--metric-spaces", "--no-publish"],
        ))
        .unwrap();

        assert!(!config.hashing.bit_sampling);
        assert!(config.hashing.metric_spaces);
        assert!(config.solr_url.is_none());

        let registry = config.registry().unwrap();
        let encoders = config.encoders(&registry).unwrap();
        assert!(encoders.bit_sampling.is_none());
        assert!(encoders.metric_spaces.is_some());
    }
}

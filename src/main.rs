//! solr-image-indexer - Parallel Image Indexer for Solr
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use solr_image_indexer::config::{CliArgs, IndexerConfig};
use solr_image_indexer::progress::{print_header, print_summary};
use solr_image_indexer::publish::{publish_artifact, IndexPublisher, SolrPublisher};
use solr_image_indexer::source::ImageSource;
use solr_image_indexer::IndexingPipeline;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Setup logging
    setup_logging(args.verbose)?;

    // Validate and create config
    let config = IndexerConfig::from_args(args).context("Invalid configuration")?;

    let registry = config.registry().context("Invalid feature selection")?;
    let encoders = config
        .encoders(&registry)
        .context("Failed to prepare hash encoders")?;

    // Resolve every source before the first pipeline thread starts
    let mut sources: Vec<Box<dyn ImageSource>> = Vec::with_capacity(config.batches.len());
    for plan in &config.batches {
        let source = plan
            .input
            .open()
            .with_context(|| format!("Failed to open input for '{}'", plan.collection))?;
        sources.push(source);
    }

    let publisher = match &config.solr_url {
        Some(url) => Some(
            SolrPublisher::new(url, config.timeout).context("Failed to create Solr publisher")?,
        ),
        None => None,
    };

    if config.pipeline.show_progress {
        print_header(
            &config.root,
            config.batches.len(),
            config.pipeline.workers,
            &registry.codes(),
        );
    }

    let pipeline = IndexingPipeline::new(config.pipeline.clone(), registry, encoders);

    let mut unpublished = 0usize;
    for (plan, source) in config.batches.iter().zip(sources) {
        info!(collection = %plan.collection, input = %plan.input.path().display(), "Indexing batch");

        let report = pipeline
            .run_to_file(source, &plan.artifact)
            .with_context(|| format!("Batch '{}' failed", plan.collection))?;

        if config.pipeline.show_progress {
            print_summary(&plan.collection, &report, &plan.artifact);
        }

        if let Some(ref publisher) = publisher {
            let publisher: &dyn IndexPublisher = publisher;
            if let Err(e) = publish_artifact(publisher, &plan.collection, &plan.artifact) {
                unpublished += 1;
                warn!(
                    collection = %plan.collection,
                    artifact = %plan.artifact.display(),
                    error = %e,
                    "Publish failed, artifact kept for resubmission"
                );
            }
        }
    }

    if unpublished > 0 {
        info!(unpublished, "Run completed with unpublished batches");
    }

    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("solr_image_indexer=debug,warn")
    } else {
        EnvFilter::new("solr_image_indexer=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use bathy_core::pipeline::output::write_outputs;
use bathy_core::pipeline::{run_pipeline_reported, PipelineConfig, PipelineStage, ProgressReporter};
use bathy_core::source::CatalogSource;
use clap::Args;
use tracing::debug;

use crate::progress::BarProgressReporter;
use crate::summary::{print_pipeline_summary, print_result_summary};

#[derive(Args)]
pub struct RunArgs {
    /// Pipeline config file (TOML)
    pub config: PathBuf,

    /// Raster catalog directory (overrides `sources.catalog`)
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Output directory (overrides `output.directory`)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of reference depth points to sample
    #[arg(long)]
    pub samples: Option<usize>,

    /// Seed for reference point sampling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Skip PNG rendering of map layers
    #[arg(long)]
    pub no_render: bool,
}

pub fn run(args: &RunArgs) -> Result<()> {
    let contents = std::fs::read_to_string(&args.config)
        .with_context(|| format!("Failed to read config {}", args.config.display()))?;
    let mut config: PipelineConfig = toml::from_str(&contents).context("Invalid pipeline config")?;
    apply_overrides(&mut config, args);

    // Relative catalog paths are resolved against the config file.
    if config.sources.catalog.is_relative() {
        let base = args.config.parent().unwrap_or(Path::new("."));
        config.sources.catalog = base.join(&config.sources.catalog);
    }
    config.validate().context("Invalid pipeline config")?;
    debug!(
        config = %args.config.display(),
        catalog = %config.sources.catalog.display(),
        "Loaded pipeline config"
    );

    print_pipeline_summary(&config);

    let source = CatalogSource::open(&config.sources.catalog).with_context(|| {
        format!("Failed to open catalog {}", config.sources.catalog.display())
    })?;

    let reporter = Arc::new(BarProgressReporter::new()?);
    let output = run_pipeline_reported(&config, &source, reporter.clone())?;

    reporter.begin_stage(PipelineStage::Writing);
    let written = write_outputs(&output, &config.output).with_context(|| {
        format!("Failed to write outputs to {}", config.output.directory.display())
    })?;
    reporter.finish_stage();
    reporter.finish();

    print_result_summary(&output, &written);
    Ok(())
}

fn apply_overrides(config: &mut PipelineConfig, args: &RunArgs) {
    if let Some(ref catalog) = args.catalog {
        config.sources.catalog = catalog.clone();
    }
    if let Some(ref dir) = args.output {
        config.output.directory = dir.clone();
    }
    if let Some(n) = args.samples {
        config.reference.num_points = n;
    }
    if let Some(seed) = args.seed {
        config.reference.seed = seed;
    }
    if args.no_render {
        config.output.render_layers = false;
    }
}

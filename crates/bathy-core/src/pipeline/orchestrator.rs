use std::sync::Arc;

use tracing::info;

use crate::cloud::mask_clouds;
use crate::div::div_transform;
use crate::error::Result;
use crate::io::report_io::{SampleCounts, SceneSummary};
use crate::raster::{Image, Scene};
use crate::reference::{mask_dem, sample_depth_points, split_training_validation};
use crate::region::Region;
use crate::regress::run_bathymetry;
use crate::render::{Layer, VisParams};
use crate::report::compare;
use crate::source::RasterSource;
use crate::water::mask_land;

use super::config::{PipelineConfig, SceneSelection, SourcesConfig};
use super::types::{Artifacts, NoOpReporter, PipelineOutput, PipelineStage, ProgressReporter};

/// Filter the optical collection and pick one scene.
pub fn select_scene(
    source: &dyn RasterSource,
    sources: &SourcesConfig,
    region: &Region,
) -> Result<Scene> {
    let collection = source
        .load_collection(&sources.optical)?
        .filter_date(sources.start_date, sources.end_date)
        .filter_bounds(region)
        .filter_cloud_cover_lt(sources.max_cloud_cover);
    let scene = match sources.scene_selection {
        SceneSelection::First => collection.first()?,
        SceneSelection::LeastCloudy => collection.least_cloudy()?,
    };
    info!(
        scene = %scene.id,
        date = %scene.date,
        cloud_cover = scene.cloud_cover,
        candidates = collection.len(),
        "Selected optical scene"
    );
    Ok(scene.clone())
}

/// Mosaic the reference collection over the region.
pub fn load_reference(source: &dyn RasterSource, id: &str, region: &Region) -> Result<Image> {
    let collection = source.load_collection(id)?.filter_bounds(region);
    let dem = collection.mosaic()?.clip(region);
    info!(
        tiles = collection.len(),
        rows = dem.rows(),
        cols = dem.cols(),
        "Loaded reference DEM"
    );
    Ok(dem)
}

/// Run the full processing pipeline with a thread-safe progress reporter.
pub fn run_pipeline_reported(
    config: &PipelineConfig,
    source: &dyn RasterSource,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<PipelineOutput> {
    config.validate()?;
    let region = config.region.to_region()?;
    let depth_band = config.reference.depth_band.as_str();
    let dem_vis = VisParams::dem().with_bands(&[depth_band]);
    let mut artifacts = Artifacts::default();

    reporter.begin_stage(PipelineStage::Loading);
    let dem = load_reference(source, &config.sources.reference, &region)?;
    let scene = select_scene(source, &config.sources, &region)?;
    let image = scene.image.clip(&region);
    artifacts.push(Layer::new("Reference DEM", dem.clone(), dem_vis.clone(), true));
    artifacts.push(Layer::new("Optical RGB", image.clone(), VisParams::rgb(), false));
    reporter.finish_stage();

    reporter.begin_stage(PipelineStage::CloudMasking);
    let clear = mask_clouds(&image, &config.cloud)?;
    artifacts.push(Layer::new("Cloud masked", clear.clone(), VisParams::rgb(), true));
    reporter.finish_stage();

    reporter.begin_stage(PipelineStage::WaterMasking);
    let water = mask_land(&clear, &config.water)?;
    artifacts.push(Layer::new("Land masked", water.masked.clone(), VisParams::rgb(), true));
    reporter.finish_stage();

    reporter.begin_stage(PipelineStage::DepthInvariant);
    let div = div_transform(&water.masked, Some(&region), &config.div)?;
    let div_vis = VisParams::div();
    let div_vis = if div_vis.bands.iter().all(|b| div.image.has_band(b)) {
        div_vis
    } else {
        let first = div.coefficients.first().map(|c| c.band.as_str()).unwrap_or_default();
        div_vis.with_bands(&[first])
    };
    artifacts.push(Layer::new("Depth-invariant index", div.image.clone(), div_vis, false));
    reporter.finish_stage();

    reporter.begin_stage(PipelineStage::ReferenceSampling);
    let water_dem = mask_dem(&dem, &config.reference)?;
    let points = sample_depth_points(&water_dem, &water.masked, &region, &config.reference)?;
    let split = split_training_validation(
        &points,
        config.reference.split_seed,
        config.reference.train_fraction,
    );
    artifacts.push(Layer::new("DEM no land", water_dem.clone(), dem_vis, false));
    reporter.finish_stage();

    reporter.begin_stage(PipelineStage::Regression);
    let result = run_bathymetry(
        &div.image,
        &split.training,
        &split.validation,
        &config.reference.depth_property,
        Some(&region),
        &config.regression,
    )?;
    artifacts.push(Layer::new("Bathymetry", result.predicted.clone(), VisParams::bathymetry(), true));
    artifacts.push(Layer::new(
        "Clipped bathymetry",
        result.clipped.clone(),
        VisParams::bathymetry(),
        true,
    ));
    reporter.finish_stage();

    reporter.begin_stage(PipelineStage::Comparison);
    let reference = water_dem
        .select(&[depth_band])?
        .resample_to(*result.predicted.transform(), result.predicted.dim());
    let (comparison, difference) =
        compare(&reference, &result.predicted, Some(&region), &config.report)?;
    artifacts.push(Layer::new("Difference", difference.clone(), VisParams::difference(), true));
    reporter.finish_stage();

    info!(
        r_squared = result.metrics.r_squared,
        rmse = result.metrics.rmse,
        layers = artifacts.len(),
        "Pipeline complete"
    );

    Ok(PipelineOutput {
        scene: SceneSummary {
            id: scene.id,
            date: scene.date,
            cloud_cover: scene.cloud_cover,
        },
        coefficients: div.coefficients,
        samples: SampleCounts {
            reference_points: points.len(),
            training_points: split.training.len(),
            validation_points: split.validation.len(),
            training_samples: result.training_samples,
        },
        metrics: result.metrics,
        predicted: result.predicted,
        difference,
        comparison,
        artifacts,
    })
}

/// Run the full processing pipeline without progress reporting.
pub fn run_pipeline(config: &PipelineConfig, source: &dyn RasterSource) -> Result<PipelineOutput> {
    let reporter = Arc::new(NoOpReporter);
    run_pipeline_reported(config, source, reporter)
}

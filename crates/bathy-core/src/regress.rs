use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::consts::{
    BATHYMETRY_TREES, DEFAULT_QA_BAND, METRIC_REDUCE_SCALE, R2_MAX_PIXELS, RMSE_MAX_PIXELS,
};
use crate::error::{BathyError, Result};
use crate::feature::FeatureCollection;
use crate::model::{ForestParams, OutputMode, RandomForest, TrainingTable};
use crate::raster::sampling::sample_regions;
use crate::raster::{Band, Image};
use crate::reduce::{reduce_covariance, sample_values, ReduceParams};
use crate::reference::rasterize;
use crate::region::Region;

/// Band name of the predicted depth raster.
pub const DEPTH_BAND: &str = "depth";

const PREDICTED: &str = "predicted";
const REFERENCE: &str = "reference";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RegressionParams {
    pub forest: ForestParams,
    /// Bands used as model inputs. `None` = every band except `exclude`.
    pub feature_bands: Option<Vec<String>>,
    /// Bands never used as inputs when `feature_bands` is unset.
    pub exclude: Vec<String>,
    pub r2_reduce: ReduceParams,
    pub rmse_reduce: ReduceParams,
}

impl Default for RegressionParams {
    fn default() -> Self {
        Self {
            forest: ForestParams::with_trees(BATHYMETRY_TREES),
            feature_bands: None,
            exclude: vec![DEFAULT_QA_BAND.to_string()],
            r2_reduce: ReduceParams::new(METRIC_REDUCE_SCALE, R2_MAX_PIXELS, true),
            rmse_reduce: ReduceParams::new(METRIC_REDUCE_SCALE, RMSE_MAX_PIXELS, true),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    pub r_squared: f64,
    pub rmse: f64,
    /// Pixels both rasters cover at the RMSE scale.
    pub validation_pixels: usize,
}

#[derive(Clone, Debug)]
pub struct BathymetryResult {
    /// Depth for every valid pixel (band `depth`).
    pub predicted: Image,
    /// Prediction restricted to pixels that hold a validation point.
    pub clipped: Image,
    /// Validation depths burned onto the prediction grid (band `mean`).
    pub validation: Image,
    pub metrics: AccuracyMetrics,
    pub training_samples: usize,
    pub model: RandomForest,
}

/// Input band names for the regressor.
pub fn feature_bands(image: &Image, params: &RegressionParams) -> Vec<String> {
    match &params.feature_bands {
        Some(bands) => bands.clone(),
        None => image
            .band_names()
            .into_iter()
            .filter(|b| !params.exclude.iter().any(|e| e == b))
            .map(str::to_string)
            .collect(),
    }
}

/// Sample `image` at the training points and fit a regression forest
/// against `depth_property`. Returns the model and the number of rows used.
pub fn train_regressor(
    image: &Image,
    training: &FeatureCollection,
    depth_property: &str,
    params: &RegressionParams,
) -> Result<(RandomForest, usize)> {
    let bands = feature_bands(image, params);
    let names: Vec<&str> = bands.iter().map(String::as_str).collect();
    let inputs = image.select(&names)?;
    let samples = sample_regions(&inputs, training, &[depth_property]);
    let table = TrainingTable::from_features(&samples, &names, depth_property)?;
    if table.is_empty() {
        return Err(BathyError::NoValidPixels(
            "no training point falls on a valid image pixel".into(),
        ));
    }
    let rows = table.len();
    let forest = RandomForest::train(&table, OutputMode::Regression, &params.forest)?;
    Ok((forest, rows))
}

/// Apply the regressor to every pixel (band `depth`).
pub fn predict_depth(model: &RandomForest, image: &Image) -> Result<Image> {
    model.classify(image, DEPTH_BAND)
}

/// Mask every pixel that does not contain at least one of `points`.
pub fn clip_to_points(image: &Image, points: &FeatureCollection) -> Result<Image> {
    let mut keep = Array2::from_elem(image.dim(), false);
    for f in points {
        if let Some((r, c)) = image.pixel_at(f.x, f.y) {
            keep[[r, c]] = true;
        }
    }
    image.update_mask(&keep)
}

/// Two-band image holding `predicted` and `reference` side by side.
fn paired(predicted: &Image, reference: &Image) -> Result<Image> {
    predicted.ensure_same_grid(reference)?;
    let p = Band::new(PREDICTED, predicted.first_band().data.clone());
    let r = Band::new(REFERENCE, reference.first_band().data.clone());
    Image::new(*predicted.transform(), vec![p, r])
}

/// Squared correlation `covar^2 / (var_pred * var_ref)` over pixels where
/// both rasters are valid.
pub fn r_squared(
    predicted: &Image,
    reference: &Image,
    region: Option<&Region>,
    params: &ReduceParams,
) -> Result<f64> {
    let pair = paired(predicted, reference)?;
    let cov = reduce_covariance(&pair, PREDICTED, REFERENCE, region, params)?;
    let denom = cov.var1 * cov.var2;
    if !denom.is_finite() || denom == 0.0 {
        return Err(BathyError::DegenerateCovariance {
            context: "R²".into(),
            detail: format!("variance product is {denom} over {} pixels", cov.count),
        });
    }
    Ok(cov.covar * cov.covar / denom)
}

/// Root mean squared difference over pixels where both rasters are valid.
/// Returns (rmse, pixel count).
pub fn rmse(
    predicted: &Image,
    reference: &Image,
    region: Option<&Region>,
    params: &ReduceParams,
) -> Result<(f64, usize)> {
    let pair = paired(predicted, reference)?;
    let pred = pair.band(PREDICTED)?;
    let refr = pair.band(REFERENCE)?;
    let squared = Image::single(*pair.transform(), "squared", (refr - pred).mapv(|d| d * d));
    let values = sample_values(&squared, &["squared"], region, params)?;
    if values.is_empty() {
        return Err(BathyError::EmptyReduction("RMSE".into()));
    }
    let mean = values.iter().map(|v| v[0]).sum::<f64>() / values.len() as f64;
    Ok((mean.sqrt(), values.len()))
}

/// Train on `training`, predict over `image` and score against `validation`.
pub fn run_bathymetry(
    image: &Image,
    training: &FeatureCollection,
    validation: &FeatureCollection,
    depth_property: &str,
    region: Option<&Region>,
    params: &RegressionParams,
) -> Result<BathymetryResult> {
    let (model, training_samples) = train_regressor(image, training, depth_property, params)?;
    let predicted = predict_depth(&model, image)?;
    let clipped = clip_to_points(&predicted, validation)?;
    let reference = rasterize(
        validation,
        depth_property,
        *predicted.transform(),
        predicted.dim(),
    );

    let r_squared = r_squared(&clipped, &reference, region, &params.r2_reduce)?;
    let (rmse, validation_pixels) = rmse(&clipped, &reference, region, &params.rmse_reduce)?;
    let metrics = AccuracyMetrics {
        r_squared,
        rmse,
        validation_pixels,
    };

    info!(
        r_squared,
        rmse,
        validation_pixels,
        training_samples,
        trees = model.num_trees(),
        "Bathymetry accuracy"
    );
    Ok(BathymetryResult {
        predicted,
        clipped,
        validation: reference,
        metrics,
        training_samples,
        model,
    })
}

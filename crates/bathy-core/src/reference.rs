use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::consts::{
    DEFAULT_DEPTH_BAND, DEFAULT_DEPTH_PROPERTY, DEFAULT_SAMPLE_POINTS, DEFAULT_SAMPLE_SEED,
    DEFAULT_SPLIT_SEED, DEFAULT_TRAIN_FRACTION, DEM_FILL_THRESHOLD, DEM_LAND_THRESHOLD,
    RANDOM_COLUMN,
};
use crate::error::{BathyError, Result};
use crate::feature::{Feature, FeatureCollection};
use crate::raster::sampling::reduce_to_image;
use crate::raster::{GeoTransform, Image};
use crate::region::Region;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceParams {
    /// Elevation band of the reference DEM.
    pub depth_band: String,
    /// Property name the sampled depth is stored under.
    pub depth_property: String,
    /// Values below this are fill.
    pub fill_threshold: f64,
    /// Values above this are land.
    pub land_threshold: f64,
    pub num_points: usize,
    pub seed: u64,
    pub split_seed: u64,
    /// Points whose random key is at or below this go to training.
    pub train_fraction: f64,
}

impl Default for ReferenceParams {
    fn default() -> Self {
        Self {
            depth_band: DEFAULT_DEPTH_BAND.into(),
            depth_property: DEFAULT_DEPTH_PROPERTY.into(),
            fill_threshold: DEM_FILL_THRESHOLD,
            land_threshold: DEM_LAND_THRESHOLD,
            num_points: DEFAULT_SAMPLE_POINTS,
            seed: DEFAULT_SAMPLE_SEED,
            split_seed: DEFAULT_SPLIT_SEED,
            train_fraction: DEFAULT_TRAIN_FRACTION,
        }
    }
}

/// Disjoint training and validation subsets of the sampled depth points.
#[derive(Clone, Debug)]
pub struct DepthSplit {
    pub training: FeatureCollection,
    pub validation: FeatureCollection,
}

/// Mask DEM values outside `[fill_threshold, land_threshold]`.
pub fn mask_dem(dem: &Image, params: &ReferenceParams) -> Result<Image> {
    let values = dem.band(&params.depth_band)?;
    let keep = values.mapv(|v| v >= params.fill_threshold && v <= params.land_threshold);
    let masked = dem.update_mask(&keep)?;
    if masked.valid_count() == 0 {
        return Err(BathyError::NoValidPixels(
            "reference DEM has no values in the depth range".into(),
        ));
    }
    Ok(masked)
}

/// Draw up to `n` depth points from valid DEM pixels.
///
/// Candidates are DEM pixel centres inside `region` that also fall on a
/// valid pixel of `water`. Points are drawn without replacement and returned
/// in grid order, so a fixed seed always gives the same set.
pub fn sample_depth_points(
    dem: &Image,
    water: &Image,
    region: &Region,
    params: &ReferenceParams,
) -> Result<FeatureCollection> {
    let depth = dem.band(&params.depth_band)?;
    let transform = dem.transform();
    let (rows, cols) = dem.dim();

    let mut candidates = Vec::new();
    for r in 0..rows {
        for c in 0..cols {
            let d = depth[[r, c]];
            if !d.is_finite() {
                continue;
            }
            let (x, y) = transform.pixel_to_geo(r, c);
            if region.contains(x, y) && water.is_valid_at(x, y) {
                candidates.push((x, y, d));
            }
        }
    }
    if candidates.is_empty() {
        return Err(BathyError::NoValidPixels(
            "no reference depth pixel overlaps the water mask".into(),
        ));
    }

    let take = params.num_points.min(candidates.len());
    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    let mut picked = rand::seq::index::sample(&mut rng, candidates.len(), take).into_vec();
    picked.sort_unstable();

    info!(
        candidates = candidates.len(),
        sampled = picked.len(),
        seed = params.seed,
        "Sampled reference depth points"
    );
    Ok(picked
        .into_iter()
        .map(|i| {
            let (x, y, d) = candidates[i];
            Feature::new(x, y).with_property(params.depth_property.as_str(), d)
        })
        .collect())
}

/// Split on a seeded random key: `<= train_fraction` trains, the rest validates.
pub fn split_training_validation(
    points: &FeatureCollection,
    seed: u64,
    train_fraction: f64,
) -> DepthSplit {
    let keyed = points.random_column(RANDOM_COLUMN, seed);
    let split = DepthSplit {
        training: keyed.filter_lte(RANDOM_COLUMN, train_fraction),
        validation: keyed.filter_gt(RANDOM_COLUMN, train_fraction),
    };
    info!(
        training = split.training.len(),
        validation = split.validation.len(),
        "Split reference points"
    );
    split
}

/// Per-pixel mean depth of `points` on the given grid (band `mean`).
pub fn rasterize(
    points: &FeatureCollection,
    property: &str,
    transform: GeoTransform,
    dim: (usize, usize),
) -> Image {
    reduce_to_image(&points.filter_not_null(property), property, transform, dim)
}

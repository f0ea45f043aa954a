use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::consts::{CLASS_LAND, CLASS_PROPERTY, CLASS_WATER, WATER_CLASSIFIER_TREES};
use crate::error::{BathyError, Result};
use crate::feature::{Feature, FeatureCollection};
use crate::model::{ForestParams, OutputMode, RandomForest, TrainingTable};
use crate::raster::sampling::sample_regions;
use crate::raster::Image;

/// Name of the water index band.
pub const MNDWI_BAND: &str = "mndwi";

/// Land/water classifier settings and the labelled training points.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterParams {
    /// Green band (MNDWI numerator term).
    pub green_band: String,
    /// Shortwave-infrared band (MNDWI subtracted term).
    pub swir_band: String,
    /// Points known to be on land (`class = 0`).
    pub land_points: Vec<[f64; 2]>,
    /// Points known to be on water (`class = 1`).
    pub water_points: Vec<[f64; 2]>,
    pub forest: ForestParams,
}

impl Default for WaterParams {
    fn default() -> Self {
        Self {
            green_band: "B3".into(),
            swir_band: "B6".into(),
            land_points: Vec::new(),
            water_points: Vec::new(),
            forest: ForestParams::with_trees(WATER_CLASSIFIER_TREES),
        }
    }
}

/// Result of land masking.
#[derive(Clone, Debug)]
pub struct WaterMask {
    /// Source image with land pixels masked.
    pub masked: Image,
    /// MNDWI band the classifier ran on.
    pub index: Image,
    /// Per-pixel class (0 land, 1 water).
    pub classes: Image,
}

/// Modified Normalized Difference Water Index: (G - S) / (G + S).
pub fn mndwi(image: &Image, green: &str, swir: &str) -> Result<Image> {
    let g = image.band(green)?;
    let s = image.band(swir)?;
    let mut out = Array2::from_elem(image.dim(), f64::NAN);
    Zip::from(&mut out).and(g).and(s).for_each(|o, &g, &s| {
        let sum = g + s;
        if g.is_finite() && s.is_finite() && sum != 0.0 {
            *o = (g - s) / sum;
        }
    });
    Ok(Image::single(*image.transform(), MNDWI_BAND, out))
}

/// Labelled training collection: land points carry `class = 0`, water `1`.
pub fn training_points(land: &[[f64; 2]], water: &[[f64; 2]]) -> FeatureCollection {
    let land: FeatureCollection = land
        .iter()
        .map(|p| Feature::new(p[0], p[1]).with_property(CLASS_PROPERTY, CLASS_LAND))
        .collect();
    let water: FeatureCollection = water
        .iter()
        .map(|p| Feature::new(p[0], p[1]).with_property(CLASS_PROPERTY, CLASS_WATER))
        .collect();
    land.merge(&water)
}

/// Random-forest land/water classifier over a single index band.
///
/// With one point per class every tree reduces to a threshold halfway
/// between the two sampled index values.
#[derive(Clone, Debug)]
pub struct WaterClassifier {
    forest: RandomForest,
}

impl WaterClassifier {
    pub fn train(index: &Image, training: &FeatureCollection, params: &ForestParams) -> Result<Self> {
        let samples = sample_regions(index, training, &[CLASS_PROPERTY]);
        for (class, label) in [(CLASS_LAND, "land"), (CLASS_WATER, "water")] {
            if !samples.iter().any(|f| f.get(CLASS_PROPERTY) == Some(class)) {
                return Err(BathyError::NoValidPixels(format!(
                    "no {label} training point falls on a valid index pixel"
                )));
            }
        }

        let band = index.first_band().name.clone();
        let table = TrainingTable::from_features(&samples, &[band.as_str()], CLASS_PROPERTY)?;
        let forest = RandomForest::train(&table, OutputMode::Classification, params)?;
        Ok(Self { forest })
    }

    /// Class per pixel (0 land, 1 water); masked where the index is masked.
    pub fn classify(&self, index: &Image) -> Result<Image> {
        self.forest.classify(index, "class")
    }
}

/// Classify water from the labelled points and mask land out of `image`.
pub fn mask_land(image: &Image, params: &WaterParams) -> Result<WaterMask> {
    if params.land_points.is_empty() || params.water_points.is_empty() {
        return Err(BathyError::InvalidConfig(
            "water classifier needs at least one land and one water point".into(),
        ));
    }

    let index = mndwi(image, &params.green_band, &params.swir_band)?;
    let training = training_points(&params.land_points, &params.water_points);
    let classifier = WaterClassifier::train(&index, &training, &params.forest)?;
    let classes = classifier.classify(&index)?;

    let water = classes.first_band().data.mapv(|c| c == CLASS_WATER);
    let water_pixels = water.iter().filter(|&&w| w).count();
    info!(
        water_pixels,
        land_points = params.land_points.len(),
        water_points = params.water_points.len(),
        "Classified land/water"
    );
    if water_pixels == 0 {
        return Err(BathyError::NoValidPixels("land mask removed every pixel".into()));
    }

    let masked = image.update_mask(&water)?;
    Ok(WaterMask {
        masked,
        index,
        classes,
    })
}

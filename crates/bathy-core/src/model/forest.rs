use ndarray::{Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::{DEFAULT_BAG_FRACTION, PARALLEL_PIXEL_THRESHOLD};
use crate::error::{BathyError, Result};
use crate::feature::FeatureCollection;
use crate::raster::Image;

use super::tree::{majority, DecisionTree, TreeParams};

/// How forest output is combined and reported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputMode {
    /// Majority vote over class labels.
    #[default]
    Classification,
    /// Mean of tree outputs.
    Regression,
}

impl std::fmt::Display for OutputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Classification => write!(f, "Classification"),
            Self::Regression => write!(f, "Regression"),
        }
    }
}

/// Random forest hyper-parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub num_trees: usize,
    /// Features tried at each split. `None` = floor(sqrt(feature count)).
    #[serde(default)]
    pub variables_per_split: Option<usize>,
    #[serde(default = "default_min_leaf")]
    pub min_leaf_population: usize,
    /// Fraction of the training rows drawn with replacement per tree.
    #[serde(default = "default_bag_fraction")]
    pub bag_fraction: f64,
    #[serde(default)]
    pub max_nodes: Option<usize>,
    #[serde(default)]
    pub seed: u64,
}

fn default_min_leaf() -> usize {
    1
}
fn default_bag_fraction() -> f64 {
    DEFAULT_BAG_FRACTION
}

impl ForestParams {
    pub fn with_trees(num_trees: usize) -> Self {
        Self {
            num_trees,
            ..Default::default()
        }
    }
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            num_trees: 10,
            variables_per_split: None,
            min_leaf_population: 1,
            bag_fraction: DEFAULT_BAG_FRACTION,
            max_nodes: None,
            seed: 0,
        }
    }
}

/// Feature matrix plus target column used to fit a forest.
#[derive(Clone, Debug)]
pub struct TrainingTable {
    feature_names: Vec<String>,
    rows: Array2<f64>,
    targets: Vec<f64>,
}

impl TrainingTable {
    pub fn new(feature_names: Vec<String>, rows: Array2<f64>, targets: Vec<f64>) -> Result<Self> {
        if rows.ncols() != feature_names.len() {
            return Err(BathyError::Model(format!(
                "{} feature names for {} columns",
                feature_names.len(),
                rows.ncols()
            )));
        }
        if rows.nrows() != targets.len() {
            return Err(BathyError::Model(format!(
                "{} rows but {} targets",
                rows.nrows(),
                targets.len()
            )));
        }
        if rows.iter().chain(targets.iter()).any(|v| !v.is_finite()) {
            return Err(BathyError::Model("training table contains non-finite values".into()));
        }
        Ok(Self {
            feature_names,
            rows,
            targets,
        })
    }

    /// Build a table from sampled features. Features missing any input
    /// property or the target are skipped.
    pub fn from_features(
        collection: &FeatureCollection,
        feature_names: &[&str],
        target: &str,
    ) -> Result<Self> {
        let mut data = Vec::new();
        let mut targets = Vec::new();
        for f in collection {
            let Some(t) = f.get(target) else { continue };
            let values: Option<Vec<f64>> = feature_names.iter().map(|n| f.get(n)).collect();
            if let Some(values) = values {
                data.extend(values);
                targets.push(t);
            }
        }
        let rows = Array2::from_shape_vec((targets.len(), feature_names.len()), data)?;
        Self::new(
            feature_names.iter().map(|s| s.to_string()).collect(),
            rows,
            targets,
        )
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}

/// Bagged ensemble of CART trees.
#[derive(Clone, Debug)]
pub struct RandomForest {
    mode: OutputMode,
    feature_names: Vec<String>,
    /// Sorted distinct labels (classification only).
    classes: Vec<f64>,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Fit a forest. Trees are grown in parallel, each from its own RNG
    /// seeded with `seed + tree_index`.
    pub fn train(table: &TrainingTable, mode: OutputMode, params: &ForestParams) -> Result<Self> {
        if table.is_empty() {
            return Err(BathyError::Model("empty training table".into()));
        }
        if params.num_trees == 0 {
            return Err(BathyError::Model("forest needs at least one tree".into()));
        }
        if !(params.bag_fraction > 0.0 && params.bag_fraction <= 1.0) {
            return Err(BathyError::Model(format!(
                "bag fraction {} outside (0, 1]",
                params.bag_fraction
            )));
        }

        let n_features = table.feature_names.len();
        if n_features == 0 {
            return Err(BathyError::Model("training table has no features".into()));
        }

        let (classes, y) = match mode {
            OutputMode::Regression => (Vec::new(), table.targets.clone()),
            OutputMode::Classification => encode_classes(&table.targets),
        };

        let tree_params = TreeParams {
            mode,
            n_classes: classes.len(),
            variables_per_split: params
                .variables_per_split
                .unwrap_or_else(|| (n_features as f64).sqrt().floor() as usize)
                .max(1),
            min_leaf_population: params.min_leaf_population,
            max_nodes: params.max_nodes,
        };

        let strata = match mode {
            OutputMode::Regression => vec![(0..y.len()).collect::<Vec<_>>()],
            OutputMode::Classification => (0..classes.len())
                .map(|c| (0..y.len()).filter(|&i| y[i] as usize == c).collect())
                .collect(),
        };

        let trees: Vec<DecisionTree> = (0..params.num_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = ChaCha8Rng::seed_from_u64(params.seed.wrapping_add(t as u64));
                let sample = bootstrap(&strata, params.bag_fraction, &mut rng);
                DecisionTree::fit(&table.rows, &y, sample, &tree_params, &mut rng)
            })
            .collect();

        debug!(
            %mode,
            trees = trees.len(),
            rows = table.len(),
            features = n_features,
            nodes = trees.iter().map(DecisionTree::node_count).sum::<usize>(),
            "Trained random forest"
        );

        Ok(Self {
            mode,
            feature_names: table.feature_names.clone(),
            classes,
            trees,
        })
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    /// Predict one row of feature values (in `feature_names` order).
    pub fn predict(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.feature_names.len() {
            return Err(BathyError::Model(format!(
                "expected {} features, got {}",
                self.feature_names.len(),
                row.len()
            )));
        }
        let view = ndarray::ArrayView1::from(row);
        Ok(self.combine(self.trees.iter().map(|t| t.predict(view))))
    }

    fn combine<I: Iterator<Item = f64>>(&self, outputs: I) -> f64 {
        match self.mode {
            OutputMode::Regression => {
                let (sum, n) = outputs.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
                sum / n as f64
            }
            OutputMode::Classification => {
                let mut votes = vec![0usize; self.classes.len()];
                for v in outputs {
                    votes[v as usize] += 1;
                }
                self.classes[majority(&votes)]
            }
        }
    }

    /// Apply the forest to every pixel of `image`, reading the bands named
    /// by `feature_names`. Pixels with any masked input are masked.
    pub fn classify(&self, image: &Image, output_band: &str) -> Result<Image> {
        let names: Vec<&str> = self.feature_names.iter().map(String::as_str).collect();
        let inputs = names
            .iter()
            .map(|n| image.band(n))
            .collect::<Result<Vec<_>>>()?;
        let (h, w) = image.dim();

        let predict_row = |row: usize| -> Vec<f64> {
            let mut values = vec![0.0; inputs.len()];
            (0..w)
                .map(|col| {
                    for (v, band) in values.iter_mut().zip(&inputs) {
                        *v = band[[row, col]];
                    }
                    if values.iter().any(|v| !v.is_finite()) {
                        return f64::NAN;
                    }
                    let view = ndarray::ArrayView1::from(values.as_slice());
                    self.combine(self.trees.iter().map(|t| t.predict(view)))
                })
                .collect()
        };

        let rows: Vec<Vec<f64>> = if h * w >= PARALLEL_PIXEL_THRESHOLD {
            (0..h).into_par_iter().map(predict_row).collect()
        } else {
            (0..h).map(predict_row).collect()
        };

        let mut out = Array2::<f64>::from_elem((h, w), f64::NAN);
        for (mut dst, src) in out.axis_iter_mut(Axis(0)).zip(rows) {
            for (d, s) in dst.iter_mut().zip(src) {
                *d = s;
            }
        }
        Ok(Image::single(*image.transform(), output_band, out))
    }
}

/// Map labels to dense class indices. Returns (sorted labels, encoded targets).
fn encode_classes(targets: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut classes: Vec<f64> = targets.to_vec();
    classes.sort_by(f64::total_cmp);
    classes.dedup();
    let encoded = targets
        .iter()
        .map(|t| classes.iter().position(|c| c == t).unwrap_or(0) as f64)
        .collect();
    (classes, encoded)
}

/// Draw `bag_fraction` of each stratum with replacement (at least one row
/// per non-empty stratum).
fn bootstrap<R: Rng>(strata: &[Vec<usize>], bag_fraction: f64, rng: &mut R) -> Vec<usize> {
    let mut sample = Vec::new();
    for stratum in strata.iter().filter(|s| !s.is_empty()) {
        let m = ((stratum.len() as f64 * bag_fraction).round() as usize).max(1);
        sample.extend((0..m).map(|_| stratum[rng.gen_range(0..stratum.len())]));
    }
    sample
}

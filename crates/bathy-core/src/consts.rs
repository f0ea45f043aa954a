/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Quality-band bits 0-4: fill, dilated cloud, cirrus, cloud, cloud shadow.
pub const QA_CLOUD_BITS: u32 = 0b11111;

/// Name of the HLS Fmask quality band.
pub const DEFAULT_QA_BAND: &str = "Fmask";

/// Replacement for non-positive reflectance before the log transform.
pub const POSITIVE_EPSILON: f64 = 1e-4;

/// Radius of the normalized box kernel used before the log transform (5x5).
pub const BOX_KERNEL_RADIUS: usize = 2;

/// Reference DEM values below this are fill.
pub const DEM_FILL_THRESHOLD: f64 = -3.4e38;

/// Reference DEM values above this are land.
pub const DEM_LAND_THRESHOLD: f64 = 1.0;

/// Band holding elevation in the reference DEM mosaic.
pub const DEFAULT_DEPTH_BAND: &str = "b1";

/// Feature property carrying the sampled reference depth.
pub const DEFAULT_DEPTH_PROPERTY: &str = "depth";

/// Feature property carrying the random split key.
pub const RANDOM_COLUMN: &str = "random";

/// Feature property carrying the land/water label.
pub const CLASS_PROPERTY: &str = "class";

pub const CLASS_LAND: f64 = 0.0;
pub const CLASS_WATER: f64 = 1.0;

/// Number of reference depth points drawn from the DEM.
pub const DEFAULT_SAMPLE_POINTS: usize = 5000;

/// Seed for reference depth point sampling.
pub const DEFAULT_SAMPLE_SEED: u64 = 1;

/// Seed for the train/validation random column.
pub const DEFAULT_SPLIT_SEED: u64 = 0;

/// Points with a random key at or below this fraction go to training.
pub const DEFAULT_TRAIN_FRACTION: f64 = 0.7;

/// Trees in the land/water classifier.
pub const WATER_CLASSIFIER_TREES: usize = 10;

/// Trees in the bathymetry regressor.
pub const BATHYMETRY_TREES: usize = 15;

/// Fraction of the training table drawn (with replacement) for each tree.
pub const DEFAULT_BAG_FRACTION: f64 = 0.5;

/// Scale (metres) of the DIV covariance reduction.
pub const DIV_REDUCE_SCALE: f64 = 30.0;

/// Pixel cap of the DIV covariance reduction.
pub const DIV_MAX_PIXELS: u64 = 1_000_000_000_000;

/// Scale (metres) of the R² and RMSE reductions.
pub const METRIC_REDUCE_SCALE: f64 = 3.0;

/// Pixel cap of the R² covariance reduction.
pub const R2_MAX_PIXELS: u64 = 1_000_000_000;

/// Pixel cap of the RMSE mean reduction.
pub const RMSE_MAX_PIXELS: u64 = 1_000_000_000_000;

/// Scale (metres) used for comparison histograms and scatter samples.
pub const DEFAULT_REPORT_SCALE: f64 = 30.0;

pub const DEFAULT_HISTOGRAM_BINS: usize = 50;

/// Paired samples drawn for the reference-vs-predicted scatter report.
pub const DEFAULT_SCATTER_POINTS: usize = 5000;

/// Seed for subsampling the scatter pairs.
pub const DEFAULT_SCATTER_SEED: u64 = 0;

/// Arc length of one degree on the WGS84 equator.
pub const METRES_PER_DEGREE: f64 = 111_319.490_793;

/// Small epsilon for floating-point degeneracy checks.
pub const EPSILON: f64 = 1e-12;

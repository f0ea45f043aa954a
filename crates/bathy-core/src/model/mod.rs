//! Random-forest classifier/regressor used by the water mask and the
//! bathymetry regression.
//!
//! Trees are plain CART (Gini for classes, squared error for regression)
//! grown on bootstrap samples with a random feature subset per split.

pub mod forest;
mod tree;

pub use forest::{ForestParams, OutputMode, RandomForest, TrainingTable};

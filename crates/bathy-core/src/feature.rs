use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// A point with scalar properties.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub properties: BTreeMap<String, f64>,
}

impl Feature {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: f64) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.properties.insert(name.into(), value);
    }

    /// Property value; `None` when missing or non-finite (null).
    pub fn get(&self, name: &str) -> Option<f64> {
        self.properties.get(name).copied().filter(|v| v.is_finite())
    }
}

/// Set of point features.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn filter<P: Fn(&Feature) -> bool>(&self, predicate: P) -> Self {
        self.features
            .iter()
            .filter(|f| predicate(f))
            .cloned()
            .collect()
    }

    pub fn filter_not_null(&self, property: &str) -> Self {
        self.filter(|f| f.get(property).is_some())
    }

    /// Features with `property <= threshold`. Nulls are dropped.
    pub fn filter_lte(&self, property: &str, threshold: f64) -> Self {
        self.filter(|f| f.get(property).is_some_and(|v| v <= threshold))
    }

    /// Features with `property > threshold`. Nulls are dropped.
    pub fn filter_gt(&self, property: &str, threshold: f64) -> Self {
        self.filter(|f| f.get(property).is_some_and(|v| v > threshold))
    }

    pub fn merge(&self, other: &FeatureCollection) -> Self {
        self.features
            .iter()
            .chain(other.features.iter())
            .cloned()
            .collect()
    }

    /// Add a uniform `[0, 1)` property drawn from a generator seeded with `seed`.
    pub fn random_column(&self, name: &str, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        self.features
            .iter()
            .map(|f| f.clone().with_property(name, rng.gen::<f64>()))
            .collect()
    }

    /// Non-null values of `property`, in feature order.
    pub fn property_values(&self, property: &str) -> Vec<f64> {
        self.features.iter().filter_map(|f| f.get(property)).collect()
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

impl<'a> IntoIterator for &'a FeatureCollection {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}

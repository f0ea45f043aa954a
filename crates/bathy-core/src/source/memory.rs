use std::collections::BTreeMap;

use crate::error::{BathyError, Result};
use crate::raster::ImageCollection;

use super::RasterSource;

/// Collections held in memory, keyed by id.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    collections: BTreeMap<String, ImageCollection>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a collection under its own id.
    pub fn insert(&mut self, collection: ImageCollection) {
        self.collections.insert(collection.id.clone(), collection);
    }

    pub fn with(mut self, collection: ImageCollection) -> Self {
        self.insert(collection);
        self
    }
}

impl RasterSource for MemorySource {
    fn load_collection(&self, id: &str) -> Result<ImageCollection> {
        self.collections
            .get(id)
            .cloned()
            .ok_or_else(|| BathyError::Catalog(format!("unknown collection '{id}'")))
    }

    fn collection_ids(&self) -> Vec<String> {
        self.collections.keys().cloned().collect()
    }
}

//! Where rasters come from.
//!
//! The pipeline only sees [`RasterSource`]; a local TIFF catalog and an
//! in-memory store are provided.

pub mod catalog;
pub mod memory;

pub use catalog::CatalogSource;
pub use memory::MemorySource;

use crate::error::Result;
use crate::raster::ImageCollection;

pub trait RasterSource: Send + Sync {
    /// Load every scene of the named collection.
    fn load_collection(&self, id: &str) -> Result<ImageCollection>;

    /// Identifiers of the collections this source can load.
    fn collection_ids(&self) -> Vec<String>;
}

pub mod collection;
pub mod geotransform;
pub mod image;
pub mod sampling;

pub use collection::{ImageCollection, Scene};
pub use geotransform::{GeoTransform, GridUnits};
pub use image::{Band, Image};

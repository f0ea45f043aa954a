use chrono::NaiveDate;
use ndarray::Array2;
use tracing::debug;

use crate::error::{BathyError, Result};
use crate::region::{Bounds, Region};

use super::geotransform::GeoTransform;
use super::image::{Band, Image};

/// One acquisition: an image plus catalog metadata.
#[derive(Clone, Debug)]
pub struct Scene {
    pub id: String,
    pub date: NaiveDate,
    /// Scene-level cloud cover percentage (0-100).
    pub cloud_cover: f64,
    pub image: Image,
}

impl Scene {
    pub fn footprint(&self) -> Bounds {
        self.image.footprint()
    }
}

/// Ordered set of scenes. Filters return a new collection.
#[derive(Clone, Debug, Default)]
pub struct ImageCollection {
    pub id: String,
    scenes: Vec<Scene>,
}

impl ImageCollection {
    pub fn new(id: impl Into<String>, scenes: Vec<Scene>) -> Self {
        Self {
            id: id.into(),
            scenes,
        }
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    fn retain<F: Fn(&Scene) -> bool>(&self, keep: F) -> Self {
        Self {
            id: self.id.clone(),
            scenes: self.scenes.iter().filter(|s| keep(s)).cloned().collect(),
        }
    }

    /// Scenes acquired in `[start, end)`.
    pub fn filter_date(&self, start: NaiveDate, end: NaiveDate) -> Self {
        self.retain(|s| s.date >= start && s.date < end)
    }

    /// Scenes whose footprint overlaps `region`.
    pub fn filter_bounds(&self, region: &Region) -> Self {
        self.retain(|s| region.intersects_bounds(&s.footprint()))
    }

    pub fn filter_cloud_cover_lt(&self, max_percent: f64) -> Self {
        self.retain(|s| s.cloud_cover < max_percent)
    }

    pub fn first(&self) -> Result<&Scene> {
        self.scenes.first().ok_or_else(|| self.empty_error())
    }

    /// Scene with the lowest cloud cover; earliest wins ties.
    pub fn least_cloudy(&self) -> Result<&Scene> {
        self.scenes
            .iter()
            .min_by(|a, b| a.cloud_cover.total_cmp(&b.cloud_cover))
            .ok_or_else(|| self.empty_error())
    }

    /// Composite all scenes onto their union footprint.
    ///
    /// The grid uses the first scene's resolution; where scenes overlap, the
    /// last scene with a valid pixel wins. Bands are those of the first scene.
    pub fn mosaic(&self) -> Result<Image> {
        let first = self.first()?;
        let names: Vec<&str> = first.image.band_names();
        let images: Vec<Image> = self
            .scenes
            .iter()
            .map(|s| s.image.select(&names))
            .collect::<Result<_>>()?;

        let footprint = images
            .iter()
            .map(Image::footprint)
            .reduce(|a, b| a.union(&b))
            .unwrap_or_else(|| first.footprint());
        let base = first.image.transform();
        let cell_x = base.pixel_width.abs();
        let cell_y = base.pixel_height.abs();
        let cols = (footprint.width() / cell_x).round().max(1.0) as usize;
        let rows = (footprint.height() / cell_y).round().max(1.0) as usize;
        let transform = GeoTransform::new(footprint.min_x, footprint.max_y, cell_x, -cell_y)
            .with_units(base.units);
        debug!(rows, cols, scenes = images.len(), "Building mosaic");

        let mut data: Vec<Array2<f64>> = vec![Array2::from_elem((rows, cols), f64::NAN); names.len()];
        for r in 0..rows {
            for c in 0..cols {
                let (x, y) = transform.pixel_to_geo(r, c);
                if let Some(values) = images.iter().rev().find_map(|img| img.sample_at(x, y)) {
                    for (band, v) in data.iter_mut().zip(values) {
                        band[[r, c]] = v;
                    }
                }
            }
        }

        let bands = names
            .iter()
            .zip(data)
            .map(|(n, d)| Band::new(*n, d))
            .collect();
        Image::new(transform, bands)
    }

    fn empty_error(&self) -> BathyError {
        BathyError::EmptyCollection {
            collection: self.id.clone(),
        }
    }
}

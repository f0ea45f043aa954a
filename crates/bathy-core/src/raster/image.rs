use ndarray::{Array2, Zip};

use crate::error::{BathyError, Result};
use crate::region::{Bounds, Region};

use super::geotransform::GeoTransform;

/// A named 2-D array of samples. Masked pixels are NaN.
#[derive(Clone, Debug)]
pub struct Band {
    pub name: String,
    pub data: Array2<f64>,
}

impl Band {
    pub fn new(name: impl Into<String>, data: Array2<f64>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// Multi-band raster on a single grid.
///
/// Every operation returns a new image; stage outputs are never mutated.
#[derive(Clone, Debug)]
pub struct Image {
    transform: GeoTransform,
    bands: Vec<Band>,
}

impl Image {
    /// Build an image from bands that share one shape and have unique names.
    pub fn new(transform: GeoTransform, bands: Vec<Band>) -> Result<Self> {
        let Some(first) = bands.first() else {
            return Err(BathyError::InvalidConfig("image needs at least one band".into()));
        };
        let (rows, cols) = first.data.dim();
        if rows == 0 || cols == 0 {
            return Err(BathyError::InvalidConfig(format!(
                "image bands must be non-empty, got {rows}x{cols}"
            )));
        }
        for (i, band) in bands.iter().enumerate() {
            let (r, c) = band.data.dim();
            if (r, c) != (rows, cols) {
                return Err(BathyError::GridMismatch {
                    expected_rows: rows,
                    expected_cols: cols,
                    rows: r,
                    cols: c,
                });
            }
            if bands[..i].iter().any(|b| b.name == band.name) {
                return Err(BathyError::DuplicateBand(band.name.clone()));
            }
        }
        Ok(Self { transform, bands })
    }

    /// Single-band image.
    pub fn single(transform: GeoTransform, name: impl Into<String>, data: Array2<f64>) -> Self {
        Self {
            transform,
            bands: vec![Band::new(name, data)],
        }
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// (rows, cols)
    pub fn dim(&self) -> (usize, usize) {
        self.bands[0].data.dim()
    }

    pub fn rows(&self) -> usize {
        self.dim().0
    }

    pub fn cols(&self) -> usize {
        self.dim().1
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(|b| b.name.as_str()).collect()
    }

    pub fn has_band(&self, name: &str) -> bool {
        self.bands.iter().any(|b| b.name == name)
    }

    pub fn band(&self, name: &str) -> Result<&Array2<f64>> {
        self.bands
            .iter()
            .find(|b| b.name == name)
            .map(|b| &b.data)
            .ok_or_else(|| BathyError::BandNotFound(name.to_string()))
    }

    pub fn first_band(&self) -> &Band {
        &self.bands[0]
    }

    /// New image with only the named bands, in the given order.
    pub fn select(&self, names: &[&str]) -> Result<Image> {
        let bands = names
            .iter()
            .map(|n| Ok(Band::new(*n, self.band(n)?.clone())))
            .collect::<Result<Vec<_>>>()?;
        Image::new(self.transform, bands)
    }

    /// New image with `band` appended.
    pub fn add_band(&self, band: Band) -> Result<Image> {
        let mut bands = self.bands.clone();
        bands.push(band);
        Image::new(self.transform, bands)
    }

    pub fn rename_band(&self, from: &str, to: &str) -> Result<Image> {
        if !self.has_band(from) {
            return Err(BathyError::BandNotFound(from.to_string()));
        }
        let bands = self
            .bands
            .iter()
            .map(|b| {
                let name = if b.name == from { to } else { b.name.as_str() };
                Band::new(name, b.data.clone())
            })
            .collect();
        Image::new(self.transform, bands)
    }

    /// Mask every band where `mask` is false.
    pub fn update_mask(&self, mask: &Array2<bool>) -> Result<Image> {
        self.ensure_dim(mask.dim())?;
        let bands = self
            .bands
            .iter()
            .map(|b| {
                let mut data = b.data.clone();
                Zip::from(&mut data).and(mask).for_each(|v, &keep| {
                    if !keep {
                        *v = f64::NAN;
                    }
                });
                Band::new(b.name.clone(), data)
            })
            .collect();
        Ok(Image {
            transform: self.transform,
            bands,
        })
    }

    /// Apply `f` to every unmasked sample of every band.
    pub fn map_values<F>(&self, f: F) -> Image
    where
        F: Fn(f64) -> f64,
    {
        let bands = self
            .bands
            .iter()
            .map(|b| {
                let data = b.data.mapv(|v| if v.is_nan() { v } else { f(v) });
                Band::new(b.name.clone(), data)
            })
            .collect();
        Image {
            transform: self.transform,
            bands,
        }
    }

    /// True where every band holds a finite value.
    pub fn valid_mask(&self) -> Array2<bool> {
        let mut mask = Array2::from_elem(self.dim(), true);
        for band in &self.bands {
            Zip::from(&mut mask).and(&band.data).for_each(|m, &v| {
                *m = *m && v.is_finite();
            });
        }
        mask
    }

    pub fn valid_count(&self) -> usize {
        self.valid_mask().iter().filter(|&&v| v).count()
    }

    /// Mask pixels whose centre lies outside `region`.
    pub fn clip(&self, region: &Region) -> Image {
        let (rows, cols) = self.dim();
        let inside = Array2::from_shape_fn((rows, cols), |(r, c)| {
            let (x, y) = self.transform.pixel_to_geo(r, c);
            region.contains(x, y)
        });
        Image {
            transform: self.transform,
            bands: self
                .bands
                .iter()
                .map(|b| {
                    let mut data = b.data.clone();
                    Zip::from(&mut data).and(&inside).for_each(|v, &keep| {
                        if !keep {
                            *v = f64::NAN;
                        }
                    });
                    Band::new(b.name.clone(), data)
                })
                .collect(),
        }
    }

    pub fn footprint(&self) -> Bounds {
        self.transform.bounds(self.dim())
    }

    /// Pixel containing (x, y).
    pub fn pixel_at(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        self.transform.index_of(x, y, self.dim())
    }

    /// All band values at (x, y), or `None` outside the grid or on a masked pixel.
    pub fn sample_at(&self, x: f64, y: f64) -> Option<Vec<f64>> {
        let (row, col) = self.pixel_at(x, y)?;
        self.sample_pixel(row, col)
    }

    /// All band values at a pixel, or `None` if any band is masked there.
    pub fn sample_pixel(&self, row: usize, col: usize) -> Option<Vec<f64>> {
        let values: Vec<f64> = self.bands.iter().map(|b| b.data[[row, col]]).collect();
        values.iter().all(|v| v.is_finite()).then_some(values)
    }

    pub fn is_valid_at(&self, x: f64, y: f64) -> bool {
        self.sample_at(x, y).is_some()
    }

    /// Nearest-neighbour resample onto another grid.
    pub fn resample_to(&self, transform: GeoTransform, dim: (usize, usize)) -> Image {
        let lookup = Array2::from_shape_fn(dim, |(r, c)| {
            let (x, y) = transform.pixel_to_geo(r, c);
            self.pixel_at(x, y)
        });
        let bands = self
            .bands
            .iter()
            .map(|b| {
                let data = lookup.mapv(|idx| match idx {
                    Some((r, c)) => b.data[[r, c]],
                    None => f64::NAN,
                });
                Band::new(b.name.clone(), data)
            })
            .collect();
        Image { transform, bands }
    }

    pub fn ensure_same_grid(&self, other: &Image) -> Result<()> {
        self.ensure_dim(other.dim())?;
        if self.transform != other.transform {
            return Err(BathyError::InvalidConfig(
                "images are on different grids".into(),
            ));
        }
        Ok(())
    }

    fn ensure_dim(&self, dim: (usize, usize)) -> Result<()> {
        let (rows, cols) = self.dim();
        if dim != (rows, cols) {
            return Err(BathyError::GridMismatch {
                expected_rows: rows,
                expected_cols: cols,
                rows: dim.0,
                cols: dim.1,
            });
        }
        Ok(())
    }
}

use serde::{Deserialize, Serialize};

use crate::consts::METRES_PER_DEGREE;
use crate::region::Bounds;

/// Units of the grid coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridUnits {
    /// Geographic when the grid lies within lon/lat range and cells are
    /// smaller than a degree, projected otherwise.
    #[default]
    Auto,
    /// Metres.
    Projected,
    /// Degrees of longitude and latitude.
    Geographic,
}

/// North-up affine grid definition.
///
/// ```text
/// x = origin_x + col * pixel_width
/// y = origin_y + row * pixel_height
/// ```
///
/// `pixel_height` is negative for the usual top-down row order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
    #[serde(default)]
    pub units: GridUnits,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            units: GridUnits::Auto,
        }
    }

    pub fn with_units(mut self, units: GridUnits) -> Self {
        self.units = units;
        self
    }

    /// Square north-up grid with the given cell size.
    pub fn north_up(origin_x: f64, origin_y: f64, cell_size: f64) -> Self {
        Self::new(origin_x, origin_y, cell_size, -cell_size)
    }

    /// Geographic coordinates of the pixel center.
    pub fn pixel_to_geo(&self, row: usize, col: usize) -> (f64, f64) {
        let x = self.origin_x + (col as f64 + 0.5) * self.pixel_width;
        let y = self.origin_y + (row as f64 + 0.5) * self.pixel_height;
        (x, y)
    }

    /// Fractional (row, col) of a geographic coordinate.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let col = (x - self.origin_x) / self.pixel_width;
        let row = (y - self.origin_y) / self.pixel_height;
        (row, col)
    }

    /// Integer pixel containing (x, y), if it falls on a grid of `dim`.
    pub fn index_of(&self, x: f64, y: f64, dim: (usize, usize)) -> Option<(usize, usize)> {
        let (row, col) = self.geo_to_pixel(x, y);
        if !row.is_finite() || !col.is_finite() || row < 0.0 || col < 0.0 {
            return None;
        }
        let (row, col) = (row.floor() as usize, col.floor() as usize);
        (row < dim.0 && col < dim.1).then_some((row, col))
    }

    /// Cell size along X (assumes square pixels).
    pub fn cell_size(&self) -> f64 {
        self.pixel_width.abs()
    }

    /// Whether coordinates are lon/lat degrees, resolving `Auto` against the
    /// extent of a grid of `dim`.
    pub fn is_geographic(&self, dim: (usize, usize)) -> bool {
        match self.units {
            GridUnits::Projected => false,
            GridUnits::Geographic => true,
            GridUnits::Auto => {
                let b = self.bounds(dim);
                self.cell_size() < 1.0
                    && self.pixel_height.abs() < 1.0
                    && b.min_x >= -180.0
                    && b.max_x <= 180.0
                    && b.min_y >= -90.0
                    && b.max_y <= 90.0
            }
        }
    }

    /// Ground size of one cell in metres. Degree cells are converted at the
    /// latitude of the grid centre, taking the geometric mean of both axes.
    pub fn cell_size_m(&self, dim: (usize, usize)) -> f64 {
        if !self.is_geographic(dim) {
            return self.cell_size();
        }
        let b = self.bounds(dim);
        let lat = (0.5 * (b.min_y + b.max_y)).to_radians();
        let width = self.pixel_width.abs() * METRES_PER_DEGREE * lat.cos();
        let height = self.pixel_height.abs() * METRES_PER_DEGREE;
        (width * height).sqrt()
    }

    pub fn bounds(&self, dim: (usize, usize)) -> Bounds {
        let x1 = self.origin_x + dim.1 as f64 * self.pixel_width;
        let y1 = self.origin_y + dim.0 as f64 * self.pixel_height;
        Bounds::new(self.origin_x, self.origin_y, x1, y1)
    }
}
